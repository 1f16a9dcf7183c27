use colored::Colorize;

pub fn header(title: &str) {
    println!("{}", title.bold().underline());
}

pub fn subheader(title: &str) {
    println!("{}", title.bold());
}

pub fn hint(msg: &str) {
    println!("{} {}", "hint:".cyan().bold(), msg.dimmed());
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_does_not_panic() {
        header("Rubrics for ins-1");
    }

    #[test]
    fn test_subheader_does_not_panic() {
        subheader("Essay");
    }

    #[test]
    fn test_hint_does_not_panic() {
        hint("uuid: r1");
    }

    #[test]
    fn test_warn_does_not_panic() {
        warn("criteria[lab]: Backend returned 500");
    }

    #[test]
    fn test_success_does_not_panic() {
        success("Rubric created successfully");
    }
}
