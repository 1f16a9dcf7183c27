use clap::Args;
use colored::Colorize;
use config::Config;
use gb_core::{CriterionNode, RubricTree, ScoringLevel};
use rubrics::{BoardView, RubricBoard};
use serde_json::json;

use crate::output;
use crate::ux_error;

#[derive(Args)]
pub struct TreeArgs {
    /// Instructor whose rubrics are loaded
    #[arg(short, long, env = "GB_INSTRUCTOR")]
    pub instructor: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

pub async fn run(args: TreeArgs, config: &Config) -> anyhow::Result<()> {
    let board = RubricBoard::new(super::connect(config)?, config);
    board.set_owner(Some(args.instructor.clone())).await;
    board.refresh().await;

    let view = board.view().await;
    let errors = board.load_errors().await;

    if args.json {
        let output = json!({
            "instructor_uuid": view.instructor_uuid,
            "trees": view.trees,
            "is_loading": view.is_loading,
            "is_error": view.is_error,
            "errors": errors
                .iter()
                .map(|failure| json!({
                    "query": failure.key.to_string(),
                    "error": failure.error.to_string()
                }))
                .collect::<Vec<_>>()
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_view(&args.instructor, &view);
    }

    if let Some(first) = errors.first() {
        if !args.json {
            for failure in &errors {
                output::warn(&format!("{}: {}", failure.key, failure.error));
            }
            ux_error::from_api_error(&first.error).display();
        }
        anyhow::bail!("{} collection(s) failed to load", errors.len());
    }
    Ok(())
}

fn print_view(instructor: &str, view: &BoardView) {
    output::header(&format!("Rubrics for {instructor}"));
    println!();

    if view.trees.is_empty() {
        println!("  {}", "No rubrics found".dimmed());
        output::hint(&format!(
            "Create one with: gradebook rubric create --instructor {instructor} --title <title>"
        ));
        return;
    }

    for tree in &view.trees {
        print_rubric(tree);
    }

    let criteria: usize = view.trees.iter().map(|tree| tree.criteria.len()).sum();
    let levels: usize = view.trees.iter().map(RubricTree::scoring_count).sum();
    println!(
        "{} rubric(s), {} criteria, {} scoring level(s)",
        view.trees.len(),
        criteria,
        levels
    );
}

fn print_rubric(tree: &RubricTree) {
    let rubric = &tree.rubric;
    let title = rubric.title.as_deref().unwrap_or("(untitled)");
    output::subheader(&format!("{title}  {}", rubric.uuid.dimmed()));

    if let Some(description) = &rubric.description {
        println!("  {}", description.dimmed());
    }
    if let Some(max) = rubric.max_score {
        let passing = rubric
            .min_passing_score
            .map_or_else(String::new, |min| format!(", passing {min}"));
        println!("  max score {max}{passing}");
    }

    if tree.criteria.is_empty() {
        println!("  {}", "no criteria".dimmed());
    }
    for node in &tree.criteria {
        print_criterion(node);
    }
    println!();
}

fn print_criterion(node: &CriterionNode) {
    let criterion = &node.criterion;
    let name = criterion.component_name.as_deref().unwrap_or("(unnamed)");
    let weight = criterion
        .weight
        .map_or_else(String::new, |w| format!(" [weight {w}]"));
    println!("  {} {name}{weight}  {}", "-".cyan(), criterion.uuid.dimmed());

    for level in &node.scoring {
        println!("      {}", describe_level(level));
    }
}

fn describe_level(level: &ScoringLevel) -> String {
    let mut parts = Vec::new();
    if let Some(expectation) = &level.performance_expectation {
        parts.push(expectation.clone());
    }
    if let Some(range) = &level.score_range {
        parts.push(format!("({range})"));
    }
    if parts.is_empty() {
        parts.push(level.uuid.clone());
    }
    let text = parts.join(" ");
    match level.is_passing {
        Some(true) => format!("{} {text}", "✓".green()),
        Some(false) => format!("{} {text}", "✗".red()),
        None => format!("  {text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_level() {
        let level = ScoringLevel {
            performance_expectation: Some("Excellent".to_string()),
            score_range: Some("9-10".to_string()),
            ..ScoringLevel::new("s1", "c1")
        };
        let text = describe_level(&level);
        assert!(text.contains("Excellent (9-10)"));

        let bare = ScoringLevel::new("s2", "c1");
        assert!(describe_level(&bare).contains("s2"));
    }
}
