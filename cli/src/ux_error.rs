use colored::Colorize;
use errors::ApiError;
use rubrics::MutationFailure;

#[derive(Debug)]
pub struct UxError {
    pub what: String,
    pub why: Option<String>,
    pub how_to_fix: Vec<String>,
    pub suggested_command: Option<String>
}

impl UxError {
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            why: None,
            how_to_fix: Vec::new(),
            suggested_command: None
        }
    }

    pub fn why(mut self, reason: impl Into<String>) -> Self {
        self.why = Some(reason.into());
        self
    }

    pub fn fix(mut self, suggestion: impl Into<String>) -> Self {
        self.how_to_fix.push(suggestion.into());
        self
    }

    pub fn suggest(mut self, cmd: impl Into<String>) -> Self {
        self.suggested_command = Some(cmd.into());
        self
    }

    pub fn display(&self) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), self.what.white().bold());

        if let Some(why) = &self.why {
            eprintln!("       {}", why.dimmed());
        }

        if !self.how_to_fix.is_empty() {
            eprintln!();
            eprintln!("{}", "How to fix:".yellow().bold());
            for (i, fix) in self.how_to_fix.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, fix);
            }
        }

        if let Some(cmd) = &self.suggested_command {
            eprintln!();
            eprintln!("{}", "Try this:".green().bold());
            eprintln!("  $ {}", cmd.cyan());
        }
        eprintln!();
    }
}

impl std::fmt::Display for UxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.what)
    }
}

impl std::error::Error for UxError {}

pub fn invalid_config(source: &str, details: &str) -> UxError {
    UxError::new(format!("Invalid configuration in {source}"))
        .why(details.to_string())
        .fix("Check the [api], [cache] and [observability] sections")
        .fix("Unset GB_* environment variables you did not mean to set")
}

pub fn backend_unreachable(details: &str) -> UxError {
    UxError::new("Cannot reach the rubric backend")
        .why(details.to_string())
        .fix("Check that the backend is running")
        .fix("Verify the base URL (--base-url or GB_API_BASE_URL)")
}

pub fn unauthorized(reason: &str) -> UxError {
    let reason = if reason.trim().is_empty() {
        "Invalid or expired credentials"
    } else {
        reason
    };
    UxError::new("Not authorized")
        .why(reason.to_string())
        .fix("Set a valid bearer token in GB_API_TOKEN or [api].auth_token")
}

pub fn not_found(resource: &str, id: &str) -> UxError {
    UxError::new(format!("No {resource} with id '{id}'"))
        .why("It does not exist or was already deleted")
        .fix("List the instructor's rubrics to find the right id")
        .suggest("gradebook tree --instructor <id>")
}

pub fn rate_limited(retry_after: u64) -> UxError {
    UxError::new("Rate limit exceeded")
        .why(format!(
            "Too many requests. Retry after {} seconds",
            retry_after
        ))
        .fix("Wait before retrying")
}

pub fn from_api_error(error: &ApiError) -> UxError {
    match error {
        ApiError::Transport { reason, .. } | ApiError::Unavailable { reason } => {
            backend_unreachable(reason)
        }
        ApiError::Unauthorized { reason } => unauthorized(reason),
        ApiError::NotFound { resource, id } => not_found(resource, id),
        ApiError::RateLimited { retry_after } => rate_limited(*retry_after),
        ApiError::Status { .. } | ApiError::Decode { .. } => {
            UxError::new("Request failed").why(error.to_string())
        }
    }
}

pub fn mutation_failed(failure: &MutationFailure) -> UxError {
    let detail = from_api_error(&failure.cause);
    UxError {
        what: failure.message.clone(),
        why: Some(failure.cause.to_string()),
        ..detail
    }
}
