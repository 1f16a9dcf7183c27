use clap::{Args, Subcommand};
use config::Config;
use gb_core::ScoringLevelInput;

#[derive(Subcommand)]
pub enum ScoringCommand {
    #[command(about = "Add a scoring level to a criterion")]
    Create(ScoringCreateArgs),

    #[command(about = "Update a scoring level")]
    Update(ScoringUpdateArgs),

    #[command(about = "Delete a scoring level")]
    Delete(ScoringDeleteArgs)
}

/// Parent rubric and criterion of a scoring level.
#[derive(Args)]
pub struct ScoringParent {
    #[arg(short, long)]
    pub rubric: String,

    #[arg(short, long)]
    pub criterion: String
}

#[derive(Args)]
pub struct ScoringFields {
    /// Expected performance, e.g. "Exceeds expectations"
    #[arg(long = "expectation")]
    pub performance_expectation: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Free-form range, e.g. "8-10 points"
    #[arg(long = "range")]
    pub score_range: Option<String>,

    /// Whether this level passes (true/false)
    #[arg(long = "passing", value_parser = super::parse_flag)]
    pub is_passing: Option<bool>
}

impl From<ScoringFields> for ScoringLevelInput {
    fn from(fields: ScoringFields) -> Self {
        Self {
            performance_expectation: fields.performance_expectation,
            description: fields.description,
            score_range: fields.score_range,
            is_passing: fields.is_passing
        }
    }
}

#[derive(Args)]
pub struct ScoringCreateArgs {
    #[command(flatten)]
    pub parent: ScoringParent,

    #[command(flatten)]
    pub fields: ScoringFields,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

#[derive(Args)]
pub struct ScoringUpdateArgs {
    /// Scoring level to update
    pub scoring_uuid: String,

    #[command(flatten)]
    pub parent: ScoringParent,

    #[command(flatten)]
    pub fields: ScoringFields,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

#[derive(Args)]
pub struct ScoringDeleteArgs {
    /// Scoring level to delete
    pub scoring_uuid: String,

    #[command(flatten)]
    pub parent: ScoringParent,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

pub async fn run(cmd: ScoringCommand, config: &Config) -> anyhow::Result<()> {
    let mutations = super::mutations(config)?;
    match cmd {
        ScoringCommand::Create(args) => {
            let result = mutations
                .create_scoring(
                    &args.parent.rubric,
                    &args.parent.criterion,
                    &args.fields.into()
                )
                .await;
            super::report_saved(result, args.json)
        }
        ScoringCommand::Update(args) => {
            let result = mutations
                .update_scoring(
                    &args.parent.rubric,
                    &args.parent.criterion,
                    &args.scoring_uuid,
                    &args.fields.into()
                )
                .await;
            super::report_saved(result, args.json)
        }
        ScoringCommand::Delete(args) => {
            let result = mutations
                .delete_scoring(&args.parent.rubric, &args.parent.criterion, &args.scoring_uuid)
                .await;
            super::report_deleted(result, args.json)
        }
    }
}
