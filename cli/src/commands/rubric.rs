use clap::{Args, Subcommand};
use config::Config;
use gb_core::RubricInput;

#[derive(Subcommand)]
pub enum RubricCommand {
    #[command(about = "Create a rubric for an instructor")]
    Create(RubricCreateArgs),

    #[command(about = "Update a rubric's fields")]
    Update(RubricUpdateArgs),

    #[command(about = "Delete a rubric with its criteria and scoring levels")]
    Delete(RubricDeleteArgs)
}

#[derive(Args)]
pub struct RubricFields {
    /// Rubric title
    #[arg(long)]
    pub title: Option<String>,

    /// Longer description
    #[arg(long)]
    pub description: Option<String>,

    /// Rubric type, e.g. "analytic" or "holistic"
    #[arg(long = "type")]
    pub rubric_type: Option<String>,

    /// Visible to other instructors (true/false)
    #[arg(long, value_parser = super::parse_flag)]
    pub public: Option<bool>,

    #[arg(long)]
    pub total_weight: Option<f64>,

    #[arg(long)]
    pub max_score: Option<f64>,

    #[arg(long)]
    pub min_passing_score: Option<f64>
}

impl RubricFields {
    fn into_input(self) -> RubricInput {
        RubricInput {
            title: self.title,
            description: self.description,
            rubric_type: self.rubric_type,
            is_public: self.public,
            total_weight: self.total_weight,
            max_score: self.max_score,
            min_passing_score: self.min_passing_score,
            instructor_uuid: None
        }
    }
}

#[derive(Args)]
pub struct RubricCreateArgs {
    /// Owning instructor
    #[arg(short, long, env = "GB_INSTRUCTOR")]
    pub instructor: String,

    #[command(flatten)]
    pub fields: RubricFields,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

#[derive(Args)]
pub struct RubricUpdateArgs {
    /// Rubric to update
    pub rubric_uuid: String,

    /// Owning instructor
    #[arg(short, long, env = "GB_INSTRUCTOR")]
    pub instructor: String,

    #[command(flatten)]
    pub fields: RubricFields,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

#[derive(Args)]
pub struct RubricDeleteArgs {
    /// Rubric to delete
    pub rubric_uuid: String,

    /// Owning instructor
    #[arg(short, long, env = "GB_INSTRUCTOR")]
    pub instructor: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

pub async fn run(cmd: RubricCommand, config: &Config) -> anyhow::Result<()> {
    let mutations = super::mutations(config)?;
    match cmd {
        RubricCommand::Create(args) => {
            let input = args.fields.into_input();
            let result = mutations.create_rubric(&args.instructor, &input).await;
            super::report_saved(result, args.json)
        }
        RubricCommand::Update(args) => {
            let input = args.fields.into_input();
            let result = mutations
                .update_rubric(&args.instructor, &args.rubric_uuid, &input)
                .await;
            super::report_saved(result, args.json)
        }
        RubricCommand::Delete(args) => {
            let result = mutations
                .delete_rubric(&args.instructor, &args.rubric_uuid)
                .await;
            super::report_deleted(result, args.json)
        }
    }
}
