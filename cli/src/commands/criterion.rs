use clap::{Args, Subcommand};
use config::Config;
use gb_core::CriterionInput;

#[derive(Subcommand)]
pub enum CriterionCommand {
    #[command(about = "Add a criterion to a rubric")]
    Create(CriterionCreateArgs),

    #[command(about = "Update a criterion")]
    Update(CriterionUpdateArgs),

    #[command(about = "Delete a criterion and its scoring levels")]
    Delete(CriterionDeleteArgs)
}

#[derive(Args)]
pub struct CriterionFields {
    /// Component name shown to graders
    #[arg(long = "name")]
    pub component_name: Option<String>,

    #[arg(long)]
    pub weight: Option<f64>,

    /// Position within the rubric
    #[arg(long)]
    pub order: Option<i32>
}

impl From<CriterionFields> for CriterionInput {
    fn from(fields: CriterionFields) -> Self {
        Self {
            component_name: fields.component_name,
            weight: fields.weight,
            display_order: fields.order
        }
    }
}

#[derive(Args)]
pub struct CriterionCreateArgs {
    /// Parent rubric
    #[arg(short, long)]
    pub rubric: String,

    #[command(flatten)]
    pub fields: CriterionFields,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

#[derive(Args)]
pub struct CriterionUpdateArgs {
    /// Criterion to update
    pub criteria_uuid: String,

    /// Parent rubric
    #[arg(short, long)]
    pub rubric: String,

    #[command(flatten)]
    pub fields: CriterionFields,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

#[derive(Args)]
pub struct CriterionDeleteArgs {
    /// Criterion to delete
    pub criteria_uuid: String,

    /// Parent rubric
    #[arg(short, long)]
    pub rubric: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool
}

pub async fn run(cmd: CriterionCommand, config: &Config) -> anyhow::Result<()> {
    let mutations = super::mutations(config)?;
    match cmd {
        CriterionCommand::Create(args) => {
            let result = mutations
                .create_criterion(&args.rubric, &args.fields.into())
                .await;
            super::report_saved(result, args.json)
        }
        CriterionCommand::Update(args) => {
            let result = mutations
                .update_criterion(&args.rubric, &args.criteria_uuid, &args.fields.into())
                .await;
            super::report_saved(result, args.json)
        }
        CriterionCommand::Delete(args) => {
            let result = mutations
                .delete_criterion(&args.rubric, &args.criteria_uuid)
                .await;
            super::report_deleted(result, args.json)
        }
    }
}
