use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::generation::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::prompts::TaskType;
use crate::store::DB_FILE_NAME;

#[derive(Parser, Debug)]
#[command(
    name = "readbank",
    version,
    about = "Graded EFL reading passage catalog: import, validate, prompt and generate"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Init(InitArgs),
    Status(StatusArgs),
    List(ListArgs),
    Show(ShowArgs),
    Coverage(CoverageArgs),
    Stats(StatsArgs),
    Validate(ValidateArgs),
    ImportCsv(ImportCsvArgs),
    ImportExternal(ImportExternalArgs),
    ExportCsv(ExportCsvArgs),
    Prompt(PromptArgs),
    PromptBatch(PromptBatchArgs),
    Curriculum(CurriculumArgs),
    Generate(GenerateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/readbank")]
    pub data_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// JSON file replacing the built-in band, genre and length tables.
    #[arg(long)]
    pub catalog_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_root.join(DB_FILE_NAME))
    }

    pub fn manifest_dir(&self) -> PathBuf {
        self.data_root.join("manifests")
    }
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub band: Option<String>,

    #[arg(long)]
    pub genre: Option<String>,

    #[arg(long)]
    pub length_type: Option<String>,

    /// Matches topic or body text; results are then ordered by score.
    #[arg(long)]
    pub keyword: Option<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub text_id: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CoverageArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub band: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    /// Exit with an error when any record has findings.
    #[arg(long, default_value_t = false)]
    pub fail_on_findings: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ImportCsvArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ImportExternalArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Directory holding reading_2000.csv, reading_3000.csv and reading_5000.csv.
    #[arg(long, default_value = ".")]
    pub source_dir: PathBuf,

    /// Import a single file instead of the standard tier files.
    #[arg(long, requires = "tier")]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub tier: Option<u32>,

    #[arg(long)]
    pub source_label: Option<String>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportCsvArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct PromptOptionArgs {
    #[arg(long, default_value_t = 5)]
    pub num_questions: u32,

    /// Target band for graded-reader adaptation.
    #[arg(long, default_value = "500-700")]
    pub target_band: String,
}

#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub text_id: String,

    #[arg(long, value_enum)]
    pub task: TaskType,

    #[command(flatten)]
    pub options: PromptOptionArgs,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PromptBatchArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub band: String,

    #[arg(long, value_enum)]
    pub task: TaskType,

    #[command(flatten)]
    pub options: PromptOptionArgs,

    /// Defaults to <data-root>/prompts_export.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CurriculumArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub band: String,

    #[arg(long, default_value_t = 5)]
    pub count: usize,

    /// Write a lesson-plan prompt per step into this directory.
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value = "Narrative")]
    pub genre: String,

    #[arg(long, default_value = "Short")]
    pub length_type: String,

    #[arg(long, default_value = "700-900")]
    pub band: String,

    #[arg(long)]
    pub topic: Option<String>,

    /// Defaults to the band's age group.
    #[arg(long)]
    pub age_group: Option<String>,

    #[arg(long)]
    pub vocabulary_band: Option<String>,

    #[arg(long, default_value_t = false)]
    pub save: bool,

    /// Generate a body for every stored record that has none.
    #[arg(long, default_value_t = false)]
    pub fill_empty_slots: bool,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
}
