mod catalog;
mod classify;
mod cli;
mod commands;
mod csv_io;
mod generation;
mod importer;
mod model;
mod prompts;
mod store;
mod text_stats;
mod util;
mod validation;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Status(args) => commands::status::run(args),
        Commands::List(args) => commands::texts::run_list(args),
        Commands::Show(args) => commands::texts::run_show(args),
        Commands::Coverage(args) => commands::texts::run_coverage(args),
        Commands::Stats(args) => commands::texts::run_stats(args),
        Commands::Validate(args) => commands::validate::run(args),
        Commands::ImportCsv(args) => commands::transfer::run_import(args),
        Commands::ImportExternal(args) => commands::import_external::run(args),
        Commands::ExportCsv(args) => commands::transfer::run_export(args),
        Commands::Prompt(args) => commands::prompt::run(args),
        Commands::PromptBatch(args) => commands::prompt::run_batch(args),
        Commands::Curriculum(args) => commands::curriculum::run(args),
        Commands::Generate(args) => commands::generate::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
