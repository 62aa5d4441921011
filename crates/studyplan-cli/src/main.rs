mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use studyplan_core::{
    CommandCompletion, CompletionSettings, DirectorySink, NullSink, OutputSink, StudyPlanner,
    UserLevel,
};

use config::{CliOverrides, StudyplanConfig};

#[derive(Parser)]
#[command(
    name = "studyplan",
    about = "Turn a learning topic into a staged study plan with ranked book recommendations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a study plan for a topic
    Run {
        /// Topic to study (e.g. "Graph Theory")
        topic: String,
        /// Learner level: beginner, intermediate or advanced
        #[arg(long, default_value = "beginner")]
        level: UserLevel,
        /// Also write the document to this file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory for saved plans (overrides STUDYPLAN_OUTPUT_DIR)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Do not save the plan to the output directory
        #[arg(long)]
        no_save: bool,
        /// Print the final session state as JSON instead of the document
        #[arg(long)]
        json: bool,
        /// Only log warnings and errors
        #[arg(long, short)]
        quiet: bool,
        /// Log every workflow step at info level
        #[arg(long, short)]
        verbose: bool,
        /// Ceiling on node executions for the session
        #[arg(long)]
        max_steps: Option<usize>,
        /// Completion command (overrides STUDYPLAN_COMPLETION_COMMAND)
        #[arg(long)]
        command: Option<String>,
        /// Model name passed to the completion command
        #[arg(long)]
        model: Option<String>,
    },
    /// Write a studyplan config file
    Init {
        /// Completion command to store in the config file
        #[arg(long)]
        command: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Options for `studyplan run` that shape the output rather than the session.
struct RunOptions {
    output: Option<PathBuf>,
    no_save: bool,
    json: bool,
    verbose: bool,
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the `studyplan init` command: write config file.
fn cmd_init(command: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        completion: CompletionSettings {
            command: command.clone(),
            ..CompletionSettings::default()
        },
        ..config::ConfigFile::default()
    };
    config::save_config(&path, &cfg)?;

    println!("Config written to {}", path.display());
    match command {
        Some(command) => println!("  completion.command = {command}"),
        None => {
            println!();
            println!(
                "Next: set completion.command in the file or export {}.",
                config::ENV_COMPLETION_COMMAND
            );
        }
    }
    Ok(())
}

/// Execute the `studyplan run` command: run one session and print the result.
async fn cmd_run(
    topic: &str,
    level: UserLevel,
    overrides: CliOverrides,
    options: RunOptions,
) -> anyhow::Result<()> {
    let topic = topic.trim();
    if topic.is_empty() {
        bail!("topic must not be empty");
    }

    let resolved = StudyplanConfig::resolve(overrides)?;
    let completion = CommandCompletion::from_settings(&resolved.completion)?;
    let sink: Arc<dyn OutputSink> = if options.no_save {
        Arc::new(NullSink)
    } else {
        Arc::new(DirectorySink::new(&resolved.output_dir))
    };

    let planner = StudyPlanner::new(
        Arc::new(completion),
        sink,
        resolved.limits.clone(),
        resolved.completion.search_temperature,
    )
    .context("workflow graph is invalid")?;

    let outcome = planner
        .run(topic, level, options.verbose)
        .await
        .with_context(|| format!("study plan session for {topic:?} failed"))?;

    if outcome.is_limited() {
        warn!(
            session_id = %outcome.session_id,
            "plan was produced with limited resources; see the warning at the top"
        );
    }

    if let Some(path) = &options.output {
        tokio::fs::write(path, &outcome.document)
            .await
            .with_context(|| format!("failed to write study plan to {}", path.display()))?;
        info!(path = %path.display(), "study plan written");
    }

    if options.json {
        let json = serde_json::to_string_pretty(&outcome.state)
            .context("failed to serialize session state")?;
        println!("{json}");
    } else {
        println!("{}", outcome.document);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { command, force } => {
            init_tracing(false);
            cmd_init(command, force)?;
        }
        Commands::Run {
            topic,
            level,
            output,
            output_dir,
            no_save,
            json,
            quiet,
            verbose,
            max_steps,
            command,
            model,
        } => {
            init_tracing(quiet);
            let overrides = CliOverrides {
                command,
                model,
                output_dir,
                max_steps,
            };
            let options = RunOptions {
                output,
                no_save,
                json,
                verbose,
            };
            cmd_run(&topic, level, overrides, options).await?;
        }
    }

    Ok(())
}
