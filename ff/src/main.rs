//! FeatureForge - feature breakdown CLI
//!
//! CLI entry point for running the pipeline and inspecting its output.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use featureforge::cli::{Cli, Command, OutputFormat, read_text_source};
use featureforge::config::Config;
use featureforge::domain::Feature;
use featureforge::llm::create_client;
use featureforge::pipeline::Orchestrator;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("featureforge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("featureforge.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    info!(provider = %config.llm.provider, model = %config.llm.model, "FeatureForge loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            feature,
            feature_file,
            context,
            context_file,
            output,
            format,
        } => {
            debug!(?feature_file, ?context_file, ?output, %format, "main: matched Run command");
            config.validate()?;
            let feature = read_text_source(feature, feature_file.as_deref(), "feature")?;
            let context = read_text_source(context, context_file.as_deref(), "context")?;
            cmd_run(&config, &feature, &context, output.as_deref(), format).await
        }
        Command::Show { file, format } => {
            debug!(?file, %format, "main: matched Show command");
            cmd_show(&file, format)
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

/// Run the pipeline on one feature description
async fn cmd_run(
    config: &Config,
    feature_description: &str,
    project_context: &str,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    debug!("cmd_run: called");

    let llm = create_client(&config.llm)?;
    let orchestrator = Orchestrator::new(&config.pipeline(), llm);

    println!("{} {}", "Breaking down:".bright_cyan().bold(), first_line(feature_description));
    let result = orchestrator
        .run(feature_description, project_context)
        .await
        .context("Feature breakdown failed")?;

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        fs::write(path, json).context(format!("Failed to write {}", path.display()))?;
        println!("{} {}", "Wrote feature to".green(), path.display());
        return Ok(());
    }

    print_feature(&result, format)
}

/// Render a saved feature document
fn cmd_show(file: &Path, format: OutputFormat) -> Result<()> {
    debug!(?file, "cmd_show: called");
    let content = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    let features = Feature::load_all(&content)?;

    for feature in &features {
        print_feature(feature, format)?;
    }
    Ok(())
}

/// Print the resolved configuration as YAML
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

fn print_feature(feature: &Feature, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(feature)?);
        }
        OutputFormat::Text => {
            println!("{} {}", "Feature".bright_cyan().bold(), feature.title.bold());
            println!("  {}", feature.description);
            for story in &feature.user_stories {
                println!();
                let points = story.story_points.map(|p| format!(" ({} pts)", p)).unwrap_or_default();
                println!("  {} {}{}", "User Story".green().bold(), story.title.bold(), points.dimmed());
                println!("    {}", story.description);
                println!("    {}", "Acceptance Criteria".yellow());
                for criterion in &story.acceptance_criteria {
                    println!("      - {}", criterion);
                }
                println!("    {}", "Tasks".yellow());
                for task in &story.tasks {
                    println!("      - {}: {}", task.title, task.description.dimmed());
                }
            }
        }
    }
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
