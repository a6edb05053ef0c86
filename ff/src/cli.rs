//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// FeatureForge - feature breakdown into stories, acceptance criteria and tasks
#[derive(Parser)]
#[command(
    name = "ff",
    about = "Break a feature down into user stories, acceptance criteria and tasks",
    version,
    after_help = "Logs are written to: ~/.local/share/featureforge/logs/featureforge.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline on a feature description
    Run {
        /// Feature description text
        #[arg(value_name = "FEATURE", required_unless_present = "feature_file", conflicts_with = "feature_file")]
        feature: Option<String>,

        /// Read the feature description from a file
        #[arg(long, value_name = "PATH")]
        feature_file: Option<PathBuf>,

        /// Project context shown to every stage
        #[arg(long, conflicts_with = "context_file")]
        context: Option<String>,

        /// Read the project context from a file
        #[arg(long, value_name = "PATH")]
        context_file: Option<PathBuf>,

        /// Write the feature document (JSON) to this path
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Render a saved feature document
    Show {
        /// Feature document (a feature or an `items` envelope)
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the resolved configuration
    Config,
}

/// Output format for run/show
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("featureforge")
        .join("logs")
        .join("featureforge.log")
}

/// Resolve an inline-text / file argument pair
///
/// Inline text is taken literally. Neither given yields an empty string.
pub fn read_text_source(text: Option<String>, file: Option<&Path>, what: &str) -> Result<String> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => {
            debug!(?path, what, "read_text_source: reading file");
            fs::read_to_string(path).context(format!("Failed to read {} file {}", what, path.display()))
        }
        (None, None) => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("TEXT".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("table".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "ff",
            "run",
            "Add login page",
            "--context",
            "Banking app",
            "--format",
            "json",
        ])
        .unwrap();
        let Command::Run {
            feature,
            context,
            format,
            output,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(feature.as_deref(), Some("Add login page"));
        assert_eq!(context.as_deref(), Some("Banking app"));
        assert_eq!(format, OutputFormat::Json);
        assert!(output.is_none());
    }

    #[test]
    fn test_context_sources_conflict() {
        let result = Cli::try_parse_from([
            "ff",
            "run",
            "Add login page",
            "--context",
            "a",
            "--context-file",
            "b.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_feature_sources() {
        let cli = Cli::try_parse_from(["ff", "run", "--feature-file", "feature.md"]).unwrap();
        let Command::Run { feature, feature_file, .. } = cli.command else {
            panic!("expected run");
        };
        assert!(feature.is_none());
        assert_eq!(feature_file, Some(PathBuf::from("feature.md")));

        assert!(Cli::try_parse_from(["ff", "run"]).is_err());
        assert!(Cli::try_parse_from(["ff", "run", "Add login", "--feature-file", "feature.md"]).is_err());
    }

    #[test]
    fn test_inline_text_is_never_a_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feature.md");
        fs::write(&path, "file contents").unwrap();
        let inline = path.to_string_lossy().to_string();

        let text = read_text_source(Some(inline.clone()), None, "feature").unwrap();
        assert_eq!(text, inline);

        let text = read_text_source(None, Some(&path), "feature").unwrap();
        assert_eq!(text, "file contents");
        assert_eq!(read_text_source(None, None, "context").unwrap(), "");

        let err = read_text_source(None, Some(&dir.path().join("missing.md")), "feature").unwrap_err();
        assert!(err.to_string().contains("Failed to read feature file"));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["ff", "config", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Config));
    }
}
