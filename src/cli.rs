//! CLI interface and command handling

use crate::config::Config;
use clap::{Parser, Subcommand};

/// Deepseek-R1 on AWS Bedrock, with the model's reasoning shown next to its answer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute (defaults to `chat`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug logging
    #[arg(short, long, env = "BEDROCK_DEBUG")]
    pub debug: bool,

    /// Override the model id
    #[arg(short, long)]
    pub model: Option<String>,

    /// Override maximum tokens
    #[arg(short = 't', long)]
    pub max_tokens: Option<u32>,

    /// Override sampling temperature (0.0-1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Override nucleus sampling threshold (0.0-1.0)
    #[arg(long)]
    pub top_p: Option<f32>,
}

impl Cli {
    /// Apply the global flags on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model_id.clone_from(model);
        }
        if self.max_tokens.is_some() {
            config.max_tokens = self.max_tokens;
        }
        if self.temperature.is_some() {
            config.temperature = self.temperature;
        }
        if self.top_p.is_some() {
            config.top_p = self.top_p;
        }
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Send a single query and print the reasoning and the answer
    Query {
        /// The query to send
        message: String,

        /// System prompt for this query
        #[arg(short, long)]
        system: Option<String>,

        /// Wait for the complete response instead of streaming it
        #[arg(long)]
        no_stream: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or save the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the effective non-secret settings to the config file
        #[arg(long)]
        save: bool,
    },
}

/// How `query` prints its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Headed, colored sections
    Text,
    /// JSON object, or one JSON line per fragment when streaming
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_query_flags() {
        let cli = Cli::try_parse_from([
            "deepseek-bedrock",
            "--temperature",
            "0.3",
            "query",
            "What is the speed of light?",
            "--no-stream",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.temperature, Some(0.3));
        match cli.command {
            Some(Commands::Query {
                message,
                no_stream,
                format,
                system,
            }) => {
                assert_eq!(message, "What is the speed of light?");
                assert!(no_stream);
                assert_eq!(format, OutputFormat::Json);
                assert!(system.is_none());
            }
            other => panic!("Expected query command, got {other:?}"),
        }
    }

    #[test]
    fn flags_override_configured_values() {
        let cli = Cli::try_parse_from([
            "deepseek-bedrock",
            "--model",
            "deepseek.r1-v1:0",
            "--max-tokens",
            "1024",
            "chat",
        ])
        .unwrap();
        let mut config = Config {
            max_tokens: Some(2048),
            temperature: Some(0.3),
            ..Config::default()
        };

        cli.apply_overrides(&mut config);

        assert_eq!(config.model_id, "deepseek.r1-v1:0");
        assert_eq!(config.max_tokens, Some(1024));
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.top_p, None);
    }
}
