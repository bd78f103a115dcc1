use anyhow::Result;
use clap::Parser;
use deepseek_bedrock::api::BedrockClient;
use deepseek_bedrock::chat::run_chat;
use deepseek_bedrock::cli::{Cli, Commands, OutputFormat};
use deepseek_bedrock::config::Config;
use deepseek_bedrock::demux::Accumulated;
use deepseek_bedrock::session::{ChatSession, ChatSettings};
use deepseek_bedrock::ui::{self, StreamPrinter};
use futures_util::StreamExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("deepseek_bedrock=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn query(
    client: &BedrockClient,
    config: &Config,
    message: &str,
    system: Option<&str>,
    stream: bool,
    format: OutputFormat,
) -> Result<()> {
    let system = system.unwrap_or(config.system_prompt.as_str());
    let conversation = client.create_conversation(message, Some(system))?;
    let params = config.params();

    if !stream {
        let spinner = ui::create_spinner("Thinking...");
        let response = client.query_model(&conversation, &params).await;
        spinner.finish_and_clear();
        ui::display_response(&response?, format);
        return Ok(());
    }

    let mut fragments = client.stream_query_model(&conversation, &params);
    let mut printer = StreamPrinter::new();
    let mut accumulated = Accumulated::default();

    while let Some(fragment) = fragments.next().await {
        let fragment = match fragment {
            Ok(fragment) => fragment,
            Err(e) => {
                if format == OutputFormat::Text {
                    printer.finish();
                }
                return Err(e.into());
            }
        };
        match format {
            OutputFormat::Text => printer.show(&fragment),
            OutputFormat::Json => StreamPrinter::show_json(&fragment),
        }
        accumulated.push(&fragment);
    }

    if format == OutputFormat::Text {
        printer.finish();
    }
    debug!(
        reasoning_chars = accumulated.reasoning.len(),
        answer_chars = accumulated.answer.len(),
        "Stream finished"
    );
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load().await?;
    cli.apply_overrides(&mut config);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let client = BedrockClient::new(&config)?;
            let session = ChatSession::new(&config.model_id, ChatSettings::from_config(&config));
            run_chat(&client, session).await?;
        }
        Commands::Query {
            message,
            system,
            no_stream,
            format,
        } => {
            let client = BedrockClient::new(&config)?;
            query(&client, &config, &message, system.as_deref(), !no_stream, format).await?;
        }
        Commands::Config { show, save } => {
            if save {
                let path = config.save().await?;
                ui::display_info(&format!("Configuration saved to {}", path.display()));
            }
            if show || !save {
                println!("{}", config.redacted());
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli).await {
        ui::display_error(&e.to_string());
        std::process::exit(1);
    }
}
