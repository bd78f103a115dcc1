//! Interactive chat loop

use crate::api::BedrockClient;
use crate::cli::OutputFormat;
use crate::demux::Accumulated;
use crate::error::{AppError, Result};
use crate::session::{ChatSession, ChatSettings};
use crate::ui::{self, StreamPrinter};
use futures_util::StreamExt;
use std::ops::RangeInclusive;
use tracing::{debug, info};

const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
const TOP_P_RANGE: RangeInclusive<f32> = 0.0..=1.0;
const MAX_TOKENS_RANGE: RangeInclusive<u32> = 256..=8192;

/// One line typed at the chat prompt
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// `exit` or `quit`
    Exit,
    /// Drop the transcript
    Clear,
    /// Show the command list
    Help,
    /// Show the transcript
    History,
    /// Write the transcript to a file
    Save,
    /// Show the current settings
    Settings,
    /// `/system <text>`
    SetSystem(String),
    /// `/temperature <value>`
    SetTemperature(f32),
    /// `/max-tokens <value>`
    SetMaxTokens(u32),
    /// `/top-p <value>`
    SetTopP(f32),
    /// `/stream on|off`
    SetStreaming(bool),
    /// Anything else is a question, kept verbatim
    Ask(String),
    /// Blank line
    Empty,
}

impl ChatCommand {
    /// Parse a prompt line, range-checking setting values.
    ///
    /// Keyword commands are accepted with or without a leading `/`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::Empty);
        }

        let lowered = trimmed.to_lowercase();
        match lowered.strip_prefix('/').unwrap_or(lowered.as_str()) {
            "exit" | "quit" => return Ok(Self::Exit),
            "clear" => return Ok(Self::Clear),
            "help" => return Ok(Self::Help),
            "history" => return Ok(Self::History),
            "save" => return Ok(Self::Save),
            "settings" => return Ok(Self::Settings),
            _ => {}
        }

        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Self::Ask(input.to_string()));
        };
        let (name, value) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(name, value)| (name, value.trim()));

        match name {
            "system" if value.is_empty() => Err(invalid("system prompt must not be empty")),
            "system" => Ok(Self::SetSystem(value.to_string())),
            "temperature" => parse_in_range("temperature", value, &TEMPERATURE_RANGE)
                .map(Self::SetTemperature),
            "max-tokens" => {
                parse_in_range("max-tokens", value, &MAX_TOKENS_RANGE).map(Self::SetMaxTokens)
            }
            "top-p" => parse_in_range("top-p", value, &TOP_P_RANGE).map(Self::SetTopP),
            "stream" => match value {
                "on" | "true" => Ok(Self::SetStreaming(true)),
                "off" | "false" => Ok(Self::SetStreaming(false)),
                _ => Err(invalid("stream expects 'on' or 'off'")),
            },
            _ => Err(invalid(&format!("unknown command '/{name}'"))),
        }
    }
}

fn invalid(message: &str) -> AppError {
    AppError::InvalidSetting(message.to_string())
}

fn parse_in_range<T>(name: &str, value: &str, range: &RangeInclusive<T>) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display,
{
    let parsed: T = value
        .parse()
        .map_err(|_| invalid(&format!("{name} expects a number, got '{value}'")))?;

    if range.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(invalid(&format!(
            "{name} must be between {} and {}",
            range.start(),
            range.end()
        )))
    }
}

/// Apply a settings command; returns false for commands that are not settings
pub fn apply_setting(settings: &mut ChatSettings, command: &ChatCommand) -> bool {
    match command {
        ChatCommand::SetSystem(prompt) => settings.system_prompt.clone_from(prompt),
        ChatCommand::SetTemperature(value) => settings.temperature = *value,
        ChatCommand::SetMaxTokens(value) => settings.max_tokens = *value,
        ChatCommand::SetTopP(value) => settings.top_p = *value,
        ChatCommand::SetStreaming(value) => settings.streaming = *value,
        _ => return false,
    }
    true
}

/// Run the interactive chat until the user exits
pub async fn run_chat(client: &BedrockClient, mut session: ChatSession) -> Result<()> {
    ui::show_welcome(client.model_id());
    info!(session_id = %session.id, "Chat session started");

    loop {
        let line = ui::get_input("You").map_err(|e| AppError::Prompt(e.to_string()))?;

        let command = match ChatCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                ui::display_error(&e.to_string());
                continue;
            }
        };

        match command {
            ChatCommand::Exit => break,
            ChatCommand::Empty => {}
            ChatCommand::Clear => {
                session.clear();
                ui::clear_screen();
                ui::display_info("Chat history cleared");
            }
            ChatCommand::Help => ui::show_help(),
            ChatCommand::History => ui::show_history(session.history()),
            ChatCommand::Settings => ui::show_settings(&session.settings),
            ChatCommand::Save => match session.save(None).await {
                Ok(path) => ui::display_info(&format!("Saved transcript to {}", path.display())),
                Err(e) => ui::display_error(&e.to_string()),
            },
            ChatCommand::Ask(question) => {
                if let Err(e) = ask(client, &mut session, &question).await {
                    ui::display_error(&e.to_string());
                }
            }
            setting => {
                apply_setting(&mut session.settings, &setting);
                debug!(?setting, "Updated chat settings");
                ui::display_info("Setting updated");
            }
        }
    }

    info!(session_id = %session.id, messages = session.history().len(), "Chat session ended");
    Ok(())
}

/// Send one question and record the answer.
///
/// A failed turn is removed from the transcript so it does not leak into the
/// context of later questions.
pub async fn ask(client: &BedrockClient, session: &mut ChatSession, question: &str) -> Result<()> {
    session.push_user(question);

    match answer(client, session, question).await {
        Ok(text) => {
            session.push_assistant(text);
            Ok(())
        }
        Err(e) => {
            session.messages.pop();
            Err(e)
        }
    }
}

async fn answer(client: &BedrockClient, session: &ChatSession, question: &str) -> Result<String> {
    let query = session.contextual_query(question);
    let conversation =
        client.create_conversation(&query, Some(&session.settings.system_prompt))?;
    let params = session.settings.params();

    if session.settings.streaming {
        let mut stream = client.stream_query_model(&conversation, &params);
        let mut printer = StreamPrinter::new();
        let mut accumulated = Accumulated::default();

        while let Some(fragment) = stream.next().await {
            let fragment = match fragment {
                Ok(fragment) => fragment,
                Err(e) => {
                    printer.finish();
                    return Err(e);
                }
            };
            printer.show(&fragment);
            accumulated.push(&fragment);
        }
        printer.finish();

        Ok(accumulated.answer)
    } else {
        let spinner = ui::create_spinner("Thinking...");
        let result = client.query_model(&conversation, &params).await;
        spinner.finish_and_clear();

        let response = result?;
        ui::display_response(&response, OutputFormat::Text);
        Ok(response.response_text)
    }
}
