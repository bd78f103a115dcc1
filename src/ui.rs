//! User interface components and interactions

use crate::api::ModelResponse;
use crate::cli::OutputFormat;
use crate::demux::{Fragment, FragmentKind};
use crate::session::{ChatMessage, ChatSettings};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use termimad::{FmtText, MadSkin};
use textwrap::{wrap, Options};

/// Display a welcome message
pub fn show_welcome(model_id: &str) {
    println!("{}", "╔══════════════════════════════════════╗".cyan());
    println!(
        "{}",
        "║       Deepseek-R1 · AWS Bedrock      ║".cyan().bold()
    );
    println!("{}", "╚══════════════════════════════════════╝".cyan());
    println!("{} {}", "Model:".dimmed(), model_id.dimmed());
    println!();
    println!("Ask me any physics questions, and follow up with more questions!");
    println!("{}", "Type 'help' for commands, 'exit' to quit".dimmed());
    println!();
}

/// Get user input with a prompt
pub fn get_input(prompt: &str) -> io::Result<String> {
    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()
        .map_err(io::Error::other)
}

/// Get terminal width for proper text wrapping with margins
fn get_terminal_width() -> usize {
    let full_width = terminal_size::terminal_size()
        .map_or(80, |(width, _)| usize::from(width.0));

    full_width.saturating_sub(8).max(20)
}

/// Wrap text to fit terminal width with a two-space margin
pub fn wrap_text(text: &str) -> String {
    let options = Options::new(get_terminal_width()).break_words(false);

    text.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                wrap(line, &options)
                    .into_iter()
                    .map(|cow| format!("  {cow}"))
                    .collect()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn create_markdown_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.set_headers_fg(termimad::crossterm::style::Color::Cyan);
    skin.bold.set_fg(termimad::crossterm::style::Color::Yellow);
    skin.italic.set_fg(termimad::crossterm::style::Color::Magenta);
    skin.inline_code.set_fg(termimad::crossterm::style::Color::Green);
    skin
}

/// Render markdown for the terminal, indented to match the rest of the output
pub fn render_markdown(text: &str) -> String {
    let skin = create_markdown_skin();
    let rendered = FmtText::from(&skin, text, Some(get_terminal_width()));

    rendered
        .to_string()
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("  {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Display a blocking response
pub fn display_response(response: &ModelResponse, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "Reasoning:".yellow().bold());
            println!("{}", wrap_text(&response.reasoning_text).dimmed());
            println!();
            println!("{}", "Final Response:".green().bold());
            println!("{}", render_markdown(&response.response_text));
            println!();
        }
        OutputFormat::Json => match serde_json::to_string_pretty(response) {
            Ok(json) => println!("{json}"),
            Err(e) => display_error(&e.to_string()),
        },
    }
}

/// Prints fragments as they arrive, with one header per kind
#[derive(Debug, Default)]
pub struct StreamPrinter {
    printed_reasoning: bool,
    printed_final: bool,
}

impl StreamPrinter {
    /// Create a printer that has not shown any header yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Print one fragment
    pub fn show(&mut self, fragment: &Fragment) {
        match fragment.kind {
            FragmentKind::Reasoning => {
                if !self.printed_reasoning {
                    println!("\n{}", "Reasoning:".yellow().bold());
                    self.printed_reasoning = true;
                }
                print!("{}", fragment.text.dimmed());
            }
            FragmentKind::Final => {
                if !self.printed_final {
                    println!("\n\n{}", "Final Response:".green().bold());
                    self.printed_final = true;
                }
                print!("{}", fragment.text);
            }
        }
        let _ = io::stdout().flush();
    }

    /// Print one fragment as a JSON line
    pub fn show_json(fragment: &Fragment) {
        if let Ok(line) = serde_json::to_string(fragment) {
            println!("{line}");
        }
    }

    /// End the streamed output
    pub fn finish(&self) {
        println!();
        println!();
    }
}

/// Display an error message
pub fn display_error(error: &str) {
    eprintln!("{} {}", "Error:".red().bold(), error);
}

/// Display a short confirmation
pub fn display_info(message: &str) {
    println!("{}", message.dimmed());
}

/// Create a spinner for loading states
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Clear the terminal screen
pub fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
    let _ = io::stdout().flush();
}

/// Display help information
pub fn show_help() {
    println!("{}", "Available Commands:".yellow().bold());
    println!("  {}           - End the chat session", "exit/quit".cyan());
    println!("  {}               - Clear the chat history", "clear".cyan());
    println!("  {}             - Show the chat history", "history".cyan());
    println!("  {}                - Save the transcript to a file", "save".cyan());
    println!("  {}            - Show current model settings", "settings".cyan());
    println!("  {}      - Set the system prompt", "/system <text>".cyan());
    println!("  {} - Set temperature (0.0-1.0)", "/temperature <value>".cyan());
    println!("  {}  - Set max tokens (256-8192)", "/max-tokens <value>".cyan());
    println!("  {}       - Set top-p (0.0-1.0)", "/top-p <value>".cyan());
    println!("  {}        - Toggle streaming", "/stream on|off".cyan());
    println!("  {}                - Show this help message", "help".cyan());
    println!("{}", "Keyword commands also accept a leading '/'".dimmed());
    println!();
}

/// Display the current chat settings
pub fn show_settings(settings: &ChatSettings) {
    println!("{}", "Model Settings:".yellow().bold());
    println!("  {} {}", "System prompt:".cyan(), settings.system_prompt);
    println!("  {}   {}", "Temperature:".cyan(), settings.temperature);
    println!("  {}    {}", "Max tokens:".cyan(), settings.max_tokens);
    println!("  {}         {}", "Top P:".cyan(), settings.top_p);
    println!(
        "  {}     {}",
        "Streaming:".cyan(),
        if settings.streaming { "on" } else { "off" }
    );
    println!();
}

/// Display the transcript
pub fn show_history(messages: &[ChatMessage]) {
    if messages.is_empty() {
        display_info("No messages yet");
        return;
    }

    for message in messages {
        println!("{}", format!("{}:", message.role.label()).cyan().bold());
        println!("{}", wrap_text(&message.content));
        println!();
    }
}
