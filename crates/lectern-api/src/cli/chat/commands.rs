//! Command parsing for the question loop.
//!
//! Commands are plain words, optionally prefixed with `/`. Any other input
//! is a question.

use std::io::Write;

use console::style;

#[derive(Debug, PartialEq)]
pub enum Command {
    Ask(String),
    Summarize,
    Keywords,
    /// Keywords gathered per chunk instead of from a summary.
    KeywordsByChunk,
    Find(String),
    Info,
    Theme,
    Help,
    Clear,
    Exit,
    /// Unknown `/command`, or a known one with a missing argument.
    Invalid(String),
}

/// Parse one line of input. `None` for blank input.
pub fn parse(input: &str) -> Option<Command> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let slashed = trimmed.starts_with('/');
    let body = trimmed.trim_start_matches('/');
    let (word, rest) = match body.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (body, ""),
    };

    let command = match (word.to_lowercase().as_str(), rest) {
        ("ask", "") => Command::Invalid("ask needs a question".to_string()),
        ("ask", question) => Command::Ask(question.to_string()),
        ("find", "") => Command::Invalid("find needs a query".to_string()),
        ("find", query) => Command::Find(query.to_string()),
        ("summarize" | "summary", "") => Command::Summarize,
        ("keywords", "") => Command::Keywords,
        ("keywords", "chunks" | "--chunks") => Command::KeywordsByChunk,
        ("info", "") => Command::Info,
        ("theme", "") => Command::Theme,
        ("help" | "h" | "?", "") => Command::Help,
        ("clear" | "cls", "") => Command::Clear,
        ("exit" | "quit" | "q", "") => Command::Exit,
        _ if slashed => Command::Invalid(format!("unknown command /{word}")),
        _ => Command::Ask(trimmed.to_string()),
    };
    Some(command)
}

pub fn print_help(out: &mut impl Write) -> std::io::Result<()> {
    let rows = [
        ("ask <question>", "Ask about the documents (bare text works too)"),
        ("summarize", "Summarize the documents"),
        ("keywords", "Keywords from a summary and the abstract"),
        ("keywords chunks", "Keywords gathered chunk by chunk"),
        ("find <query>", "Show the passages that best match a query"),
        ("info", "Title, authors, year and abstract"),
        ("theme", "One-line theme of the documents"),
        ("clear", "Clear the screen"),
        ("exit", "Leave"),
    ];
    writeln!(out)?;
    writeln!(out, "  {}", style("Commands:").bold())?;
    writeln!(out)?;
    for (command, about) in rows {
        writeln!(out, "  {}{}", style(format!("{command:<18}")).cyan(), about)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "  {}",
        style("Ctrl+C cancels the running request, Ctrl+D exits").dim()
    )?;
    writeln!(out)
}
