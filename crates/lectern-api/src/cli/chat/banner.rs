//! Welcome banner shown when the loop starts.

use std::io::Write;

use console::style;

/// Print the model, document location and session at start-up.
pub fn print_welcome_banner(
    out: &mut impl Write,
    model: &str,
    docs: &str,
    session_id: &str,
) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  {}", style("lectern").cyan().bold())?;
    writeln!(out, "  {}", style("Ask questions about your documents.").dim())?;
    writeln!(out)?;
    writeln!(out, "  {}     {}", style("Model:").bold(), style(model).dim())?;
    writeln!(out, "  {} {}", style("Documents:").bold(), style(docs).dim())?;
    writeln!(
        out,
        "  {}   {}",
        style("Session:").bold(),
        style(short_id(session_id)).dim()
    )?;
    writeln!(out)?;
    writeln!(
        out,
        "  {}",
        style("Type help for commands, Ctrl+C to cancel, Ctrl+D to exit").dim()
    )?;
    writeln!(out, "  {}", style("---").dim())?;
    writeln!(out)
}

fn short_id(session_id: &str) -> &str {
    // Ids are v7 UUIDs; the tail is the random part.
    let start = session_id.len().saturating_sub(8);
    session_id.get(start..).unwrap_or(session_id)
}
