//! Terminal output: markdown through `termimad`, passages through
//! `comfy-table`, progress through `indicatif`.
//!
//! Streamed answers are printed raw as fragments arrive; whole results
//! (summaries, info) are rendered as markdown.

use std::time::Duration;

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use termimad::MadSkin;

use lectern_types::document::{DocumentInfo, Passage};

/// Passage text is cut to this many characters in tables.
const PASSAGE_PREVIEW_CHARS: usize = 240;

pub struct Renderer {
    skin: MadSkin,
}

impl Renderer {
    pub fn new() -> Self {
        let mut skin = MadSkin::default_dark();
        skin.bold.set_fg(termimad::crossterm::style::Color::Cyan);
        skin.headers[0].set_fg(termimad::crossterm::style::Color::Cyan);
        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);
        Self { skin }
    }

    pub fn markdown(&self, text: &str) -> String {
        self.skin.term_text(text).to_string()
    }

    /// Title, authors, year and abstract as markdown.
    pub fn info(&self, info: &DocumentInfo) -> String {
        self.markdown(&info_markdown(info))
    }

    /// Keywords as a single comma-separated line.
    pub fn keywords(&self, keywords: &[String]) -> String {
        if keywords.is_empty() {
            return format!("  {}", style("No keywords found.").dim());
        }
        format!("  {}", keywords.join(", "))
    }

    pub fn footer(&self, elapsed: Duration, model: &str) -> String {
        format!(
            "  {} {:.1}s {} {}",
            style("|").dim(),
            style(elapsed.as_secs_f64()).dim(),
            style("\u{00b7}").dim(),
            style(model).dim(),
        )
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn info_markdown(info: &DocumentInfo) -> String {
    let or_unknown = |s: &str| if s.trim().is_empty() { "unknown".to_string() } else { s.to_string() };
    let year = if info.year > 0 { info.year.to_string() } else { "unknown".to_string() };
    let mut md = format!(
        "**Title:** {}\n**Authors:** {}\n**Year:** {}\n",
        or_unknown(&info.title),
        or_unknown(&info.authors.join(", ")),
        year,
    );
    if !info.abstract_text.is_empty() {
        md.push_str(&format!("\n**Abstract:** {}\n", info.abstract_text));
    }
    md
}

/// Ranked passages with score and location.
pub fn passages_table(passages: &[Passage]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Score", "Source", "Pages", "Passage"]);

    for (rank, passage) in passages.iter().enumerate() {
        let pages = match passage.page_range {
            Some(r) if r.first == r.last => r.first.to_string(),
            Some(r) => format!("{}-{}", r.first, r.last),
            None => "-".to_string(),
        };
        table.add_row(vec![
            (rank + 1).to_string(),
            format!("{:.2}", passage.score),
            passage.source.clone().unwrap_or_else(|| "-".to_string()),
            pages,
            preview(&passage.text),
        ]);
    }
    table
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PASSAGE_PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(PASSAGE_PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

/// Spinner on stderr until the returned bar is finished.
pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
