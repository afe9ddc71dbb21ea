//! Main loop: read a line, run the command, print the result.
//!
//! Every request races the input reader so Ctrl+C can cancel it. Questions
//! stream through a `CancellationToken` so a cancelled turn is never
//! committed to memory; other commands are cancelled by dropping them.

use std::future::Future;
use std::io::Write;
use std::time::Instant;

use console::style;
use futures_util::StreamExt;
use rustyline_async::SharedWriter;
use tokio_util::sync::CancellationToken;

use lectern_types::error::SessionError;

use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, Command};
use super::input::{InputEvent, ReplInput};
use super::renderer::{Renderer, passages_table, spinner};

pub async fn run_repl(state: &AppState) -> anyhow::Result<()> {
    let prompt = format!("{} ", style("lectern >").green().bold());
    let (mut input, mut out) =
        ReplInput::new(prompt).map_err(|e| anyhow::anyhow!("failed to initialize input: {e}"))?;
    let renderer = Renderer::new();

    print_welcome_banner(
        &mut out,
        state.model(),
        &state.docs.display().to_string(),
        state.session_id.as_str(),
    )?;

    loop {
        let line = match input.read_line().await {
            InputEvent::Line(line) => line,
            InputEvent::Interrupted => {
                writeln!(out, "  {}", style("Nothing to cancel. Ctrl+D or exit to leave.").dim())?;
                continue;
            }
            InputEvent::Eof => break,
        };
        let Some(command) = commands::parse(&line) else {
            continue;
        };
        tracing::debug!(?command, "running command");

        match command {
            Command::Exit => break,
            Command::Help => commands::print_help(&mut out)?,
            Command::Clear => input.clear(),
            Command::Invalid(reason) => writeln!(
                out,
                "  {} {reason}. Type help for commands.",
                style("?").yellow().bold()
            )?,
            Command::Ask(question) => ask(state, &mut input, &mut out, &renderer, question).await?,
            other => run_task(state, &mut input, &mut out, &renderer, other).await?,
        }
    }

    state.assistant.runtime().close(&state.session_id).await;
    writeln!(out, "\n  {}", style("Session ended.").dim())?;
    input.flush();
    Ok(())
}

/// Stream an answer, cancelling on Ctrl+C.
async fn ask(
    state: &AppState,
    input: &mut ReplInput,
    out: &mut SharedWriter,
    renderer: &Renderer,
    question: String,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let cancel = CancellationToken::new();
    let progress = spinner("thinking...");

    // The first question also extracts document info, which can take a while.
    let opened = until_interrupted(
        input,
        out,
        state
            .assistant
            .ask_stream(state.session_id.clone(), question, cancel.clone()),
    )
    .await;
    let mut stream = match opened {
        Some(Ok(stream)) => stream,
        Some(Err(e)) => {
            progress.finish_and_clear();
            return report_error(out, &e);
        }
        None => {
            progress.finish_and_clear();
            return report_cancelled(out);
        }
    };

    let mut answering = false;
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(fragment)) => {
                    if !answering {
                        progress.finish_and_clear();
                        write!(out, "\n  ")?;
                        answering = true;
                    }
                    write!(out, "{fragment}")?;
                }
                Some(Err(SessionError::Cancelled)) => {
                    progress.finish_and_clear();
                    report_cancelled(out)?;
                    break;
                }
                Some(Err(e)) => {
                    progress.finish_and_clear();
                    report_error(out, &e)?;
                    break;
                }
                None => {
                    progress.finish_and_clear();
                    writeln!(out)?;
                    writeln!(out, "{}\n", renderer.footer(started.elapsed(), state.model()))?;
                    break;
                }
            },
            event = input.read_line(), if !cancel.is_cancelled() => match event {
                InputEvent::Interrupted | InputEvent::Eof => cancel.cancel(),
                InputEvent::Line(_) => {
                    writeln!(out, "\n  {}", style("Still answering; Ctrl+C cancels.").dim())?;
                }
            },
        }
    }
    Ok(())
}

/// Everything except questions: run to completion, render, print.
async fn run_task(
    state: &AppState,
    input: &mut ReplInput,
    out: &mut SharedWriter,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let assistant = &state.assistant;
    let started = Instant::now();
    let progress = spinner(progress_message(&command));

    let result = match command {
        Command::Summarize => {
            until_interrupted(input, out, async {
                Ok::<_, anyhow::Error>(renderer.markdown(&assistant.summarize().await?))
            })
            .await
        }
        Command::Keywords => {
            until_interrupted(input, out, async {
                Ok::<_, anyhow::Error>(renderer.keywords(&assistant.keywords().await?))
            })
            .await
        }
        Command::KeywordsByChunk => {
            until_interrupted(input, out, async {
                Ok::<_, anyhow::Error>(renderer.keywords(&assistant.keywords_by_chunk().await?))
            })
            .await
        }
        Command::Theme => {
            until_interrupted(input, out, async {
                Ok::<_, anyhow::Error>(renderer.markdown(&assistant.theme().await?))
            })
            .await
        }
        Command::Info => {
            until_interrupted(input, out, async {
                Ok::<_, anyhow::Error>(renderer.info(assistant.info().await?))
            })
            .await
        }
        Command::Find(query) => {
            let k = state.config.retrieval.k;
            until_interrupted(input, out, async {
                let passages = assistant.find(&query, k).await?;
                let text = if passages.is_empty() {
                    format!("  {}", style("No matching passages.").dim())
                } else {
                    passages_table(&passages).to_string()
                };
                Ok::<_, anyhow::Error>(text)
            })
            .await
        }
        _ => None,
    };
    progress.finish_and_clear();

    match result {
        Some(Ok(text)) => {
            writeln!(out, "\n{}", text.trim_end())?;
            writeln!(out, "\n{}\n", renderer.footer(started.elapsed(), state.model()))?;
            Ok(())
        }
        Some(Err(e)) => report_error(out, &*e),
        None => report_cancelled(out),
    }
}

/// Drive `task` while watching the input. `None` when the user pressed
/// Ctrl+C or Ctrl+D first; the task is dropped in that case.
async fn until_interrupted<F: Future>(
    input: &mut ReplInput,
    out: &mut SharedWriter,
    task: F,
) -> Option<F::Output> {
    tokio::pin!(task);
    loop {
        tokio::select! {
            output = &mut task => return Some(output),
            event = input.read_line() => match event {
                InputEvent::Interrupted | InputEvent::Eof => return None,
                InputEvent::Line(_) => {
                    let _ = writeln!(out, "  {}", style("Still working; Ctrl+C cancels.").dim());
                }
            },
        }
    }
}

fn progress_message(command: &Command) -> &'static str {
    match command {
        Command::Summarize => "summarizing...",
        Command::Keywords | Command::KeywordsByChunk => "extracting keywords...",
        Command::Theme => "finding the theme...",
        Command::Info => "reading document info...",
        Command::Find(_) => "searching...",
        _ => "working...",
    }
}

fn report_error(out: &mut SharedWriter, error: &(dyn std::error::Error + 'static)) -> anyhow::Result<()> {
    tracing::warn!(error = %error, "request failed");
    writeln!(out, "\n  {} {error}", style("!").red().bold())?;
    writeln!(out, "  {}\n", style("Try again, or type exit to quit.").dim())?;
    Ok(())
}

fn report_cancelled(out: &mut SharedWriter) -> anyhow::Result<()> {
    writeln!(out, "\n  {}\n", style("Cancelled.").yellow())?;
    Ok(())
}
