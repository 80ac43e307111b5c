//! Terminal chat
//!
//! Line-based conversation on one thread. Ctrl-C while waiting stops the
//! wait and keeps the thread; Ctrl-C at the prompt quits. `/open N` opens
//! image N of the last reply.

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use lisa_core::assistant::JobStatus;
use lisa_core::session::SessionEvent;
use lisa_core::{
    AssistantService, LisaConfig, RenderDispatcher, SessionError, SessionOrchestrator,
    ThreadRegistry,
};

use crate::tui::markdown::{render_instruction, RenderedReply};
use crate::tui::{print_inline, print_lines};
use crate::tui::theme::Theme;

const DEFAULT_WIDTH: usize = 80;

const HELP: &str = "Commands: /open N (open image N), /new (new thread), /quit";

enum Command {
    Quit,
    NewThread,
    Open(usize),
    Help,
    Message(String),
}

fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let mut parts = input.split_whitespace();
    let command = match parts.next()? {
        "/quit" | "/exit" => Command::Quit,
        "/new" => Command::NewThread,
        "/help" => Command::Help,
        "/open" => match parts.next().and_then(|n| n.parse().ok()) {
            Some(n) => Command::Open(n),
            None => Command::Help,
        },
        _ => Command::Message(input.to_string()),
    };
    Some(command)
}

pub async fn run(
    service: Arc<dyn AssistantService>,
    config: &LisaConfig,
    thread_id: Option<String>,
) -> Result<()> {
    let orchestrator = SessionOrchestrator::new(service, Arc::new(ThreadRegistry::new()))
        .with_poll_config(config.poll_config());
    let dispatcher = RenderDispatcher::new(config.render.clone());
    let theme = Theme::default();
    let mut stdout = io::stdout();

    let mut thread_id = thread_id;
    let mut last_reply = RenderedReply::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tokio::spawn(show_progress(orchestrator.subscribe(), theme.clone()));
    let mut interrupts = listen_for_interrupts();

    status(&mut stdout, &theme, HELP)?;
    loop {
        print_prompt(&mut stdout, &theme)?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            Some(()) = interrupts.recv() => None,
        };
        let Some(input) = line else {
            writeln!(stdout)?;
            break;
        };

        match parse_command(&input) {
            None => continue,
            Some(Command::Quit) => break,
            Some(Command::Help) => status(&mut stdout, &theme, HELP)?,
            Some(Command::NewThread) => {
                thread_id = None;
                status(&mut stdout, &theme, "Started a new conversation")?;
            }
            Some(Command::Open(n)) => open_image(&mut stdout, &theme, &last_reply, n)?,
            Some(Command::Message(text)) => {
                status(&mut stdout, &theme, "Lisa is thinking... (Ctrl-C to stop waiting)")?;

                let cancel = CancellationToken::new();
                let submit =
                    orchestrator.submit_with_cancel(thread_id.as_deref(), &text, cancel.clone());
                let result = until_interrupted(submit, &mut interrupts, &cancel).await;

                match result {
                    Ok(reply) => {
                        thread_id = Some(reply.thread_id.clone());
                        let instruction = dispatcher.classify(&reply.payload);
                        last_reply = render_instruction(&instruction, terminal_width(), &theme);

                        let name = Style::default()
                            .fg(theme.assistant_msg_color)
                            .add_modifier(Modifier::BOLD);
                        print_lines(&mut stdout, &[Line::from(Span::styled("Lisa", name))])?;
                        print_lines(&mut stdout, &last_reply.lines)?;
                    }
                    Err(SessionError::Cancelled { .. }) => {
                        status(&mut stdout, &theme, "Stopped waiting; the thread is still usable")?;
                    }
                    Err(e) => error(&mut stdout, &theme, &e.to_string())?,
                }
            }
        }
    }
    Ok(())
}

/// One listener for the whole session; each Ctrl-C becomes one message
fn listen_for_interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {e}");
                break;
            }
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Drive `submit` to the end, cancelling it on the first interrupt
async fn until_interrupted<T>(
    submit: impl Future<Output = T>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
    cancel: &CancellationToken,
) -> T {
    tokio::pin!(submit);
    tokio::select! {
        result = &mut submit => return result,
        Some(()) = interrupts.recv() => cancel.cancel(),
    }
    submit.await
}

/// Print a status line whenever a job changes state while we wait
async fn show_progress(mut events: broadcast::Receiver<SessionEvent>, theme: Theme) {
    let mut last: Option<JobStatus> = None;
    loop {
        match events.recv().await {
            Ok(SessionEvent::JobStarted { .. }) => last = None,
            Ok(SessionEvent::JobPolled {
                attempt, status: job_status, ..
            }) => {
                if last != Some(job_status) && attempt > 1 {
                    let _ = status(&mut io::stdout(), &theme, &format!("  job {job_status}"));
                }
                last = Some(job_status);
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn open_image(out: &mut impl Write, theme: &Theme, reply: &RenderedReply, n: usize) -> Result<()> {
    let Some(image) = n.checked_sub(1).and_then(|i| reply.images.get(i)) else {
        error(out, theme, &format!("No image {n} in the last reply"))?;
        return Ok(());
    };

    if let Err(e) = open::that(&image.url) {
        tracing::warn!("Failed to open {}: {e}", image.url);
        match reply.fallback.as_deref().map(open::that) {
            Some(Ok(())) => {}
            _ => error(out, theme, &format!("Could not open {}", image.url))?,
        }
        return Ok(());
    }
    status(out, theme, &format!("Opened {}", image.title))?;
    Ok(())
}

fn print_prompt(out: &mut impl Write, theme: &Theme) -> io::Result<()> {
    let style = Style::default()
        .fg(theme.user_msg_color)
        .add_modifier(Modifier::BOLD);
    writeln!(out)?;
    print_inline(out, &Line::from(Span::styled("you › ", style)))
}

fn status(out: &mut impl Write, theme: &Theme, message: &str) -> io::Result<()> {
    let line = Line::from(Span::styled(
        message.to_string(),
        Style::default()
            .fg(theme.dim_color)
            .add_modifier(Modifier::ITALIC),
    ));
    print_lines(out, &[line])
}

fn error(out: &mut impl Write, theme: &Theme, message: &str) -> io::Result<()> {
    let line = Line::from(Span::styled(
        format!("Error: {message}"),
        Style::default().fg(theme.error_color),
    ));
    print_lines(out, &[line])
}

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(DEFAULT_WIDTH)
}
