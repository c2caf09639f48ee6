//! Interactive chat loop on stdin/stdout.

use std::io::Write;
use std::sync::Arc;

use crossterm::style::{style, Stylize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::chat::{ChatSession, Notification, Notifier, SendOutcome};
use crate::error::Result;
use crate::ui::{validate_input, Renderer};

/// Prints notifications to stderr.
#[derive(Debug, Clone, Copy)]
pub struct StderrNotifier {
    pub color: bool,
}

impl Notifier for StderrNotifier {
    fn notify(&self, notification: &Notification) {
        let line = format!("{}: {}", notification.title, notification.description);
        if self.color {
            eprintln!("{}", style(line).red());
        } else {
            eprintln!("{line}");
        }
    }
}

/// Run the chat until EOF or `/quit`.
///
/// Sends run in the background; input typed while a reply is pending is
/// refused, mirroring a disabled input box.
pub async fn run_repl(session: Arc<ChatSession>, renderer: Renderer) -> Result<()> {
    print!("{}", renderer.render_conversation(&session.snapshot()?));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut inflight: Option<JoinHandle<()>> = None;

    loop {
        print!("{}", renderer.render_prompt(session.status()));
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                print!("{}", renderer.render_conversation(&session.snapshot()?));
                continue;
            }
            _ => {}
        }

        if session.is_busy() {
            eprintln!("Aguarde a resposta anterior.");
            continue;
        }
        let text = match validate_input(&line, session.settings().max_input_chars) {
            Ok(text) => text,
            Err(error) => {
                eprintln!("{error}");
                continue;
            }
        };

        print!("{}", renderer.render_typing_indicator(true));
        let task_session = Arc::clone(&session);
        inflight = Some(tokio::spawn(async move {
            match task_session.send(&text).await {
                Ok(SendOutcome::Busy) => eprintln!("Aguarde a resposta anterior."),
                Ok(outcome) => {
                    if let Some(message) = outcome.message() {
                        print!("\n{}", renderer.render_message(message));
                        print!("{}", renderer.render_prompt(task_session.status()));
                        let _ = std::io::stdout().flush();
                    }
                }
                Err(error) => eprintln!("{error}"),
            }
        }));
    }

    if let Some(task) = inflight.take() {
        let _ = task.await;
    }
    session.shutdown().await
}

/// Send once and print the reply.
pub async fn run_once(session: &ChatSession, renderer: Renderer, message: &str) -> Result<()> {
    let outcome = session.send(message).await?;
    if let Some(reply) = outcome.message() {
        print!("{}", renderer.render_message(reply));
    }
    session.shutdown().await
}
