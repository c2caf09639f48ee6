//! relay-chat CLI binary entry point.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relay_chat::chat::ChatSession;
use relay_chat::cli::repl::{run_once, run_repl, StderrNotifier};
use relay_chat::cli::{Cli, Commands};
use relay_chat::config::ChatConfig;
use relay_chat::error::RelayError;
use relay_chat::store::{ConversationStore, FileKeyValueStore, KeyValueStore};
use relay_chat::ui::Renderer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", format_error_help(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RelayError> {
    let mut config = ChatConfig::load(cli.overrides.config.as_deref())?;
    cli.overrides.apply(&mut config);
    config.validate()?;

    let renderer = Renderer {
        color: !cli.overrides.no_color,
        ..Renderer::default()
    };
    let backend: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(config.history_dir()));

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::History => {
            let store = ConversationStore::open(backend, config.storage_key.clone(), config.greeting.clone());
            print!("{}", renderer.render_conversation(&store.snapshot()));
            Ok(())
        }
        Commands::Send(args) => {
            let session = ChatSession::from_config(&config, backend)
                .await?
                .with_notifier(Arc::new(StderrNotifier { color: renderer.color }));
            run_once(&session, renderer, &args.message).await
        }
        Commands::Chat => {
            let session = ChatSession::from_config(&config, backend)
                .await?
                .with_notifier(Arc::new(StderrNotifier { color: renderer.color }));
            run_repl(Arc::new(session), renderer).await
        }
    }
}

/// Map a [`RelayError`] to a user-facing hint.
fn format_error_help(err: &RelayError) -> String {
    match err {
        RelayError::Configuration(msg) => {
            format!("{msg}. Check ~/.relay-chat/config.toml, your .env, or the command-line flags")
        }
        RelayError::PushDisconnected(_) | RelayError::Io(_) => {
            format!("{err}. Is the push endpoint reachable? Try --strategy direct or poll")
        }
        other => format!("{other}"),
    }
}
