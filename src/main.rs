//! Chat tail: connect to a channel's chat anonymously and print messages.
//!
//! Exercises the full runtime path end to end: transport, session
//! registry, presence, emote resolution, and the bounded log.

use std::sync::Arc;

use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lantern::adapters::{IrcLogin, IrcWsTransport};
use lantern::chat::ChatEvent;
use lantern::models::{ChannelHandle, ChatEntry};
use lantern::presence::PresenterRole;
use lantern::runtime::{CoreConfig, CoreServices};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("lantern {}", VERSION);
        std::process::exit(0);
    }

    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lantern=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(login) = args.first() else {
        eprintln!("Usage: lantern <channel-login> [channel-id]");
        eprintln!();
        eprintln!("The numeric channel id enables channel-specific emotes; without");
        eprintln!("it only global emotes resolve.");
        std::process::exit(2);
    };
    let login = login.trim_start_matches('#').to_lowercase();
    let channel_id = args.get(1).cloned().unwrap_or_else(|| login.clone());

    let channel = ChannelHandle::new(channel_id, login.clone());

    let services = CoreServices::new(
        CoreConfig::default(),
        Arc::new(IrcWsTransport::new(IrcLogin::Anonymous)),
    );

    services.prefetch_global_emotes().await;

    let (session, token) = services.chat().attach(&channel, PresenterRole::Standalone);
    let mut events = session.subscribe();

    println!("Tailing #{} (Ctrl+C to quit)", login);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(ChatEvent::Appended(ChatEntry::Message(msg))) => {
                        let when = msg.sent_at.format("%H:%M:%S");
                        match &msg.color {
                            Some(color) => println!("[{}] {} ({}): {}", when, msg.author, color, msg.text),
                            None => println!("[{}] {}: {}", when, msg.author, msg.text),
                        }
                    }
                    Ok(ChatEvent::Appended(ChatEntry::Divider(at))) => {
                        println!("──── disconnected at {} ────", at.format("%H:%M:%S"));
                    }
                    Ok(ChatEvent::Pruned { removed }) => {
                        tracing::debug!(removed, "scrollback pruned");
                    }
                    Ok(ChatEvent::Disconnected) => {
                        tracing::info!("chat connection closed");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event consumer lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    services.chat().detach(&channel.id, token);
    services.shutdown();
    Ok(())
}
