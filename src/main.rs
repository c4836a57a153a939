//! Console demo binary: a small REPL driving the game engine locally.

use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use race_to_hundred::{
    chat::{ChannelId, ChatClient, Participant, console::ConsoleChat},
    config::{AppConfig, GameMode},
    dice::ThreadDice,
    error::ServiceError,
    services::{announce, registry::GameRegistry},
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let chat = ConsoleChat::new();
    let registry = GameRegistry::new(
        Arc::clone(&chat) as Arc<dyn ChatClient>,
        Arc::new(ThreadDice),
        config,
    );
    let channel = ChannelId(Uuid::new_v4());

    println!("race to 100, console edition");
    println!("commands: /start [classic|unlimited|ultimate], /pause, /continue, /abort, /rules, /quit");
    println!("plain lines are chat messages; prefix with 'name: ' to impersonate; 'join' reacts to the latest prompt");

    tokio::select! {
        _ = shutdown_signal() => info!("shutting down"),
        result = repl(chat, registry, channel) => result?,
    }
    Ok(())
}

async fn repl(
    chat: Arc<ConsoleChat>,
    registry: Arc<GameRegistry>,
    channel: ChannelId,
) -> Result<()> {
    let mut users: HashMap<String, Participant> = HashMap::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            let mut words = command.split_whitespace();
            match words.next().unwrap_or_default() {
                "start" => {
                    let mode = match words.next() {
                        Some(word) => match word.parse::<GameMode>() {
                            Ok(mode) => mode,
                            Err(err) => {
                                report(Err(err));
                                continue;
                            }
                        },
                        None => GameMode::Classic,
                    };
                    let starter = user(&mut users, "you");
                    report(registry.start(channel, starter, mode).map(|_| ()));
                }
                "pause" => report(registry.pause(channel).await),
                "continue" | "resume" => report(registry.resume(channel).await),
                "abort" | "stop" => report(registry.abort(channel).await),
                "rules" => {
                    if let Err(err) = chat.send_message(channel, announce::rules()).await {
                        println!("⚠️  {err}");
                    }
                }
                "quit" | "exit" => break,
                other => println!("unknown command: /{other}"),
            }
            continue;
        }

        let (name, text) = match line.split_once(": ") {
            Some((name, text)) if !name.is_empty() && !text.is_empty() => (name, text),
            _ => ("you", line),
        };
        let author = user(&mut users, name);
        if text.eq_ignore_ascii_case("join") {
            chat.post_join(author);
        } else {
            chat.post_message(author, text);
        }
    }
    Ok(())
}

fn user(users: &mut HashMap<String, Participant>, name: &str) -> Participant {
    users
        .entry(name.to_string())
        .or_insert_with(|| Participant {
            id: Uuid::new_v4(),
            name: name.to_string(),
        })
        .clone()
}

fn report(result: Result<(), ServiceError>) {
    if let Err(err) = result {
        println!("⚠️  {err}");
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("race_to_hundred=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install the Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install the SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
