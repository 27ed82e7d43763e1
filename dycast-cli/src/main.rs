//! dycast CLI: capture a Douyin live room's danmaku to the terminal, an
//! optional relay endpoint, and a JSON export written on exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use dycast::douyin::{DouyinProtocol, is_valid_room_num};
use dycast::{
    CastConfig, CastEvent, CastMethod, CloseCode, DedupLedger, DyCast, LiveInfo, Message,
    RelayCast, RelayEvent, RetryPolicy, verify_ws_url,
};

#[derive(Parser, Debug)]
#[command(name = "dycast", version, about = "Douyin live danmaku capture")]
struct Args {
    /// Room number (the web rid from the live room URL)
    room: String,

    /// Relay captured messages to this WebSocket endpoint as JSON
    #[arg(long)]
    relay: Option<String>,

    /// Directory for the JSON export written on exit
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// Extra cookies for the webcast APIs
    #[arg(long, env = "DYCAST_COOKIES")]
    cookies: Option<String>,

    /// Reconnection attempts after an abnormal closure
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}

async fn run(args: Args) -> Result<()> {
    if !is_valid_room_num(&args.room) {
        bail!("{:?} does not look like a room number", args.room);
    }

    let protocol = match &args.cookies {
        Some(cookies) => DouyinProtocol::with_cookies(cookies.clone()),
        None => DouyinProtocol::new(),
    };
    let config = CastConfig {
        retry: RetryPolicy {
            max_attempts: args.max_retries,
            ..Default::default()
        },
        ..Default::default()
    };
    let cast = Arc::new(DyCast::with_protocol(args.room.clone(), protocol, config));

    // The relay intro must be sent exactly once, from whichever side opens
    // last: the relay link or the primary session.
    let intro_sent = Arc::new(AtomicBool::new(false));

    let relay = match &args.relay {
        Some(url) => {
            verify_ws_url(url)?;
            let relay = Arc::new(RelayCast::new(url.clone()));
            let mut relay_events = relay.connect();
            let relay_for_events = Arc::clone(&relay);
            let cast_for_events = Arc::clone(&cast);
            let intro_sent = Arc::clone(&intro_sent);
            tokio::spawn(async move {
                while let Some(event) = relay_events.recv().await {
                    match event {
                        RelayEvent::Open => {
                            info!("relay connected");
                            // Relay opened after the primary session did.
                            if let Some(info) = cast_for_events.get_live_info() {
                                send_intro(&relay_for_events, &info, &intro_sent);
                            }
                        }
                        RelayEvent::Error(e) => warn!("relay error: {e}"),
                        RelayEvent::Close { code, reason } => {
                            warn!("relay closed ({code}): {}", reason.unwrap_or_default());
                        }
                    }
                }
            });
            Some(relay)
        }
        None => None,
    };

    let mut events = cast.connect();
    info!("connecting to room {}", args.room);

    let mut ledger = DedupLedger::new();
    let mut captured: Vec<Message> = Vec::new();
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                handle_event(
                    event,
                    &mut ledger,
                    &mut captured,
                    relay.as_deref(),
                    &intro_sent,
                );
            }
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                info!("interrupt received, closing");
                cast.close(CloseCode::Normal, Some("user interrupt")).await;
                // Keep draining until the terminal close arrives.
            }
        }
    }

    if let Some(relay) = &relay {
        relay.close(1000, Some("capture ended")).await;
        // Give the close frame a moment to flush.
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    if !captured.is_empty() {
        let path = export_path(&args.output, &args.room, captured.len());
        let json = serde_json::to_string_pretty(&captured)?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing export to {}", path.display()))?;
        info!("exported {} messages to {}", captured.len(), path.display());
    }

    Ok(())
}

fn export_path(dir: &Path, room: &str, count: usize) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H%M%S");
    dir.join(format!("[{room}]{stamp}({count}).json"))
}

/// Send the room's metadata as the relay's introduction frame, at most once
/// per capture.
fn send_intro(relay: &RelayCast, info: &LiveInfo, sent: &AtomicBool) {
    if sent.swap(true, Ordering::SeqCst) {
        return;
    }
    if let Ok(intro) = serde_json::to_string(info) {
        relay.send(intro);
    }
}

fn handle_event(
    event: CastEvent,
    ledger: &mut DedupLedger,
    captured: &mut Vec<Message>,
    relay: Option<&RelayCast>,
    intro_sent: &AtomicBool,
) {
    match event {
        CastEvent::Open { info } => {
            // Console notices are displayed but never persisted or relayed.
            display(&Message::custom(
                format!("connected to {} | {}", info.nickname, info.title),
                "console",
            ));
            // Relay already open: introduce the room now. Otherwise the
            // relay's own open handler sends the intro.
            if let Some(relay) = relay
                && relay.is_connected()
            {
                send_intro(relay, &info, intro_sent);
            }
        }
        CastEvent::Reconnect { info } => {
            display(&Message::custom(
                format!("reconnected to {}", info.title),
                "console",
            ));
        }
        CastEvent::Message(batch) => {
            let fresh: Vec<Message> = batch
                .into_iter()
                .filter(|msg| ledger.insert(&msg.id))
                .collect();
            if fresh.is_empty() {
                return;
            }

            if let Some(relay) = relay
                && relay.is_connected()
                && let Ok(json) = serde_json::to_string(&fresh)
            {
                relay.send(json);
            }

            for msg in fresh {
                display(&msg);
                captured.push(msg);
            }
        }
        CastEvent::Error(e) => warn!("{e}"),
        CastEvent::Reconnecting {
            attempt,
            code,
            reason,
        } => {
            warn!(
                "connection lost ({:?}: {}), reconnect attempt {attempt}",
                code,
                reason.unwrap_or_default()
            );
            display(&Message::custom(
                format!("reconnecting (attempt {attempt})"),
                "console",
            ));
        }
        CastEvent::Close { code, reason } => {
            let reason = reason.unwrap_or_default();
            info!("closed ({code:?}): {reason}");
            display(&Message::custom(
                format!("closed ({}): {reason}", code.as_u16()),
                "console",
            ));
        }
    }
}

fn display(msg: &Message) {
    let who = msg.user.as_ref().map(|u| u.name.as_str()).unwrap_or("?");
    match msg.method {
        CastMethod::Chat | CastMethod::EmojiChat => {
            println!("{who}: {}", msg.content.as_deref().unwrap_or(""));
        }
        CastMethod::Gift => {
            if let Some(gift) = &msg.gift {
                // Combo frames only; the repeat-end summary frame would
                // double-count the combo.
                if !gift.repeat_end {
                    println!("{who} 送出 {} x{}", gift.name, gift.count);
                }
            }
        }
        CastMethod::Like => debug!("{who} liked the stream"),
        CastMethod::Member => info!("{who} entered the room"),
        CastMethod::Social => info!("{who} followed the host"),
        CastMethod::RoomUserSeq | CastMethod::RoomStats => {
            if let Some(room) = &msg.room {
                debug!(
                    "audience {:?}, likes {:?}, total {:?}",
                    room.audience_count, room.like_count, room.total_user_count
                );
            }
        }
        CastMethod::Control => {
            info!("room control: {}", msg.content.as_deref().unwrap_or(""));
        }
        CastMethod::Custom => {
            println!("* {}", msg.content.as_deref().unwrap_or(""));
        }
    }
}
