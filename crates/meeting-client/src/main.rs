//! Meeting Client
//!
//! Stdio bridge between a native conferencing runtime and the meeting
//! client. Runtime events are read from stdin and commands are written to
//! stdout, both as newline-delimited JSON. Logs go to stderr.
//!
//! ```text
//! meeting-client <meeting-name> <user-name>
//! ```
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing
//! 3. Start the event pump, stdin reader thread and stdout writer
//! 4. Build the client and join the meeting
//! 5. Log snapshot changes until the meeting ends, stdin closes, or a
//!    shutdown signal arrives

#![warn(clippy::pedantic)]

use anyhow::{bail, Context};
use meeting_client::alerts::TracingAlertSink;
use meeting_client::bridge::{spawn_event_reader, write_commands};
use meeting_client::channel::{spawn_event_pump, EventChannel};
use meeting_client::client::{MeetingClient, MeetingPhase};
use meeting_client::commands::ChannelCommandSink;
use meeting_client::config::Config;
use meeting_client::observability::init_tracing;
use meeting_client::services::HttpJoinClient;
use meeting_client::store::MeetingSnapshot;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.observability).context("Failed to initialize tracing")?;

    info!(
        target: "mc_client.bridge",
        api_url = %config.api_url,
        region = %config.region,
        http_timeout_seconds = config.http_timeout.as_secs(),
        event_buffer = config.event_buffer,
        "Configuration loaded successfully"
    );

    let mut args = std::env::args().skip(1);
    let (Some(meeting_name), Some(user_name)) = (args.next(), args.next()) else {
        bail!("usage: meeting-client <meeting-name> <user-name>");
    };

    let cancel_token = CancellationToken::new();

    // Runtime -> client
    let channel = EventChannel::new();
    let (event_tx, event_rx) = mpsc::channel(config.event_buffer);
    let mut pump = spawn_event_pump(channel.clone(), event_rx, cancel_token.child_token());
    // Stdin is read on its own thread: the runtime must not wait for a read
    // that only returns when the native runtime writes or closes the pipe.
    spawn_event_reader(
        std::io::BufReader::new(std::io::stdin()),
        event_tx,
        cancel_token.child_token(),
    )
    .context("Failed to start runtime event reader")?;

    // Client -> runtime
    let (commands, command_rx) = ChannelCommandSink::new();
    let writer = tokio::spawn(write_commands(tokio::io::stdout(), command_rx));

    let credentials = HttpJoinClient::from_config(&config)?;
    let client = MeetingClient::new(
        Arc::new(channel),
        Arc::new(credentials),
        Arc::new(commands),
        Arc::new(TracingAlertSink),
    )?;

    let mut snapshots = client.subscribe();
    let mut phase = client.subscribe_phase();

    let joined = client.join(&meeting_name, &user_name).await;
    let mut pump_finished = false;

    if joined.is_ok() {
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(target: "mc_client.bridge", "Shutdown signal received, leaving meeting");
                    client.hang_up();
                    break;
                }

                changed = snapshots.changed() => {
                    match changed {
                        Ok(snapshot) => log_snapshot(&snapshot),
                        Err(_) => break,
                    }
                }

                changed = phase.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *phase.borrow_and_update();
                    info!(target: "mc_client.bridge", phase = ?current, "Meeting phase changed");
                    if current == MeetingPhase::NotInMeeting {
                        break;
                    }
                }

                _ = &mut pump, if !pump_finished => {
                    pump_finished = true;
                    warn!(target: "mc_client.bridge", "Runtime event stream ended");
                    break;
                }
            }
        }
    }

    client.teardown();
    drop(client);
    cancel_token.cancel();

    if !pump_finished {
        if let Err(e) = pump.await {
            error!(target: "mc_client.bridge", error = %e, "Event pump task failed");
        }
    }

    match writer.await {
        Ok(Ok(written)) => debug!(target: "mc_client.bridge", written, "Command writer finished"),
        Ok(Err(e)) => error!(target: "mc_client.bridge", error = %e, "Command writer failed"),
        Err(e) => error!(target: "mc_client.bridge", error = %e, "Command writer task failed"),
    }

    if let Err(e) = joined {
        bail!("Failed to join meeting: {e}");
    }

    info!(target: "mc_client.bridge", "Meeting client shutdown complete");
    Ok(())
}

fn log_snapshot(snapshot: &MeetingSnapshot) {
    info!(
        target: "mc_client.bridge",
        meeting = snapshot.meeting_title().unwrap_or_default(),
        roster = snapshot.roster().len(),
        muted = snapshot.muted().len(),
        video_tiles = snapshot.video_tiles().len(),
        screen_share = ?snapshot.screen_share(),
        self_muted = snapshot.is_self_muted(),
        self_video = snapshot.has_self_video(),
        "Meeting snapshot updated"
    );

    for row in snapshot.attendees() {
        debug!(
            target: "mc_client.bridge",
            attendee_id = %row.id,
            name = %row.name,
            muted = row.muted,
            "Attendee"
        );
    }
}

/// Wait for Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed, that signal is never reported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(target: "mc_client.bridge", error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(target: "mc_client.bridge", error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
