//! Stdio runtime bridge.
//!
//! Connects the client to a native conferencing runtime running as a
//! separate process: runtime events arrive as newline-delimited JSON on one
//! stream, commands leave as newline-delimited JSON on another.
//!
//! ```text
//! {"event":"attendee_join","attendee_id":"a1","external_user_id":"p#Alice"}
//! {"command":"set_muted","muted":true}
//! ```

use crate::commands::RuntimeCommand;
use crate::events::RuntimeEvent;
use std::io::BufRead;
use std::thread;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Read runtime events from `reader` and forward them to `events`.
///
/// Blocking: run it on a dedicated thread (see [`spawn_event_reader`]),
/// never on the async runtime. Blank lines are skipped; lines that do not
/// parse are logged and skipped. Stops at end of input, when cancelled, or
/// when the receiving side is gone. Returns the number of events forwarded.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub fn read_events<R>(
    reader: R,
    events: &mpsc::Sender<RuntimeEvent>,
    cancel_token: &CancellationToken,
) -> std::io::Result<u64>
where
    R: BufRead,
{
    let mut forwarded: u64 = 0;

    for line in reader.lines() {
        if cancel_token.is_cancelled() {
            debug!(target: "mc_client.bridge", "Event reader cancelled");
            return Ok(forwarded);
        }

        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: RuntimeEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(target: "mc_client.bridge", error = %e, "Skipping malformed runtime event");
                continue;
            }
        };

        if events.blocking_send(event).is_err() {
            debug!(target: "mc_client.bridge", "Event pump gone, stopping reader");
            return Ok(forwarded);
        }
        forwarded += 1;
    }

    info!(target: "mc_client.bridge", forwarded, "Runtime event stream closed");
    Ok(forwarded)
}

/// Run [`read_events`] on its own OS thread.
///
/// The thread is not owned by the async runtime, so shutting the runtime
/// down never waits for a read that may not return (e.g. an open stdin).
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_event_reader<R>(
    reader: R,
    events: mpsc::Sender<RuntimeEvent>,
    cancel_token: CancellationToken,
) -> std::io::Result<thread::JoinHandle<std::io::Result<u64>>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("mc-client-events".to_string())
        .spawn(move || {
            let result = read_events(reader, &events, &cancel_token);
            if let Err(e) = &result {
                warn!(target: "mc_client.bridge", error = %e, "Reading runtime events failed");
            }
            result
        })
}

/// Write commands from `commands` to `writer`, one JSON object per line.
///
/// Runs until every command sender is dropped. Returns the number of
/// commands written.
///
/// # Errors
///
/// Returns the underlying I/O error if writing fails.
pub async fn write_commands<W>(
    mut writer: W,
    mut commands: mpsc::UnboundedReceiver<RuntimeCommand>,
) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written: u64 = 0;

    while let Some(command) = commands.recv().await {
        let mut line = serde_json::to_vec(&command).map_err(std::io::Error::other)?;
        line.push(b'\n');

        writer.write_all(&line).await?;
        writer.flush().await?;

        debug!(target: "mc_client.bridge", command = command.name(), "Command written");
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::{ChannelCommandSink, CommandSink};
    use crate::events::VideoTile;
    use std::time::{Duration, Instant};

    /// Input that delivers chunks as they are sent and only ends when the
    /// sending side is dropped.
    struct PipeInput {
        chunks: std::sync::mpsc::Receiver<Vec<u8>>,
        pending: std::io::Cursor<Vec<u8>>,
    }

    impl std::io::Read for PipeInput {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                let n = std::io::Read::read(&mut self.pending, buf)?;
                if n > 0 {
                    return Ok(n);
                }
                match self.chunks.recv() {
                    Ok(chunk) => self.pending = std::io::Cursor::new(chunk),
                    Err(_) => return Ok(0),
                }
            }
        }
    }

    fn pipe() -> (std::sync::mpsc::Sender<Vec<u8>>, std::io::BufReader<PipeInput>) {
        let (tx, chunks) = std::sync::mpsc::channel();
        let input = PipeInput {
            chunks,
            pending: std::io::Cursor::new(Vec::new()),
        };
        (tx, std::io::BufReader::new(input))
    }

    #[test]
    fn test_read_events_skips_blank_and_malformed_lines() {
        let input = concat!(
            "{\"event\":\"attendee_join\",\"attendee_id\":\"a1\",\"external_user_id\":\"p#Alice\"}\n",
            "\n",
            "not json\n",
            "{\"event\":\"video_tile_add\",\"tile_id\":5,\"is_screen_share\":true}\n",
            "{\"event\":\"meeting_end\"}\n",
        );
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = read_events(input.as_bytes(), &tx, &CancellationToken::new()).unwrap();
        drop(tx);

        assert_eq!(forwarded, 3);
        assert_eq!(
            rx.blocking_recv().unwrap(),
            RuntimeEvent::attendee_join("a1", "p#Alice")
        );
        assert_eq!(
            rx.blocking_recv().unwrap(),
            RuntimeEvent::VideoTileAdd(VideoTile::screen_share(5))
        );
        assert_eq!(rx.blocking_recv().unwrap(), RuntimeEvent::MeetingEnd);
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn test_read_events_stops_when_pump_is_gone() {
        let input = "{\"event\":\"meeting_start\"}\n{\"event\":\"meeting_end\"}\n";
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let forwarded = read_events(input.as_bytes(), &tx, &CancellationToken::new()).unwrap();
        assert_eq!(forwarded, 0);
    }

    #[test]
    fn test_read_events_honours_cancellation() {
        let input = "{\"event\":\"meeting_start\"}\n";
        let (tx, _rx) = mpsc::channel(8);
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();

        let forwarded = read_events(input.as_bytes(), &tx, &cancel_token).unwrap();
        assert_eq!(forwarded, 0);
    }

    #[test]
    fn test_runtime_shuts_down_while_reader_is_blocked() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let (input, reader) = pipe();
        let cancel_token = CancellationToken::new();

        let handle = runtime.block_on(async {
            let (tx, mut rx) = mpsc::channel(8);
            let handle = spawn_event_reader(reader, tx, cancel_token.clone()).unwrap();

            input.send(b"{\"event\":\"meeting_start\"}\n".to_vec()).unwrap();
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap();
            assert_eq!(event, Some(RuntimeEvent::MeetingStart));

            cancel_token.cancel();
            handle
        });

        // The reader is still parked on input that has not arrived
        let started = Instant::now();
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!handle.is_finished());

        // Input closing ends the thread
        drop(input);
        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_write_commands_as_json_lines() {
        let (sink, rx) = ChannelCommandSink::new();
        sink.set_muted(true);
        sink.leave();
        drop(sink);

        let mut output = Vec::new();
        let written = write_commands(&mut output, rx).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "{\"command\":\"set_muted\",\"muted\":true}\n{\"command\":\"leave\"}\n"
        );
    }
}
