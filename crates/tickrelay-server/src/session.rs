//! The per-connection session: a reader pump and a writer pump.
//!
//! ```text
//!            +-------------------- CloseGate ---------------------+
//!            |                                                    |
//! viewer --> reader pump (pong / close / deadline detection)      |
//! viewer <-- writer pump <-- update tick --> UpdatePoller::poll   |
//!                        <-- ping tick                            |
//! ```
//!
//! The reader never interprets application messages. It exists to notice
//! that the peer went away: a close frame, a read error, or no keepalive
//! response within `pong_wait`. Each pong pushes the read deadline out by
//! another `pong_wait`.
//!
//! The writer owns two periodic timers. When both are due in the same
//! instant the update is sent before the ping. Every frame is sent under
//! a `write_wait` deadline and any failed or late send ends the session.
//! A send still in flight when the gate closes is abandoned.
//!
//! Whichever pump stops first closes the [`CloseGate`]; the other pump is
//! waiting on the gate next to its own I/O and stops too.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tickrelay_core::{SessionState, SessionTimings, UpdatePoller};
use tickrelay_log::StreamLog;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::gate::CloseGate;

/// Why a pump stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpExit {
    /// The other pump closed the session first.
    Closed,
    /// The viewer sent a close frame or the connection ended.
    PeerClosed,
    /// No keepalive response arrived within `pong_wait`.
    ReadTimeout,
    /// Reading from the connection failed.
    ReadError(String),
    /// A frame could not be sent.
    WriteError(String),
    /// A frame was not sent within `write_wait`.
    WriteTimeout,
}

/// How both pumps of a finished session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Exit of the reader pump.
    pub reader: PumpExit,
    /// Exit of the writer pump.
    pub writer: PumpExit,
}

fn deadline_after(wait: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(wait).unwrap_or(now)
}

/// Run the inbound liveness pump until the peer goes away or the gate
/// closes. Closes the gate on the way out.
pub async fn run_reader<S, E>(mut stream: S, gate: &CloseGate, timings: SessionTimings) -> PumpExit
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = deadline_after(timings.pong_wait());
    let exit = loop {
        tokio::select! {
            () = gate.closed() => break PumpExit::Closed,
            next = tokio::time::timeout_at(deadline, stream.next()) => match next {
                Err(_elapsed) => break PumpExit::ReadTimeout,
                Ok(None | Some(Ok(Message::Close(_)))) => break PumpExit::PeerClosed,
                Ok(Some(Err(e))) => break PumpExit::ReadError(e.to_string()),
                Ok(Some(Ok(Message::Pong(_)))) => {
                    deadline = deadline_after(timings.pong_wait());
                }
                // Application messages are ignored.
                Ok(Some(Ok(_))) => {}
            }
        }
    };
    gate.close();
    exit
}

async fn send_frame<W>(
    sink: &mut W,
    frame: Message,
    gate: &CloseGate,
    write_wait: Duration,
) -> Result<(), PumpExit>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    tokio::select! {
        biased;
        () = gate.closed() => Err(PumpExit::Closed),
        sent = tokio::time::timeout(write_wait, sink.send(frame)) => match sent {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PumpExit::WriteError(e.to_string())),
            Err(_elapsed) => Err(PumpExit::WriteTimeout),
        },
    }
}

/// Run the outbound pump until a send fails or the gate closes. Closes
/// the gate on the way out. After a failed send the sink is closed too;
/// when the other pump stopped first the connection is already gone and
/// the sink is only dropped.
///
/// The first update is sent one `file_period` after start and the first
/// ping one `ping_period` after start.
pub async fn run_writer<W, L>(
    mut sink: W,
    poller: &UpdatePoller<L>,
    session: &mut SessionState,
    gate: &CloseGate,
    timings: SessionTimings,
) -> PumpExit
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
    L: StreamLog,
{
    let start = Instant::now();
    let mut updates = tokio::time::interval_at(
        start.checked_add(timings.file_period()).unwrap_or(start),
        timings.file_period(),
    );
    updates.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pings = tokio::time::interval_at(
        start.checked_add(timings.ping_period()).unwrap_or(start),
        timings.ping_period(),
    );
    pings.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let exit = loop {
        tokio::select! {
            biased;

            () = gate.closed() => break PumpExit::Closed,

            _ = updates.tick() => {
                let result = tokio::select! {
                    biased;
                    () = gate.closed() => {
                        // Entries this poll already removed are not delivered.
                        debug!("Poll abandoned on session close");
                        break PumpExit::Closed;
                    }
                    result = poller.poll() => result,
                };
                if let Some(payload) = session.observe(result) {
                    let frame = Message::Text(payload.into());
                    if let Err(exit) = send_frame(&mut sink, frame, gate, timings.write_wait()).await {
                        break exit;
                    }
                }
            }

            _ = pings.tick() => {
                let frame = Message::Ping(Bytes::new());
                if let Err(exit) = send_frame(&mut sink, frame, gate, timings.write_wait()).await {
                    break exit;
                }
            }
        }
    };

    gate.close();
    if matches!(exit, PumpExit::WriteError(_)) {
        // Best effort: tell the viewer we are going away.
        let _ = tokio::time::timeout(timings.write_wait(), sink.close()).await;
    }
    exit
}

/// Drive one upgraded connection from open to closed.
///
/// The writer runs on its own task; the reader runs on the caller's.
pub async fn handle_session<L>(
    socket: WebSocket,
    poller: UpdatePoller<L>,
    timings: SessionTimings,
    last_mod: Option<String>,
) -> SessionOutcome
where
    L: StreamLog + 'static,
{
    let id = Uuid::new_v4();
    let mut session = SessionState::new(last_mod.as_deref());
    debug!(session = %id, last_known = %session.last_known(), "Session open");

    let (sink, stream) = socket.split();
    let gate = Arc::new(CloseGate::new());

    let writer = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            run_writer(sink, &poller, &mut session, &gate, timings).await
        })
    };
    let reader = run_reader(stream, &gate, timings).await;
    let writer = writer.await.unwrap_or_else(|e| {
        warn!(session = %id, error = %e, "Writer task failed");
        gate.close();
        PumpExit::WriteError(e.to_string())
    });

    debug!(session = %id, reader = ?reader, writer = ?writer, "Session closed");
    SessionOutcome { reader, writer }
}
