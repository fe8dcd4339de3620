//! Tokio driver for an [`ArqConnection`].
//!
//! [`ArqChannel::spawn`] moves the connection into its own task. That task is
//! the only code touching ARQ state; the application talks to it through the
//! returned [`ArqHandle`]:
//!
//! ```text
//!   ArqHandle ──commands──▶ ┌──────────────┐ ──datagrams──▶ Transport
//!             ◀─payloads─── │  driver task │ ◀─datagrams─── (reader task)
//!             ◀─stats────── └──────────────┘
//! ```
//!
//! Timers are `sleep_until` on the connection's earliest deadline, so the
//! driver honours paused tokio time in tests.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::arq::{
    ArqConfig, ArqConnection, ArqStats, Completion, WriteHandle, Writability, completion,
};
use crate::core::{ArqError, ConfigError};

use super::link::Transport;

/// Requests from the handle to the driver task.
#[derive(Debug)]
enum Command {
    Write { payload: Bytes, completion: Completion },
    Passthrough(Bytes),
    Close,
}

/// Current time on the tokio clock.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Sleep until `deadline`, or forever without one.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Spawns ARQ connections onto the tokio runtime.
#[derive(Debug)]
pub struct ArqChannel;

impl ArqChannel {
    /// Start a connection over `transport`.
    ///
    /// The connection is active immediately. It ends when the handle closes
    /// it or is dropped, when the transport fails, or when the retransmission
    /// cap is reached.
    pub fn spawn<T: Transport>(transport: T, config: ArqConfig) -> Result<ArqHandle, ConfigError> {
        let connection = ArqConnection::new(&config, now())?;
        let writability = connection.writability().clone();
        let transport = Arc::new(transport);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let (delivered_tx, delivered_rx) = mpsc::unbounded_channel();
        let (passthrough_tx, passthrough_rx) = mpsc::unbounded_channel();
        let (stats_tx, stats_rx) = watch::channel(ArqStats::default());

        let reader = tokio::spawn({
            let transport = Arc::clone(&transport);
            async move {
                loop {
                    let result = transport.recv().await;
                    let failed = result.is_err();
                    if inbound_tx.send(result).await.is_err() || failed {
                        break;
                    }
                }
            }
        });

        let driver = Driver {
            connection,
            transport,
            commands: command_rx,
            inbound: inbound_rx,
            delivered: delivered_tx,
            passthrough: passthrough_tx,
            stats: stats_tx,
        };
        let task = tokio::spawn(async move {
            driver.run().await;
            reader.abort();
        });

        Ok(ArqHandle {
            commands: command_tx,
            delivered: delivered_rx,
            passthrough: passthrough_rx,
            writability,
            stats: stats_rx,
            task,
        })
    }
}

/// State owned by the driver task.
struct Driver<T> {
    connection: ArqConnection,
    transport: Arc<T>,
    commands: mpsc::UnboundedReceiver<Command>,
    inbound: mpsc::Receiver<std::io::Result<Bytes>>,
    delivered: mpsc::UnboundedSender<Bytes>,
    passthrough: mpsc::UnboundedSender<Bytes>,
    stats: watch::Sender<ArqStats>,
}

impl<T: Transport> Driver<T> {
    async fn run(mut self) {
        debug!("arq channel started");

        while self.connection.is_active() {
            self.flush().await;
            if !self.connection.is_active() {
                break;
            }

            let deadline = self.connection.poll_timeout();
            tokio::select! {
                command = self.commands.recv() => self.on_command(command),
                inbound = self.inbound.recv() => match inbound {
                    Some(Ok(buf)) => self.connection.handle_datagram_at(buf, now()),
                    Some(Err(err)) => {
                        warn!(error = %err, "transport receive failed");
                        self.connection.close(err.into());
                    }
                    None => self.connection.close(ArqError::ChannelClosed),
                },
                () = sleep_until(deadline) => {
                    if let Err(err) = self.connection.handle_timeout(now()) {
                        warn!(error = %err, "connection torn down");
                    }
                }
            }
        }

        self.publish();
        debug!(stats = ?self.connection.stats(), "arq channel stopped");
    }

    fn on_command(&mut self, command: Option<Command>) {
        match command {
            Some(Command::Write {
                payload,
                completion,
            }) => self.connection.write_with_at(payload, completion, now()),
            Some(Command::Passthrough(buf)) => self.connection.write_passthrough(buf),
            // a dropped handle closes the connection too
            Some(Command::Close) | None => self.connection.close(ArqError::ChannelClosed),
        }
    }

    /// Send every pending datagram and hand delivered payloads upward.
    async fn flush(&mut self) {
        while let Some(buf) = self.connection.poll_transmit() {
            if let Err(err) = self.transport.send(buf).await {
                warn!(error = %err, "transport send failed");
                self.connection.close(err.into());
                break;
            }
        }

        while let Some(payload) = self.connection.poll_delivered() {
            // the application may have stopped reading; keep acking anyway
            let _ = self.delivered.send(payload);
        }
        while let Some(buf) = self.connection.poll_passthrough() {
            let _ = self.passthrough.send(buf);
        }

        self.publish();
    }

    fn publish(&self) {
        self.stats.send_replace(self.connection.stats());
    }
}

/// Application side of a spawned ARQ connection.
///
/// Dropping the handle closes the connection.
#[derive(Debug)]
pub struct ArqHandle {
    commands: mpsc::UnboundedSender<Command>,
    delivered: mpsc::UnboundedReceiver<Bytes>,
    passthrough: mpsc::UnboundedReceiver<Bytes>,
    writability: Writability,
    stats: watch::Receiver<ArqStats>,
    task: JoinHandle<()>,
}

impl ArqHandle {
    /// Submit a payload for reliable, in-order delivery.
    ///
    /// The returned handle resolves once the peer acknowledged the payload,
    /// or fails when the connection goes away first. Dropping it does not
    /// withdraw the write; use [`WriteHandle::cancel`] for that.
    pub fn write(&self, payload: Bytes) -> WriteHandle {
        let (completion, handle) = completion();
        // on a stopped driver the completion is dropped, which reads as closed
        let _ = self.commands.send(Command::Write {
            payload,
            completion,
        });
        handle
    }

    /// Send a buffer that bypasses the ARQ layer.
    pub fn send_passthrough(&self, buf: Bytes) {
        let _ = self.commands.send(Command::Passthrough(buf));
    }

    /// Receive the next payload delivered by the peer.
    ///
    /// Returns `None` once the connection is closed and all delivered
    /// payloads were read.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.delivered.recv().await
    }

    /// Receive the next inbound buffer that was not an ARQ frame.
    pub async fn recv_passthrough(&mut self) -> Option<Bytes> {
        self.passthrough.recv().await
    }

    /// Check if writes should continue.
    pub fn is_writable(&self) -> bool {
        self.writability.is_writable()
    }

    /// Wait until the connection is writable again.
    pub async fn writable(&self) {
        self.writability.writable().await;
    }

    /// Latest published counters.
    pub fn stats(&self) -> ArqStats {
        *self.stats.borrow()
    }

    /// Check if the driver task has stopped.
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    /// Ask the driver to close the connection.
    ///
    /// Every queued and in-flight write fails with [`ArqError::ChannelClosed`].
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Close the connection and wait for the driver task to finish.
    pub async fn shutdown(self) -> ArqStats {
        self.close();
        let Self {
            task, mut stats, ..
        } = self;
        if let Err(err) = task.await {
            warn!(error = %err, "arq channel task failed");
        }
        *stats.borrow_and_update()
    }
}
