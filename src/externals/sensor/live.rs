use std::io;

use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::models::readout::Readout;

use super::{
    parser::{LineParseError, LineParser, VibrationLatch},
    services::SensorProvider,
    transport::Transport,
};

#[derive(Error, Debug)]
pub enum LiveProviderError {
    /// The configured port couldn't be opened. Device might be disconnected.
    #[error("Failed to open serial port. Error: {0}")]
    FailedToOpenPort(#[source] serialport::Error),

    /// The transport failed with something other than a timeout.
    #[error("Failed to read from transport. Error: {0}")]
    FailedToRead(#[from] io::Error),

    /// A line had the right shape but a field wasn't numeric.
    #[error("Failed to parse line. Error: {0}")]
    FailedToParse(#[from] LineParseError),

    #[error("Read task panicked. Error: {0}")]
    ReadTaskPanicked(#[from] tokio::task::JoinError),
}

/// Provides readouts parsed from a transport by a background read task.
///
/// The read task keeps the last good readout; `take_readout` returns it and
/// releases the vibration latch, `peek_readout` only returns it.
pub struct LiveProvider {
    latch: VibrationLatch,
    rx_readout: watch::Receiver<Readout>,
    token: CancellationToken,
    ended: CancellationToken,
    handle: Option<JoinHandle<Result<(), LiveProviderError>>>,
}

impl LiveProvider {
    /// Start reading lines from `transport` in the background.
    /// Until the first good line arrives the stored readout is all zeros.
    /// Must be called from within a tokio runtime.
    pub fn spawn<T: Transport + 'static>(transport: T) -> Self {
        let latch = VibrationLatch::new();
        let parser = LineParser::new(latch.clone());
        let (tx_readout, rx_readout) = watch::channel(Readout::default());
        let token = CancellationToken::new();
        let ended = CancellationToken::new();

        let handle = tokio::spawn(task_read_sensor_lines(
            token.clone(),
            ended.clone(),
            transport,
            parser,
            tx_readout,
        ));

        Self {
            latch,
            rx_readout,
            token,
            ended,
            handle: Some(handle),
        }
    }

    /// The stored readout, without touching the vibration latch.
    pub fn peek_readout(&self) -> Readout {
        *self.rx_readout.borrow()
    }

    /// A receiver that is notified every time a good line is stored.
    pub fn subscribe(&self) -> watch::Receiver<Readout> {
        self.rx_readout.clone()
    }

    /// Whether the read task is still running. It stops after being asked
    /// to or after a fatal read or parse error.
    pub fn is_reading(&self) -> bool {
        !self.ended.is_cancelled()
    }

    /// Cancelled once the read task has ended for any reason, including a
    /// panic. Lets consumers notice the stored readout has gone stale.
    pub fn reading_ended(&self) -> CancellationToken {
        self.ended.clone()
    }

    /// Ask the read task to stop. It notices between line reads, so this
    /// takes effect within one read timeout.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Stop the read task and wait for it. Returns the error that ended the
    /// task, if any.
    pub async fn shutdown(mut self) -> Result<(), LiveProviderError> {
        self.stop();
        match self.handle.take() {
            Some(handle) => handle.await?,
            None => Ok(()),
        }
    }
}

impl SensorProvider for LiveProvider {
    fn take_readout(&self) -> Readout {
        // The read task latches before it stores the readout, so a vibrating
        // line may not be stored yet. Fold the released latch in to not lose it.
        let latched = self.latch.release();
        let mut readout = self.peek_readout();
        if latched {
            trace!("Released vibration latch.");
            readout.has_vibration = true;
        }
        readout
    }
}

impl Drop for LiveProvider {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Task: Read lines from the transport until cancelled. Blocking reads run
/// on the blocking pool. Every good line replaces the stored readout; empty
/// and misshapen lines are skipped. Ends with an error on a transport
/// failure or a non-numeric field.
#[tracing::instrument(skip_all)]
async fn task_read_sensor_lines<T: Transport + 'static>(
    token: CancellationToken,
    ended: CancellationToken,
    mut transport: T,
    parser: LineParser,
    tx_readout: watch::Sender<Readout>,
) -> Result<(), LiveProviderError> {
    info!("Started.");
    let _ended = ended.drop_guard();

    while !token.is_cancelled() {
        trace!("Waiting for a line.");
        let (returned, line) = tokio::task::spawn_blocking(move || {
            let line = transport.read_line();
            (transport, line)
        })
        .await?;
        transport = returned;

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read from transport. Error: {}", e);
                return Err(e.into());
            }
        };
        trace!("Got a line of {} bytes.", line.len());

        match parser.parse_line(&line) {
            Ok(Some(readout)) => {
                debug!("Stored readout: {}", readout);
                tx_readout.send_replace(readout);
            }
            Ok(None) => trace!("No readout in line, keeping previous."),
            Err(e) => {
                error!("Failed to parse line. Error: {}", e);
                return Err(e.into());
            }
        }
    }

    warn!("Cancelled.");
    Ok(())
}
