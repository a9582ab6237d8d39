use std::time::Duration;

use tokio::{
    sync::watch::{self, error::RecvError},
    task::{JoinError, JoinHandle},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    externals::sensor::services::SensorProvider,
    models::{history::HistoricBuffer, readout::Readout},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorSettings {
    /// Capacity of each historic buffer.
    pub history_len: usize,
    pub poll_interval: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            history_len: 120,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Everything the poll task maintains. Only the poll task writes it.
#[derive(Debug, Clone)]
pub struct ReaderState {
    current: Readout,
    vibration: HistoricBuffer,
    relay: HistoricBuffer,
    polls: u64,
}

impl ReaderState {
    pub fn new(current: Readout, history_len: usize) -> Self {
        Self {
            current,
            vibration: HistoricBuffer::new(history_len),
            relay: HistoricBuffer::new(history_len),
            polls: 0,
        }
    }

    /// Make `readout` current and append its flags to the histories.
    pub fn record(&mut self, readout: Readout) {
        self.current = readout;
        self.vibration.push(readout.vibration_bit());
        self.relay.push(readout.relay_bit());
        self.polls += 1;
    }

    pub fn current_readout(&self) -> Readout {
        self.current
    }

    /// Vibration flags, oldest first.
    pub fn historic_vibration_sequence(&self) -> Vec<u8> {
        self.vibration.to_vec()
    }

    /// Relay flags, oldest first.
    pub fn historic_relay_sequence(&self) -> Vec<u8> {
        self.relay.to_vec()
    }

    /// Number of completed polls, not counting the initial readout.
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

/// Read side of an aggregator. Cheap to clone; every accessor returns a
/// copy so callers never see the live buffers.
#[derive(Debug, Clone)]
pub struct ReaderHandle {
    rx_state: watch::Receiver<ReaderState>,
}

impl ReaderHandle {
    pub fn current_readout(&self) -> Readout {
        self.rx_state.borrow().current_readout()
    }

    pub fn historic_vibration_sequence(&self) -> Vec<u8> {
        self.rx_state.borrow().historic_vibration_sequence()
    }

    pub fn historic_relay_sequence(&self) -> Vec<u8> {
        self.rx_state.borrow().historic_relay_sequence()
    }

    /// Copy of the whole state, taken under a single borrow so the parts
    /// are consistent with each other.
    pub fn snapshot(&self) -> ReaderState {
        self.rx_state.borrow().clone()
    }

    /// Wait for the next poll. Errors once the poll task is gone.
    pub async fn changed(&mut self) -> Result<(), RecvError> {
        self.rx_state.changed().await
    }
}

impl From<watch::Receiver<ReaderState>> for ReaderHandle {
    fn from(rx_state: watch::Receiver<ReaderState>) -> Self {
        Self { rx_state }
    }
}

/// Owns the poll task. Shutting it down hands the provider back.
pub struct Aggregator<P> {
    reader: ReaderHandle,
    token: CancellationToken,
    handle: JoinHandle<P>,
}

impl<P: SensorProvider + Send + 'static> Aggregator<P> {
    /// Take one readout synchronously to seed the current readout, then
    /// start polling `provider` every `poll_interval`.
    /// Must be called from within a tokio runtime.
    pub fn spawn(provider: P, settings: AggregatorSettings) -> Self {
        let initial = provider.take_readout();
        debug!("Initial readout: {}", initial);

        let (tx_state, rx_state) = watch::channel(ReaderState::new(initial, settings.history_len));
        let token = CancellationToken::new();
        let handle = tokio::spawn(task_poll_provider(
            token.clone(),
            provider,
            settings.poll_interval,
            tx_state,
        ));

        Self {
            reader: ReaderHandle { rx_state },
            token,
            handle,
        }
    }

    pub fn reader(&self) -> ReaderHandle {
        self.reader.clone()
    }

    /// Stop polling and wait for the poll task. A provider that panicked
    /// while being polled shows up here as the task's `JoinError`.
    pub async fn shutdown(self) -> Result<P, JoinError> {
        self.token.cancel();
        self.handle.await
    }
}

/// Task: Runs periodically to take a readout from the provider and record
/// it. Can be cancelled. Returns the provider when done.
#[tracing::instrument(skip_all)]
async fn task_poll_provider<P: SensorProvider>(
    token: CancellationToken,
    provider: P,
    poll_interval: Duration,
    tx_state: watch::Sender<ReaderState>,
) -> P {
    info!("Started.");
    loop {
        business_logic(&provider, &tx_state);

        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            _ = tokio::time::sleep(poll_interval) => {}
        };
    }
    provider
}

/// Perform task business logic.
/// Take the current readout and record it.
fn business_logic(provider: &impl SensorProvider, tx_state: &watch::Sender<ReaderState>) {
    trace!("Executing business logic.");
    let readout = provider.take_readout();
    tx_state.send_modify(|state| state.record(readout));
    debug!("Recorded readout: {}", readout);
}
