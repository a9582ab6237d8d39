use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::tasks::aggregator::{ReaderHandle, ReaderState};

/// Task: Runs periodically to log the latest snapshot of the aggregator.
/// Only reads, never polls the provider itself. Warns on every report once
/// `reading_ended` is cancelled, since the readouts no longer change.
/// Can be cancelled.
#[tracing::instrument(skip_all)]
pub async fn task_report_readouts(
    token: CancellationToken,
    reader: ReaderHandle,
    report_interval: Duration,
    reading_ended: Option<CancellationToken>,
) {
    info!("Started.");
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            _ = tokio::time::sleep(report_interval) => {
                trace!("Reporting snapshot.");
                let snapshot = reader.snapshot();
                info!("{}", snapshot.current_readout());
                info!("{}", history_line(&snapshot));
                if is_stale(reading_ended.as_ref()) {
                    warn!("Sensor reading has stopped, readout is stale.");
                }
            }
        };
    }
}

fn is_stale(reading_ended: Option<&CancellationToken>) -> bool {
    reading_ended.is_some_and(CancellationToken::is_cancelled)
}

/// Render both histories as `0`/`1` strings, oldest first.
fn history_line(snapshot: &ReaderState) -> String {
    format!(
        "After {} polls | vibration:[{}] relay:[{}]",
        snapshot.polls(),
        bits(&snapshot.historic_vibration_sequence()),
        bits(&snapshot.historic_relay_sequence())
    )
}

fn bits(values: &[u8]) -> String {
    values.iter().map(|value| value.to_string()).collect()
}
