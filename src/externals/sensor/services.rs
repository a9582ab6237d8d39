use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{config::Config, models::readout::Readout};

use super::{
    live::{LiveProvider, LiveProviderError},
    transport::open_serial,
};

/// This service separates where readouts come from (hardware or a
/// generator) from the polling logic, which makes the aggregator easy to
/// unit test.
pub trait SensorProvider {
    /// Observe the current readout. This is a take: providers that latch
    /// transient events release them here, so call it once per logical
    /// observation.
    fn take_readout(&self) -> Readout;
}

/// Baselines the simulated channels jitter around.
const HUMIDITY_ONE: f64 = 50.0;
const TEMPERATURE_ONE: f64 = 25.0;
const HUMIDITY_TWO: f64 = 52.0;
const TEMPERATURE_TWO: f64 = 25.0;
const HUMIDITY_THREE: f64 = 53.0;
const TEMPERATURE_THREE: f64 = 27.0;

/// Generates plausible readouts without any hardware attached.
/// Every call is independent of the previous ones.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedProvider {
    jitter: f64,
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self { jitter: 10.0 }
    }
}

impl SimulatedProvider {
    pub fn new(jitter: f64) -> Self {
        Self {
            jitter: jitter.abs(),
        }
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Uniform jitter in `[-jitter, jitter]` rounded to two decimals.
    fn variation(&self, rng: &mut impl Rng) -> f64 {
        if self.jitter == 0.0 {
            return 0.0;
        }
        let variation: f64 = rng.gen_range(-self.jitter..=self.jitter);
        (variation * 100.0).round() / 100.0
    }
}

impl SensorProvider for SimulatedProvider {
    fn take_readout(&self) -> Readout {
        // Seeded from OS entropy, so runs never repeat.
        let mut rng = rand::thread_rng();
        Readout {
            humidity_one: HUMIDITY_ONE + self.variation(&mut rng),
            temperature_one: TEMPERATURE_ONE + self.variation(&mut rng),
            humidity_two: HUMIDITY_TWO + self.variation(&mut rng),
            temperature_two: TEMPERATURE_TWO + self.variation(&mut rng),
            humidity_three: HUMIDITY_THREE + self.variation(&mut rng),
            temperature_three: TEMPERATURE_THREE + self.variation(&mut rng),
            has_vibration: rng.gen_bool(0.5),
            is_relay_activated: rng.gen_bool(0.5),
        }
    }
}

/// The provider picked at startup.
pub enum Provider {
    Simulated(SimulatedProvider),
    Live(LiveProvider),
}

impl Provider {
    /// Open the configured serial port, or fall back to simulated readouts
    /// when no port is configured. Failing to open a configured port is an
    /// error, not a fallback. Must be called from within a tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self, LiveProviderError> {
        match config.serial_settings() {
            Some(settings) => {
                let transport =
                    open_serial(&settings).map_err(LiveProviderError::FailedToOpenPort)?;
                info!("Reading sensors from '{}'.", settings.port_name);
                Ok(Provider::Live(LiveProvider::spawn(transport)))
            }
            None => {
                info!("No serial port configured, simulating readouts.");
                Ok(Provider::Simulated(SimulatedProvider::default()))
            }
        }
    }

    /// Cancelled once live reading ends and readouts stop changing.
    /// Simulated readouts never go stale, so there is nothing to watch.
    pub fn reading_ended(&self) -> Option<CancellationToken> {
        match self {
            Provider::Simulated(_) => None,
            Provider::Live(live) => Some(live.reading_ended()),
        }
    }

    /// Stop any background reading and wait for it to finish.
    pub async fn shutdown(self) -> Result<(), LiveProviderError> {
        match self {
            Provider::Simulated(_) => Ok(()),
            Provider::Live(live) => live.shutdown().await,
        }
    }
}

impl SensorProvider for Provider {
    fn take_readout(&self) -> Readout {
        match self {
            Provider::Simulated(simulated) => simulated.take_readout(),
            Provider::Live(live) => live.take_readout(),
        }
    }
}
