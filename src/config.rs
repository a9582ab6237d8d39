use std::time::Duration;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use crate::{externals::sensor::transport::SerialSettings, tasks::aggregator::AggregatorSettings};

const DEFAULT_BAUD_RATE: u32 = 9600;

/// Polls a serial sensor board and keeps its latest readout and a short
/// vibration/relay history.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// Serial port of the sensor board. Readouts are simulated when absent.
    #[arg(long, env = "SERIAL_PORT")]
    pub serial_port: Option<String>,

    /// Baud rate of the serial port. 0 means the default.
    #[arg(long, env = "SERIAL_PORT_BAUDRATE", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    /// How long a single line read may block.
    #[arg(long, default_value_t = 1000)]
    pub read_timeout_ms: u64,

    /// Time between two polls of the provider.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: u64,

    /// Number of polls kept in each history.
    #[arg(long, default_value_t = 120, value_parser = parse_history_len)]
    pub history_len: usize,

    /// Time between two snapshot reports in the log.
    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..))]
    pub report_interval_ms: u64,

    /// Maximum log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}

fn parse_history_len(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("history length must be at least 1".into()),
        Ok(len) => Ok(len),
        Err(e) => Err(e.to_string()),
    }
}

impl Config {
    pub fn baud_rate(&self) -> u32 {
        match self.baud_rate {
            0 => DEFAULT_BAUD_RATE,
            rate => rate,
        }
    }

    /// Serial settings, or `None` when no port is configured.
    pub fn serial_settings(&self) -> Option<SerialSettings> {
        let port_name = self.serial_port.as_ref().filter(|port| !port.is_empty())?;
        Some(SerialSettings {
            port_name: port_name.clone(),
            baud_rate: self.baud_rate(),
            timeout: Duration::from_millis(self.read_timeout_ms),
        })
    }

    pub fn aggregator_settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            history_len: self.history_len,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["sensor_monitor"]).unwrap();
        assert!(config.serial_settings().is_none());
        assert_eq!(config.baud_rate(), 9600);
        assert_eq!(config.log_level, LevelFilter::INFO);

        let settings = config.aggregator_settings();
        assert_eq!(settings.history_len, 120);
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(config.report_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_serial_settings() {
        let config = Config::try_parse_from([
            "sensor_monitor",
            "--serial-port",
            "/dev/ttyACM0",
            "--baud-rate",
            "115200",
            "--read-timeout-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(
            config.serial_settings(),
            Some(SerialSettings {
                port_name: "/dev/ttyACM0".into(),
                baud_rate: 115200,
                timeout: Duration::from_millis(250),
            })
        );
    }

    #[test]
    fn test_zero_baud_rate_means_default() {
        let config =
            Config::try_parse_from(["sensor_monitor", "--serial-port", "COM3", "--baud-rate", "0"])
                .unwrap();
        assert_eq!(config.serial_settings().unwrap().baud_rate, 9600);
    }

    #[test]
    fn test_empty_port_means_simulated() {
        let config = Config::try_parse_from(["sensor_monitor", "--serial-port", ""]).unwrap();
        assert!(config.serial_settings().is_none());
    }

    #[test]
    fn test_rejects_zero_history_and_interval() {
        assert!(Config::try_parse_from(["sensor_monitor", "--history-len", "0"]).is_err());
        assert!(Config::try_parse_from(["sensor_monitor", "--poll-interval-ms", "0"]).is_err());
    }

    #[test]
    fn test_log_level() {
        let config = Config::try_parse_from(["sensor_monitor", "--log-level", "trace"]).unwrap();
        assert_eq!(config.log_level, LevelFilter::TRACE);
    }
}
