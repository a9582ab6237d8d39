use std::fmt::Display;

/// One complete snapshot of the sensor board: three humidity/temperature
/// channels plus the vibration and relay flags.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Readout {
    pub humidity_one: f64,
    pub temperature_one: f64,

    pub humidity_two: f64,
    pub temperature_two: f64,

    pub humidity_three: f64,
    pub temperature_three: f64,

    pub has_vibration: bool,
    pub is_relay_activated: bool,
}

impl Readout {
    /// Vibration flag as stored in the historic buffers.
    pub fn vibration_bit(&self) -> u8 {
        u8::from(self.has_vibration)
    }

    /// Relay flag as stored in the historic buffers.
    pub fn relay_bit(&self) -> u8 {
        u8::from(self.is_relay_activated)
    }
}

impl Display for Readout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Readout | 1:({}%, {} degC) 2:({}%, {} degC) 3:({}%, {} degC) vibration:{} relay:{}>",
            self.humidity_one,
            self.temperature_one,
            self.humidity_two,
            self.temperature_two,
            self.humidity_three,
            self.temperature_three,
            self.has_vibration,
            self.is_relay_activated
        )
    }
}
