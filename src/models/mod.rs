pub mod history;
pub mod readout;
