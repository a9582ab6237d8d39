//! Polls a sensor board over a serial line and keeps its latest readout
//! plus a short history of the vibration and relay flags.

pub mod config;
pub mod externals;
pub mod models;
pub mod tasks;
