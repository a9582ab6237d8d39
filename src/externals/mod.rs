pub mod reporting;
pub mod sensor;
