pub mod live;
pub mod parser;
pub mod services;
pub mod transport;
