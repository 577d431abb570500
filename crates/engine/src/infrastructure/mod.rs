//! Infrastructure layer: port traits and the adapters that implement them.

pub mod archipelago;
pub mod config;
pub mod ports;
pub mod random;
pub mod stdio_host;
