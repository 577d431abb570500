//! API layer - entry points that drive the application.

pub mod console;

pub use console::{Command, Console};
