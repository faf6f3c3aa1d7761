pub mod commands;
pub mod view;

pub use commands::{random, server, stats};
