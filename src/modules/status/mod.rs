pub mod commands;
pub mod query;
pub mod slp;

pub use commands::mcinfo;
