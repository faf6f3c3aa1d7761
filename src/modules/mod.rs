pub mod help;
pub mod players;
pub mod servers;
pub mod status;
pub mod system;
