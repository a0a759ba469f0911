pub mod config;
pub mod serial;
pub mod traits;
