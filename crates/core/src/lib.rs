pub mod config;
pub mod timeout;

pub use config::Config;
pub use timeout::{TimeoutTier, Timeouts};
