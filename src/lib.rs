pub mod aging;
pub mod cli;
pub mod config;
pub mod error;
pub mod notify;
pub mod platform;
pub mod remote;
pub mod store;

pub use config::Config;
pub use error::MonitorError;
pub use platform::{AlertPlatform, RunOutcome, RunReport};
