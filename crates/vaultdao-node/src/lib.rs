pub mod config;
pub mod logging;
pub mod replay;

pub use config::NodeConfig;
pub use replay::{ReplayRecord, ReplaySummary};
