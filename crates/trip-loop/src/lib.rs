pub mod config;
pub mod dispatch;
pub mod prompt;
pub mod reconcile;
pub mod runner;
pub mod stream;

pub use config::TurnConfig;
pub use dispatch::Capabilities;
pub use runner::{run_turn, turn_stream};
