pub mod act;
pub mod config;
pub mod log;
pub mod model;
pub mod rx;
pub mod sim;

pub use act::run_responder;
pub use config::{Config, ConfigError, Role};
pub use log::{ActLog, ActRow, SimLog, SimRow};
pub use model::{ActBody, SimBody, neutral_of};
pub use rx::{Arrival, RxQueue, spawn_reader};
pub use sim::{RunError, Simulator};
