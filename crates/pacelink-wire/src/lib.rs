mod error;
pub mod frame;
mod message;
pub mod session;

pub use error::WireError;
pub use frame::{MAGIC, MAX_PAYLOAD_LEN, decode_one, encode};
pub use message::{CommandMessage, Envelope, TelemetryMessage};
pub use session::{Listener, connect, send};
