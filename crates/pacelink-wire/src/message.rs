use pacelink_timing::Nanos;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One logical wire unit. Externally tagged, so the payload reads
/// `{"command": {...}}` or `{"telemetry": {...}}`.
///
/// Decoding ignores unknown fields inside either variant, so peers may add
/// fields without breaking older readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope {
    Command(CommandMessage),
    Telemetry(TelemetryMessage),
}

/// Simulator → hardware. `cmd` is opaque to the transport; the hardware-side
/// callback interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub step_id: u64,
    /// Sender's monotonic clock at send. Meaningless on the receiving side.
    pub timestamp_ns: Nanos,
    pub cmd: Value,
}

/// Hardware → simulator. `step_id` is always copied from the command being
/// answered; the hardware never numbers steps itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    pub step_id: u64,
    /// Hardware's monotonic clock when the command arrived.
    pub t_act_recv_ns: Nanos,
    /// Hardware's monotonic clock immediately before the reply was sent.
    pub t_act_send_ns: Nanos,
    #[serde(default)]
    pub missing_cmd: bool,
    #[serde(default)]
    pub note: String,
    /// Opaque response payload; omitted on the wire when null.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl TelemetryMessage {
    /// Plain answer to `step_id` carrying `data`, with both hardware stamps.
    pub fn answer(step_id: u64, t_act_recv_ns: Nanos, t_act_send_ns: Nanos, data: Value) -> Self {
        Self {
            step_id,
            t_act_recv_ns,
            t_act_send_ns,
            missing_cmd: false,
            note: String::new(),
            data,
        }
    }
}
