use serde_json::{Map, Value};

/// Simulator-side plug-in: produces the per-step command and advances the
/// plant with whatever command ended up applied.
pub trait SimBody {
    /// Command payload for `step_id`. Shape is the body's own contract with
    /// its hardware counterpart; the runtime does not interpret it.
    fn command(&mut self, step_id: u64) -> Value;

    /// Advance the plant. `applied` is the real command when the hardware
    /// confirmed it in time, or its zero-shaped stand-in after a timeout.
    fn plant_update(&mut self, step_id: u64, applied: &Value);
}

/// Hardware-side plug-in: turns a command payload into a telemetry payload.
pub trait ActBody {
    /// `None` withholds the reply (fault-model hook). The command is still
    /// consumed and logged, and step ids are never re-numbered.
    fn respond(&mut self, cmd: &Value) -> Option<Value>;
}

/// Zero command of the same shape as `cmd`: a list maps to zeros of equal
/// length, an object keeps its keys with zero values, anything else is null.
///
/// Timed-out steps feed this to the plant so the callback sees a stable
/// input shape whether or not the hardware answered.
pub fn neutral_of(cmd: &Value) -> Value {
    match cmd {
        Value::Array(items) => Value::Array(vec![Value::from(0.0); items.len()]),
        Value::Object(fields) => Value::Object(
            fields.keys().map(|key| (key.clone(), Value::from(0.0))).collect::<Map<_, _>>(),
        ),
        _ => Value::Null,
    }
}
