use pacelink::{ActBody, ActLog, Config, Role, RunError, run_responder};
use pacelink_wire::Listener;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Built-in numeric responder: doubles every numeric field of the command
/// and echoes the result back.
struct Doubler;

impl ActBody for Doubler {
    fn respond(&mut self, cmd: &Value) -> Option<Value> {
        Some(double(cmd))
    }
}

fn double(value: &Value) -> Value {
    match value {
        Value::Number(n) => n.as_f64().map_or_else(|| value.clone(), |f| Value::from(f * 2.0)),
        Value::Array(items) => Value::Array(items.iter().map(double).collect()),
        Value::Object(fields) => {
            Value::Object(fields.iter().map(|(k, v)| (k.clone(), double(v))).collect())
        }
        other => other.clone(),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run() {
        error!(%err, "hardware failed");
        std::process::exit(1);
    }
}

fn run() -> Result<(), RunError> {
    let cfg = Config::from_env(Role::Hardware)?;
    let listener = Listener::bind(&cfg.act_host, cfg.act_port)?;
    info!(addr = %listener.local_addr(), "waiting for the simulator");
    let stream = listener.accept_one()?;
    let mut log = ActLog::create(&cfg.log_dir)?;
    run_responder(stream, &mut Doubler, &mut log)
}
