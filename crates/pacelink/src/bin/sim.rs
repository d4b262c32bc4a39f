use pacelink::{Config, Role, RunError, SimBody, SimLog, Simulator};
use serde_json::{Value, json};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Built-in numeric body: command `{"v": step * 0.1}`, plant integrates
/// whatever value was confirmed applied.
#[derive(Debug, Default)]
struct NumericBody {
    state: f64,
}

impl SimBody for NumericBody {
    fn command(&mut self, step_id: u64) -> Value {
        json!({ "v": step_id as f64 * 0.1 })
    }

    fn plant_update(&mut self, _step_id: u64, applied: &Value) {
        if let Some(v) = applied.get("v").and_then(Value::as_f64) {
            self.state += v;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run() {
        error!(%err, "simulator failed");
        std::process::exit(1);
    }
}

fn run() -> Result<(), RunError> {
    let cfg = Config::from_env(Role::Simulator)?;
    info!(
        host = %cfg.act_host,
        port = cfg.act_port,
        step = %cfg.step,
        steps = cfg.total_steps,
        "simulator starting"
    );
    let mut log = SimLog::create(&cfg.log_dir)?;
    let mut body = NumericBody::default();
    Simulator::connect(&cfg)?.run(&cfg, &mut body, &mut log)
}
