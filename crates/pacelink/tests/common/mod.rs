#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};

use pacelink::{ActBody, ActLog, Config, Role, run_responder};
use pacelink_wire::Listener;
use serde_json::Value;

/// Loopback config for one test run.
pub fn config(port: u16, step_ms: u64, reply_timeout_ms: u64, total_steps: u64, log_dir: &Path) -> Config {
    let map = HashMap::from([
        ("ACT_HOST".to_owned(), "127.0.0.1".to_owned()),
        ("ACT_PORT".to_owned(), port.to_string()),
        ("STEP_MS".to_owned(), step_ms.to_string()),
        ("REPLY_TIMEOUT_MS".to_owned(), reply_timeout_ms.to_string()),
        ("TOTAL_STEPS".to_owned(), total_steps.to_string()),
        ("LOG_DIR".to_owned(), log_dir.to_string_lossy().into_owned()),
    ]);
    Config::from_lookup(Role::Simulator, move |key| map.get(key).cloned()).unwrap()
}

/// Run the full responder loop against one accepted peer in a thread.
pub fn spawn_hardware<B>(listener: Listener, mut body: B, log_dir: PathBuf) -> JoinHandle<()>
where
    B: ActBody + Send + 'static,
{
    thread::spawn(move || {
        let stream = listener.accept_one().unwrap();
        let mut log = ActLog::create(&log_dir).unwrap();
        run_responder(stream, &mut body, &mut log).unwrap();
    })
}

/// Data rows of a step log, split into cells.
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let text = std::fs::read_to_string(path).unwrap();
    text.lines().skip(1).map(|line| line.split(',').map(str::to_owned).collect()).collect()
}

pub fn cell_u64(row: &[String], idx: usize) -> u64 {
    row[idx].parse().unwrap()
}

/// Responder that doubles every numeric field.
pub struct Doubler;

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
