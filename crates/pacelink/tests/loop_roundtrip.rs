mod common;

use std::collections::HashMap;

use common::{Doubler, cell_u64, config, read_rows, spawn_hardware};
use pacelink::{ActBody, SimBody, SimLog, Simulator, log};
use pacelink_wire::Listener;
use serde_json::{Value, json};

/// Simulator body that records every payload the plant was updated with.
struct RecordingBody {
    cmd_of: fn(u64) -> Value,
    applied: Vec<Value>,
}

impl RecordingBody {
    fn new(cmd_of: fn(u64) -> Value) -> Self {
        Self { cmd_of, applied: Vec::new() }
    }
}

impl SimBody for RecordingBody {
    fn command(&mut self, step_id: u64) -> Value {
        (self.cmd_of)(step_id)
    }

    fn plant_update(&mut self, _step_id: u64, applied: &Value) {
        self.applied.push(applied.clone());
    }
}

/// Responder that consumes commands but never replies.
struct Mute;

impl ActBody for Mute {
    fn respond(&mut self, _cmd: &Value) -> Option<Value> {
        None
    }
}

#[test]
fn happy_path_matches_every_step() {
    const STEPS: u64 = 30;

    let dir = tempfile::tempdir().unwrap();
    let listener = Listener::bind("127.0.0.1", 0).unwrap();
    let cfg = config(listener.local_addr().port(), 10, 8, STEPS, dir.path());

    let hardware = spawn_hardware(listener, Doubler, dir.path().to_path_buf());

    let mut body = RecordingBody::new(|step| json!({ "v": step as f64 * 0.1 }));
    let mut sim_log = SimLog::create(dir.path()).unwrap();
    Simulator::connect(&cfg).unwrap().run(&cfg, &mut body, &mut sim_log).unwrap();
    drop(sim_log);
    hardware.join().unwrap();

    let sim_rows = read_rows(&dir.path().join(log::SIM_LOG_FILE));
    let act_rows = read_rows(&dir.path().join(log::ACT_LOG_FILE));
    assert_eq!(sim_rows.len() as u64, STEPS);
    assert_eq!(act_rows.len() as u64, STEPS);

    // Hardware stamps keyed by step id, for cross-checking matched rows.
    let act_stamps: HashMap<u64, (u64, u64)> = act_rows
        .iter()
        .map(|row| (cell_u64(row, 0), (cell_u64(row, 1), cell_u64(row, 2))))
        .collect();

    for (i, row) in sim_rows.iter().enumerate() {
        assert_eq!(cell_u64(row, 0), i as u64, "step ids are gapless");
        assert_eq!(row[5], "False", "step {i} timed out");

        let (send, recv) = (cell_u64(row, 1), cell_u64(row, 2));
        assert!(recv > send, "step {i}: recv {recv} before send {send}");

        let stamps = act_stamps[&(i as u64)];
        assert_eq!((cell_u64(row, 3), cell_u64(row, 4)), stamps, "step {i} stamps");
        assert!(stamps.1 >= stamps.0, "step {i}: hardware sent before it received");

        let miss: f64 = row[6].parse().unwrap();
        assert!(miss >= 0.0, "step {i}: negative deadline miss {miss}");
    }

    // Every step got a reply, so the plant saw the real commands.
    assert_eq!(body.applied.len() as u64, STEPS);
    for (step, applied) in body.applied.iter().enumerate() {
        assert_eq!(applied, &json!({ "v": step as f64 * 0.1 }));
    }
}

#[test]
fn muted_hardware_times_out_map_commands_into_zero_maps() {
    let (sim_rows, applied, act_rows) = run_muted(|_| json!({ "v": 0.1, "w": 2.5 }));

    for row in &sim_rows {
        assert_eq!(row[5], "True");
        assert_eq!(cell_u64(row, 2), 0);
        assert_eq!(cell_u64(row, 3), 0);
        assert_eq!(cell_u64(row, 4), 0);
        assert!(cell_u64(row, 1) > 0, "send stamp is still real");
    }
    for value in &applied {
        assert_eq!(value, &json!({ "v": 0.0, "w": 0.0 }));
    }
    // The hardware consumed every command and logged the withheld replies.
    assert_eq!(act_rows.len(), sim_rows.len());
    for row in &act_rows {
        assert!(row.last().unwrap().contains("reply withheld"));
    }
}

#[test]
fn muted_hardware_times_out_list_commands_into_zero_lists() {
    let (sim_rows, applied, _) = run_muted(|_| json!([1.0, 2.0]));

    for row in &sim_rows {
        assert_eq!(row[5], "True");
    }
    for value in &applied {
        assert_eq!(value, &json!([0.0, 0.0]));
    }
}

fn run_muted(cmd_of: fn(u64) -> Value) -> (Vec<Vec<String>>, Vec<Value>, Vec<Vec<String>>) {
    const STEPS: u64 = 5;

    let dir = tempfile::tempdir().unwrap();
    let listener = Listener::bind("127.0.0.1", 0).unwrap();
    let cfg = config(listener.local_addr().port(), 5, 2, STEPS, dir.path());

    let hardware = spawn_hardware(listener, Mute, dir.path().to_path_buf());

    let mut body = RecordingBody::new(cmd_of);
    let mut sim_log = SimLog::create(dir.path()).unwrap();
    Simulator::connect(&cfg).unwrap().run(&cfg, &mut body, &mut sim_log).unwrap();
    drop(sim_log);
    hardware.join().unwrap();

    let sim_rows = read_rows(&dir.path().join(log::SIM_LOG_FILE));
    let act_rows = read_rows(&dir.path().join(log::ACT_LOG_FILE));
    assert_eq!(sim_rows.len() as u64, STEPS);
    (sim_rows, body.applied, act_rows)
}
