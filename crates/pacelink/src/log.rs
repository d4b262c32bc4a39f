use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
};

use pacelink_timing::Nanos;

pub const SIM_LOG_FILE: &str = "sim_log.csv";
pub const ACT_LOG_FILE: &str = "act_log.csv";

// Column order is an external contract; the analysis tooling indexes by it.
const SIM_HEADER: &str =
    "step_id,t_sim_send_ns,t_sim_recv_ns,t_act_recv_ns,t_act_send_ns,timeout,deadline_miss_ms";
const ACT_HEADER: &str = "step_id,t_act_recv_ns,t_act_send_ns,missing_cmd,note";

/// One simulator step as logged. Rows are written once and never touched
/// again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimRow {
    pub step_id: u64,
    pub t_sim_send_ns: Nanos,
    pub t_sim_recv_ns: Nanos,
    pub t_act_recv_ns: Nanos,
    pub t_act_send_ns: Nanos,
    pub timeout: bool,
    pub deadline_miss_ms: f64,
}

impl SimRow {
    /// Timed-out step: zeros in every peer-derived column. Deadline misses
    /// are accounted independently of the timeout itself.
    pub fn timed_out(step_id: u64, t_sim_send_ns: Nanos, deadline_miss_ms: f64) -> Self {
        Self {
            step_id,
            t_sim_send_ns,
            t_sim_recv_ns: Nanos::ZERO,
            t_act_recv_ns: Nanos::ZERO,
            t_act_send_ns: Nanos::ZERO,
            timeout: true,
            deadline_miss_ms,
        }
    }
}

/// One hardware step as logged.
#[derive(Debug, Clone, PartialEq)]
pub struct ActRow {
    pub step_id: u64,
    pub t_act_recv_ns: Nanos,
    pub t_act_send_ns: Nanos,
    pub missing_cmd: bool,
    pub note: String,
}

pub struct SimLog {
    out: BufWriter<File>,
}

impl SimLog {
    /// Create `sim_log.csv` under `dir` (creating `dir` itself if needed)
    /// and write the header row.
    pub fn create(dir: &Path) -> io::Result<Self> {
        Ok(Self { out: create_log(dir, SIM_LOG_FILE, SIM_HEADER)? })
    }

    pub fn append(&mut self, row: &SimRow) -> io::Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{},{},{:.3}",
            row.step_id,
            row.t_sim_send_ns.0,
            row.t_sim_recv_ns.0,
            row.t_act_recv_ns.0,
            row.t_act_send_ns.0,
            bool_cell(row.timeout),
            row.deadline_miss_ms,
        )
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl Drop for SimLog {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}

pub struct ActLog {
    out: BufWriter<File>,
}

impl ActLog {
    /// Create `act_log.csv` under `dir` and write the header row.
    pub fn create(dir: &Path) -> io::Result<Self> {
        Ok(Self { out: create_log(dir, ACT_LOG_FILE, ACT_HEADER)? })
    }

    pub fn append(&mut self, row: &ActRow) -> io::Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{}",
            row.step_id,
            row.t_act_recv_ns.0,
            row.t_act_send_ns.0,
            bool_cell(row.missing_cmd),
            row.note,
        )
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl Drop for ActLog {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}

fn create_log(dir: &Path, file: &str, header: &str) -> io::Result<BufWriter<File>> {
    fs::create_dir_all(dir)?;
    let mut out = BufWriter::new(File::create(dir.join(file))?);
    writeln!(out, "{header}")?;
    Ok(out)
}

/// Booleans log as `True`/`False`, the spelling the analysis tooling parses.
fn bool_cell(v: bool) -> &'static str {
    if v { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_rows_format_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SimLog::create(dir.path()).unwrap();
        log.append(&SimRow {
            step_id: 0,
            t_sim_send_ns: Nanos(100),
            t_sim_recv_ns: Nanos(250),
            t_act_recv_ns: Nanos(40),
            t_act_send_ns: Nanos(90),
            timeout: false,
            deadline_miss_ms: 0.0,
        })
        .unwrap();
        log.append(&SimRow::timed_out(1, Nanos(1_100), 1.25)).unwrap();
        log.flush().unwrap();

        let text = fs::read_to_string(dir.path().join(SIM_LOG_FILE)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], SIM_HEADER);
        assert_eq!(lines[1], "0,100,250,40,90,False,0.000");
        assert_eq!(lines[2], "1,1100,0,0,0,True,1.250");
    }

    #[test]
    fn act_rows_format_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ActLog::create(dir.path()).unwrap();
        log.append(&ActRow {
            step_id: 3,
            t_act_recv_ns: Nanos(10),
            t_act_send_ns: Nanos(20),
            missing_cmd: false,
            note: String::new(),
        })
        .unwrap();
        log.append(&ActRow {
            step_id: 4,
            t_act_recv_ns: Nanos(30),
            t_act_send_ns: Nanos(31),
            missing_cmd: true,
            note: "command payload missing".to_owned(),
        })
        .unwrap();
        log.flush().unwrap();

        let text = fs::read_to_string(dir.path().join(ACT_LOG_FILE)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ACT_HEADER);
        assert_eq!(lines[1], "3,10,20,False,");
        assert_eq!(lines[2], "4,30,31,True,command payload missing");
    }

    #[test]
    fn create_makes_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("runs/today");
        let _ = SimLog::create(&nested).unwrap();
        assert!(nested.join(SIM_LOG_FILE).exists());
    }
}
