use std::{
    io,
    net::{Shutdown, TcpStream},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use pacelink_timing::{Nanos, StepClose, StepTicker};
use pacelink_wire::{CommandMessage, Envelope, WireError, session};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::{Config, ConfigError},
    log::{SimLog, SimRow},
    model::{SimBody, neutral_of},
    rx::{Arrival, RxQueue, spawn_reader},
};

/// Queue poll cadence inside the reply-wait window. Bounded polling rather
/// than a busy spin; coarse enough to stay off the scheduler's back, fine
/// enough to not blur the match.
const POLL_SLEEP: Duration = Duration::from_micros(200);

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("step log: {0}")]
    Log(#[from] io::Error),
}

/// Pacemaker side of the link.
///
/// Owns the send half; the background reader owns the read half and the two
/// meet only at the bounded arrival queue. A torn-down link degrades the run
/// to all-timeout steps instead of aborting it, so the step budget and both
/// logs stay complete.
pub struct Simulator {
    writer: TcpStream,
    rx: Arc<RxQueue>,
    reader: JoinHandle<()>,
    /// Peer is gone; stop writing, keep stepping.
    link_down: bool,
}

impl Simulator {
    /// Connect to the hardware peer and start the background reader.
    pub fn connect(cfg: &Config) -> Result<Self, WireError> {
        let stream = session::connect(&cfg.act_host, cfg.act_port)?;
        let read_half = stream.try_clone()?;
        let rx = Arc::new(RxQueue::new());
        let reader = spawn_reader(read_half, Arc::clone(&rx));
        Ok(Self { writer: stream, rx, reader, link_down: false })
    }

    /// Run the full step budget, appending one row per step, then tear the
    /// link down.
    pub fn run(
        mut self,
        cfg: &Config,
        body: &mut dyn SimBody,
        log: &mut SimLog,
    ) -> Result<(), RunError> {
        let mut ticker = StepTicker::every(cfg.step);
        for step_id in 0..cfg.total_steps {
            self.step(cfg, &mut ticker, step_id, body, log)?;
        }
        log.flush()?;
        info!(steps = cfg.total_steps, "run complete");

        // Shutdown reaches the reader's cloned fd too, unblocking its read.
        let _ = self.writer.shutdown(Shutdown::Both);
        let _ = self.reader.join();
        Ok(())
    }

    fn step(
        &mut self,
        cfg: &Config,
        ticker: &mut StepTicker,
        step_id: u64,
        body: &mut dyn SimBody,
        log: &mut SimLog,
    ) -> Result<(), RunError> {
        ticker.begin_step();

        let cmd = body.command(step_id);
        let t_sim_send = Nanos::now();
        self.send_command(step_id, t_sim_send, cmd.clone())?;

        let reply = self.wait_for_reply(step_id, cfg.reply_timeout);

        // The plant always sees a command-shaped input: the real one when
        // the hardware confirmed it, its zero twin otherwise.
        let applied = match &reply {
            Some(_) => cmd,
            None => neutral_of(&cmd),
        };
        body.plant_update(step_id, &applied);

        let deadline_miss_ms = match ticker.close_step() {
            StepClose::OnTime { .. } => 0.0,
            StepClose::Overrun { by } => by.as_millis(),
        };

        let row = match reply {
            Some(arrival) => SimRow {
                step_id,
                t_sim_send_ns: t_sim_send,
                t_sim_recv_ns: arrival.recv_ns,
                t_act_recv_ns: arrival.telemetry.t_act_recv_ns,
                t_act_send_ns: arrival.telemetry.t_act_send_ns,
                timeout: false,
                deadline_miss_ms,
            },
            None => SimRow::timed_out(step_id, t_sim_send, deadline_miss_ms),
        };
        log.append(&row)?;
        Ok(())
    }

    /// Send this step's command. A peer that tore the connection down flips
    /// the run into its degraded mode; any other send failure is fatal.
    fn send_command(&mut self, step_id: u64, t_sim_send: Nanos, cmd: serde_json::Value) -> Result<(), RunError> {
        if self.link_down {
            return Ok(());
        }
        let command = CommandMessage { step_id, timestamp_ns: t_sim_send, cmd };
        match session::send(&mut self.writer, &Envelope::Command(command)) {
            Ok(()) => Ok(()),
            Err(WireError::Send(err)) if is_peer_teardown(&err) => {
                warn!(step_id, %err, "peer gone, running out the step budget on timeouts");
                self.link_down = true;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Poll the arrival queue for this step's telemetry until the window
    /// closes. Matching is strict: anything stamped with another step id is
    /// discarded on sight, and a dead reader just runs the window out.
    fn wait_for_reply(&self, step_id: u64, window: Nanos) -> Option<Arrival> {
        let wait_until = Instant::now() + Duration::from(window);
        while Instant::now() < wait_until {
            match self.rx.try_pop() {
                Some(arrival) if arrival.telemetry.step_id == step_id => return Some(arrival),
                Some(stray) => {
                    debug!(
                        got = stray.telemetry.step_id,
                        want = step_id,
                        "discarding out-of-step telemetry"
                    );
                }
                None => thread::sleep(POLL_SLEEP),
            }
        }
        None
    }
}

fn is_peer_teardown(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe |
            io::ErrorKind::ConnectionReset |
            io::ErrorKind::ConnectionAborted
    )
}
