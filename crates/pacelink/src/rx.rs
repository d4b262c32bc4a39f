use std::{
    collections::VecDeque,
    io::BufReader,
    net::TcpStream,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use pacelink_timing::Nanos;
use pacelink_wire::{Envelope, TelemetryMessage, WireError, frame};
use tracing::{debug, warn};

/// One decoded telemetry frame, stamped the moment it left the decoder.
#[derive(Debug, Clone)]
pub struct Arrival {
    pub recv_ns: Nanos,
    pub telemetry: TelemetryMessage,
}

/// Bounded arrival queue between the reader thread and the step loop.
///
/// Single producer, single consumer; this is the only state those threads
/// share. Overflow evicts the oldest entry, since the freshest telemetry is
/// the one the next matching attempt can still use.
#[derive(Debug)]
pub struct RxQueue {
    inner: Mutex<VecDeque<Arrival>>,
    capacity: usize,
    closed: AtomicBool,
}

impl RxQueue {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "arrival queue needs room for at least one entry");
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue, evicting the oldest entry when full. Returns the evicted
    /// arrival, if any.
    pub fn push(&self, arrival: Arrival) -> Option<Arrival> {
        let mut q = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let evicted = if q.len() == self.capacity { q.pop_front() } else { None };
        q.push_back(arrival);
        evicted
    }

    /// Non-blocking pop in enqueue order.
    pub fn try_pop(&self) -> Option<Arrival> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark the producing side gone. Entries already queued stay poppable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for RxQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Background reader owning the link's read half.
///
/// Decodes frames back to back, stamping each arrival. Terminates on EOF or
/// any decode failure and closes the queue, which the step loop observes as
/// every remaining step timing out; it never tears the run down itself.
pub fn spawn_reader(read_half: TcpStream, queue: Arc<RxQueue>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("pacelink-rx".into())
        .spawn(move || {
            let mut reader = BufReader::new(read_half);
            loop {
                match frame::decode_one(&mut reader) {
                    Ok(Envelope::Telemetry(telemetry)) => {
                        let arrival = Arrival { recv_ns: Nanos::now(), telemetry };
                        if let Some(evicted) = queue.push(arrival) {
                            debug!(
                                step_id = evicted.telemetry.step_id,
                                "arrival queue full, dropped oldest"
                            );
                        }
                    }
                    Ok(Envelope::Command(cmd)) => {
                        warn!(step_id = cmd.step_id, "ignoring command frame on telemetry link");
                    }
                    Err(WireError::ShortRead) => {
                        debug!("telemetry link closed");
                        break;
                    }
                    Err(err) => {
                        warn!(%err, "telemetry reader stopping");
                        break;
                    }
                }
            }
            queue.close();
        })
        .expect("couldn't spawn the telemetry reader")
}
