use std::{io::BufReader, net::TcpStream};

use pacelink_timing::Nanos;
use pacelink_wire::{Envelope, TelemetryMessage, WireError, frame, session};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    log::{ActLog, ActRow},
    model::ActBody,
    sim::RunError,
};

/// Reactive side of the link: read a command, compute, reply, log.
///
/// Strictly sequential and single-threaded; the simulator paces the loop, so
/// reads block without a timeout. Any decode failure or EOF is the peer
/// going away and ends the loop cleanly with the log intact.
pub fn run_responder(
    stream: TcpStream,
    body: &mut dyn ActBody,
    log: &mut ActLog,
) -> Result<(), RunError> {
    let mut reader = BufReader::new(stream.try_clone().map_err(WireError::Io)?);
    let mut writer = stream;

    loop {
        let command = match frame::decode_one(&mut reader) {
            Ok(Envelope::Command(command)) => command,
            Ok(Envelope::Telemetry(t)) => {
                warn!(step_id = t.step_id, "ignoring telemetry frame on command link");
                continue;
            }
            Err(WireError::ShortRead) => {
                info!("peer closed the link");
                break;
            }
            Err(err) => {
                warn!(%err, "command stream unreadable, stopping");
                break;
            }
        };

        let t_act_recv = Nanos::now();
        let missing_cmd = command.cmd.is_null();
        let mut note = String::new();
        if missing_cmd {
            note.push_str("command payload missing");
        }

        // A missing payload is still answered, with nothing in it.
        let response = if missing_cmd { Some(Value::Null) } else { body.respond(&command.cmd) };
        let t_act_send = Nanos::now();

        match response {
            Some(data) => {
                let telemetry = TelemetryMessage {
                    step_id: command.step_id,
                    t_act_recv_ns: t_act_recv,
                    t_act_send_ns: t_act_send,
                    missing_cmd,
                    note: note.clone(),
                    data,
                };
                if let Err(err) = session::send(&mut writer, &Envelope::Telemetry(telemetry)) {
                    warn!(%err, "peer gone on reply, stopping");
                    break;
                }
            }
            None => {
                debug!(step_id = command.step_id, "reply withheld");
                if !note.is_empty() {
                    note.push_str("; ");
                }
                note.push_str("reply withheld");
            }
        }

        log.append(&ActRow {
            step_id: command.step_id,
            t_act_recv_ns: t_act_recv,
            t_act_send_ns: t_act_send,
            missing_cmd,
            note,
        })?;
    }

    log.flush()?;
    Ok(())
}
