use std::io::{self, Read};

use crate::{Envelope, WireError};

/// Frame tag, big-endian on the wire.
pub const MAGIC: u32 = 0xFEED_BEEF;

/// Upper bound on a single payload, to bound decoder memory against a
/// corrupt or hostile length field.
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = 8;

/// Serialize one envelope into a ready-to-send frame:
/// `MAGIC(u32 BE) || LENGTH(u32 BE) || compact JSON payload`.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, WireError> {
    let payload = serde_json::to_vec(envelope).map_err(WireError::Encode)?;
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(WireError::Oversize(payload.len()));
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&MAGIC.to_be_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Read exactly one frame off `reader`.
///
/// No partial-frame state survives between calls; a stream that ends inside
/// a frame, or before its first byte, is a `ShortRead`.
pub fn decode_one<R: Read>(reader: &mut R) -> Result<Envelope, WireError> {
    let mut header = [0u8; HEADER_LEN];
    read_frame_bytes(reader, &mut header)?;

    let magic = u32::from_be_bytes(header[..4].try_into().unwrap());
    if magic != MAGIC {
        return Err(WireError::BadMagic(magic));
    }
    let len = u32::from_be_bytes(header[4..].try_into().unwrap()) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(WireError::Oversize(len));
    }

    let mut payload = vec![0u8; len];
    read_frame_bytes(reader, &mut payload)?;
    serde_json::from_slice(&payload).map_err(WireError::Decode)
}

fn read_frame_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), WireError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => WireError::ShortRead,
        _ => WireError::Io(e),
    })
}
