use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("stream ended mid-frame")]
    ShortRead,
    #[error("bad frame magic {0:#010x}")]
    BadMagic(u32),
    #[error("frame payload of {0} bytes exceeds the cap")]
    Oversize(usize),
    #[error("encode payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("decode payload: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("connect {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("accept: {0}")]
    Accept(#[source] io::Error),
    #[error("send: {0}")]
    Send(#[source] io::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
