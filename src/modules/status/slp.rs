//! Java edition Server List Ping.
//!
//! Frames are `VarInt length | VarInt packet id | payload`. We send a handshake
//! with next-state 1 followed by an empty status request and read back a single
//! status response carrying a JSON document.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time,
};
use tracing::debug;

pub const DEFAULT_PORT: u16 = 25565;
const PROTOCOL_VERSION: i32 = 47;
const MAX_PACKET_LEN: usize = 4 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum PingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out")]
    Timeout,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("invalid status JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    /// Splits `host[:port]`. Anything that doesn't end in a valid port is taken
    /// as a bare host, so bad input fails at connect time.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();

        if let Some(rest) = input.strip_prefix('[') {
            if let Some((host, tail)) = rest.split_once(']') {
                let port = tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_PORT);
                return Self {
                    host: host.to_string(),
                    port,
                };
            }
        }

        match input.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => match port.parse() {
                Ok(port) => Self {
                    host: host.to_string(),
                    port,
                },
                Err(_) => Self {
                    host: input.to_string(),
                    port: DEFAULT_PORT,
                },
            },
            _ => Self {
                host: input.to_string(),
                port: DEFAULT_PORT,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerStatus {
    pub version: String,
    pub online: i64,
    pub max: i64,
    pub motd: String,
    pub sample: Vec<String>,
}

#[derive(Deserialize)]
struct RawStatus {
    #[serde(default)]
    version: RawVersion,
    #[serde(default)]
    players: RawPlayers,
    #[serde(default)]
    description: Value,
}

#[derive(Deserialize, Default)]
struct RawVersion {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize, Default)]
struct RawPlayers {
    #[serde(default)]
    online: i64,
    #[serde(default)]
    max: i64,
    #[serde(default)]
    sample: Vec<RawSample>,
}

#[derive(Deserialize)]
struct RawSample {
    name: String,
}

impl From<RawStatus> for ServerStatus {
    fn from(raw: RawStatus) -> Self {
        Self {
            version: raw.version.name,
            online: raw.players.online,
            max: raw.players.max,
            motd: clean_motd(&raw.description),
            sample: raw.players.sample.into_iter().map(|s| s.name).collect(),
        }
    }
}

pub async fn status(addr: &ServerAddress, timeout: Duration) -> Result<ServerStatus, PingError> {
    let mut stream = time::timeout(timeout, TcpStream::connect((addr.host.as_str(), addr.port)))
        .await
        .map_err(|_| PingError::Timeout)??;
    debug!("Connected to {}:{}", addr.host, addr.port);

    time::timeout(timeout, exchange(&mut stream, addr))
        .await
        .map_err(|_| PingError::Timeout)?
}

async fn exchange<S>(stream: &mut S, addr: &ServerAddress) -> Result<ServerStatus, PingError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut handshake = Vec::with_capacity(addr.host.len() + 16);
    write_varint(&mut handshake, 0x00);
    write_varint(&mut handshake, PROTOCOL_VERSION);
    write_string(&mut handshake, &addr.host);
    handshake.extend_from_slice(&addr.port.to_be_bytes());
    write_varint(&mut handshake, 1);

    write_packet(stream, &handshake).await?;
    write_packet(stream, &[0x00]).await?;
    stream.flush().await?;

    let payload = read_packet(stream).await?;
    let mut cursor = payload.as_slice();
    let id = read_varint(&mut cursor)?;
    if id != 0x00 {
        return Err(PingError::Protocol(format!("unexpected packet id {id:#x}")));
    }
    let json = read_string(&mut cursor)?;

    let raw: RawStatus = serde_json::from_str(&json)?;
    Ok(raw.into())
}

/// Flattens a chat component (or plain string) into text with `§` codes removed.
pub fn clean_motd(description: &Value) -> String {
    fn flatten(value: &Value, out: &mut String) {
        match value {
            Value::String(s) => out.push_str(s),
            Value::Array(parts) => parts.iter().for_each(|p| flatten(p, out)),
            Value::Object(map) => {
                if let Some(Value::String(text)) = map.get("text") {
                    out.push_str(text);
                }
                if let Some(extra) = map.get("extra") {
                    flatten(extra, out);
                }
            }
            _ => {}
        }
    }

    let mut raw = String::new();
    flatten(description, &mut raw);

    let mut clean = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            clean.push(c);
        }
    }
    clean.trim().to_string()
}

pub(crate) fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7F == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
}

fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_varint(buf, value.len() as i32);
    buf.extend_from_slice(value.as_bytes());
}

pub(crate) fn read_varint(cursor: &mut &[u8]) -> Result<i32, PingError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let (&byte, rest) = cursor
            .split_first()
            .ok_or_else(|| PingError::Protocol("truncated VarInt".into()))?;
        *cursor = rest;
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(PingError::Protocol("VarInt too long".into()))
}

fn read_string(cursor: &mut &[u8]) -> Result<String, PingError> {
    let len = usize::try_from(read_varint(cursor)?)
        .map_err(|_| PingError::Protocol("negative string length".into()))?;
    if cursor.len() < len {
        return Err(PingError::Protocol("truncated string".into()));
    }
    let (bytes, rest) = cursor.split_at(len);
    *cursor = rest;
    String::from_utf8(bytes.to_vec()).map_err(|e| PingError::Protocol(e.to_string()))
}

async fn read_stream_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, PingError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let byte = reader.read_u8().await?;
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(PingError::Protocol("VarInt too long".into()))
}

pub(crate) async fn write_packet<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), PingError> {
    let mut frame = Vec::with_capacity(payload.len() + 5);
    write_varint(&mut frame, payload.len() as i32);
    frame.extend_from_slice(payload);
    writer.write_all(&frame).await?;
    Ok(())
}

pub(crate) async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, PingError> {
    let len = usize::try_from(read_stream_varint(reader).await?)
        .map_err(|_| PingError::Protocol("negative packet length".into()))?;
    if len == 0 || len > MAX_PACKET_LEN {
        return Err(PingError::Protocol(format!("bad packet length {len}")));
    }
    let mut payload = vec![0; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
