//! GS4 query protocol, used only to list online player names.

use super::slp::{PingError, ServerAddress};
use std::time::Duration;
use tokio::{net::UdpSocket, time};
use tracing::debug;

const MAGIC: [u8; 2] = [0xFE, 0xFD];
const TYPE_HANDSHAKE: u8 = 0x09;
const TYPE_STAT: u8 = 0x00;
const SESSION_MASK: u32 = 0x0F0F_0F0F;
const KV_PADDING: usize = 11;
const PLAYER_PADDING: usize = 10;

pub async fn players(addr: &ServerAddress, timeout: Duration) -> Result<Vec<String>, PingError> {
    let target = time::timeout(timeout, tokio::net::lookup_host((addr.host.as_str(), addr.port)))
        .await
        .map_err(|_| PingError::Timeout)??
        .next()
        .ok_or_else(|| PingError::Protocol(format!("could not resolve {}", addr.host)))?;

    let bind = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect(target).await?;

    let session = fastrand::u32(..) & SESSION_MASK;
    time::timeout(timeout, full_stat(&socket, session))
        .await
        .map_err(|_| PingError::Timeout)?
}

async fn full_stat(socket: &UdpSocket, session: u32) -> Result<Vec<String>, PingError> {
    let mut buf = vec![0u8; 65_535];

    socket.send(&request(TYPE_HANDSHAKE, session, &[])).await?;
    let len = socket.recv(&mut buf).await?;
    let token = parse_challenge(&buf[..len], session)?;
    debug!("Query challenge token {}", token);

    let mut body = token.to_be_bytes().to_vec();
    body.extend_from_slice(&[0, 0, 0, 0]);
    socket.send(&request(TYPE_STAT, session, &body)).await?;
    let len = socket.recv(&mut buf).await?;
    parse_full_stat(&buf[..len], session)
}

fn request(kind: u8, session: u32, body: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(7 + body.len());
    packet.extend_from_slice(&MAGIC);
    packet.push(kind);
    packet.extend_from_slice(&session.to_be_bytes());
    packet.extend_from_slice(body);
    packet
}

fn strip_header<'a>(packet: &'a [u8], kind: u8, session: u32) -> Result<&'a [u8], PingError> {
    if packet.len() < 5 || packet[0] != kind {
        return Err(PingError::Protocol("unexpected query response".into()));
    }
    if packet[1..5] != session.to_be_bytes() {
        return Err(PingError::Protocol("session id mismatch".into()));
    }
    Ok(&packet[5..])
}

fn read_cstr<'a>(cursor: &mut &'a [u8]) -> Option<&'a [u8]> {
    let end = cursor.iter().position(|&b| b == 0)?;
    let (value, rest) = cursor.split_at(end);
    *cursor = &rest[1..];
    Some(value)
}

fn parse_challenge(packet: &[u8], session: u32) -> Result<i32, PingError> {
    let mut cursor = strip_header(packet, TYPE_HANDSHAKE, session)?;
    let token = read_cstr(&mut cursor)
        .and_then(|raw| std::str::from_utf8(raw).ok())
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or_else(|| PingError::Protocol("bad challenge token".into()))?;
    Ok(token as i32)
}

fn parse_full_stat(packet: &[u8], session: u32) -> Result<Vec<String>, PingError> {
    let body = strip_header(packet, TYPE_STAT, session)?;
    let mut cursor = body
        .get(KV_PADDING..)
        .ok_or_else(|| PingError::Protocol("truncated stat response".into()))?;

    loop {
        let key = read_cstr(&mut cursor)
            .ok_or_else(|| PingError::Protocol("unterminated key".into()))?;
        if key.is_empty() {
            break;
        }
        read_cstr(&mut cursor).ok_or_else(|| PingError::Protocol("unterminated value".into()))?;
    }

    let mut cursor = cursor
        .get(PLAYER_PADDING..)
        .ok_or_else(|| PingError::Protocol("missing player section".into()))?;

    let mut names = Vec::new();
    while let Some(name) = read_cstr(&mut cursor) {
        if name.is_empty() {
            break;
        }
        names.push(String::from_utf8_lossy(name).into_owned());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat_response(session: u32, players: &[&str]) -> Vec<u8> {
        let mut packet = vec![TYPE_STAT];
        packet.extend_from_slice(&session.to_be_bytes());
        packet.extend_from_slice(b"splitnum\0\x80\0");
        for (k, v) in [("hostname", "A Server"), ("numplayers", "2"), ("maxplayers", "20")] {
            packet.extend_from_slice(k.as_bytes());
            packet.push(0);
            packet.extend_from_slice(v.as_bytes());
            packet.push(0);
        }
        packet.push(0);
        packet.extend_from_slice(b"\x01player_\0\0");
        for name in players {
            packet.extend_from_slice(name.as_bytes());
            packet.push(0);
        }
        packet.push(0);
        packet
    }

    #[test]
    fn parses_player_section() {
        let names = parse_full_stat(&stat_response(7, &["Steve", "Alex"]), 7).unwrap();
        assert_eq!(names, vec!["Steve", "Alex"]);

        let names = parse_full_stat(&stat_response(7, &[]), 7).unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn rejects_wrong_session_and_truncation() {
        assert!(parse_full_stat(&stat_response(7, &["Steve"]), 8).is_err());
        assert!(parse_full_stat(&[TYPE_STAT, 0, 0, 0, 7, b's'], 7).is_err());
    }

    #[test]
    fn parses_negative_challenge() {
        let mut packet = vec![TYPE_HANDSHAKE, 0, 0, 0, 1];
        packet.extend_from_slice(b"-1234\0");
        assert_eq!(parse_challenge(&packet, 1).unwrap(), -1234);
    }

    #[tokio::test]
    async fn queries_local_server() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..3], &[0xFE, 0xFD, TYPE_HANDSHAKE]);
            let session = u32::from_be_bytes(buf[3..7].try_into().unwrap());
            assert_eq!(len, 7);

            let mut challenge = vec![TYPE_HANDSHAKE];
            challenge.extend_from_slice(&session.to_be_bytes());
            challenge.extend_from_slice(b"9513307\0");
            server.send_to(&challenge, peer).await.unwrap();

            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(len, 15);
            assert_eq!(&buf[7..11], &9_513_307i32.to_be_bytes());
            server
                .send_to(&stat_response(session, &["Notch"]), peer)
                .await
                .unwrap();
        });

        let addr = ServerAddress { host: "127.0.0.1".into(), port };
        let names = players(&addr, Duration::from_secs(5)).await.unwrap();
        assert_eq!(names, vec!["Notch"]);
    }
}
