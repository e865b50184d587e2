//! End-to-end tests against an in-process UDP responder on localhost

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use miio::{
    Device, DeviceConfig, DiscoveryConfig, DiscoverySet, Error, Frame, Request, Scanner, Token,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::net::UdpSocket;

const DEVICE_ID: u32 = 0x0AB1_C2D3;

#[derive(Clone, Copy)]
enum Mode {
    /// Answer requests with `{"method", "params"}` of the request
    Echo,
    /// Answer handshakes only
    IgnoreRequests,
}

fn token() -> Token {
    Token::from_hex("9f8e7d6c5b4a39281706f5e4d3c2b1a0").unwrap()
}

fn hello_reply(clock: u32, fingerprint: u8) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.put_u16(0x2131);
    buf.put_u16(32);
    buf.put_u32(0);
    buf.put_u32(DEVICE_ID);
    buf.put_u32(clock);
    buf.put_bytes(fingerprint, 16);
    buf
}

/// Spawn a responder speaking the device side of the protocol
///
/// Returns its address and a count of the handshakes it has received.
async fn spawn_device(device_token: Token, mode: Mode) -> (SocketAddr, Arc<AtomicUsize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let handshakes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handshakes);

    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        let mut clock = 5000u32;

        loop {
            let Ok((n, from)) = socket.recv_from(&mut buf).await else {
                break;
            };
            let data = &buf[..n];

            let reply = if data == &Frame::handshake()[..] {
                counter.fetch_add(1, Ordering::SeqCst);
                Some(hello_reply(clock, 0x00))
            } else if let Mode::IgnoreRequests = mode {
                None
            } else {
                clock += 1;
                let body = match Frame::decode(data, &device_token) {
                    Ok(frame) => {
                        let request: Request = serde_json::from_value(frame.body.unwrap()).unwrap();
                        json!({
                            "id": request.id,
                            "result": {"method": request.method, "params": request.params}
                        })
                    }
                    Err(_) => json!({"id": 0, "error": {"code": -1, "message": "bad frame"}}),
                };
                Some(Frame::encode(&body, DEVICE_ID, clock, &device_token).unwrap())
            };

            if let Some(reply) = reply {
                let _ = socket.send_to(&reply, from).await;
            }
        }
    });

    (addr, handshakes)
}

fn config(addr: SocketAddr) -> DeviceConfig {
    DeviceConfig::default()
        .with_port(addr.port())
        .with_timeout(Duration::from_millis(300))
}

#[tokio::test]
async fn test_send_over_udp() {
    let (addr, _) = spawn_device(token(), Mode::Echo).await;
    let mut device = Device::with_config("127.0.0.1", token(), config(addr));

    let result = device.send("get_prop", json!(["power"])).await.unwrap();
    assert_eq!(result, json!({"method": "get_prop", "params": ["power"]}));
    assert_eq!(device.device_id(), Some(DEVICE_ID));

    let result = device.send("set_power", json!(["on"])).await.unwrap();
    assert_eq!(result["method"], "set_power");
    assert_eq!(device.session().current_id(), 2);
    assert_eq!(device.session().last_device_timestamp(), 5002);
}

#[tokio::test]
async fn test_wrong_token_over_udp() {
    let (addr, _) = spawn_device(token(), Mode::Echo).await;
    let mut device = Device::with_config("127.0.0.1", Token::zero(), config(addr));

    let err = device.send("get_prop", json!(["power"])).await.unwrap_err();
    assert!(matches!(err, Error::InvalidToken { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_no_response_over_udp() {
    let (addr, _) = spawn_device(token(), Mode::IgnoreRequests).await;
    let mut device = Device::with_config(
        "127.0.0.1",
        token(),
        config(addr)
            .with_timeout(Duration::from_millis(100))
            .with_retry_count(1),
    );

    let err = device.send("get_prop", json!(["power"])).await.unwrap_err();
    assert!(matches!(err, Error::NoResponse { attempts: 2, .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_unreachable_over_udp() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = silent.local_addr().unwrap();

    let mut device = Device::with_config(
        "127.0.0.1",
        token(),
        config(addr).with_timeout(Duration::from_millis(50)),
    );

    let err = device.send_handshake().await.unwrap_err();
    assert!(matches!(err, Error::DeviceUnreachable { attempts: 3, .. }));
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_unicast_discovery() {
    let (addr, handshakes) = spawn_device(token(), Mode::Echo).await;
    let scanner = Scanner::new().with_timeout(Duration::from_millis(300));

    let device = scanner.unicast(addr).await.unwrap().unwrap();
    assert_eq!(device.addr, addr);
    assert_eq!(device.device_id, DEVICE_ID);
    assert!(!device.token_revealed());
    assert_eq!(handshakes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unicast_discovery_timeout() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let scanner = Scanner::new().with_timeout(Duration::from_millis(100));

    let found = scanner.unicast(silent.local_addr().unwrap()).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_broadcast_dedups_replies() {
    let (addr, handshakes) = spawn_device(token(), Mode::Echo).await;
    let scanner = Scanner::with_config(
        DiscoveryConfig::new()
            .with_broadcast_addr(addr)
            .with_timeout(Duration::from_millis(300)),
    );

    let mut seen = DiscoverySet::new();
    let mut reported = Vec::new();

    // Three handshakes go out, three replies come back, one device is new
    let new = scanner
        .broadcast_with(&mut seen, |device| reported.push(device.device_id))
        .await
        .unwrap();

    assert_eq!(handshakes.load(Ordering::SeqCst), 3);
    assert_eq!(new, 1);
    assert_eq!(reported, vec![DEVICE_ID]);
    assert_eq!(seen.len(), 1);

    // The accumulator carries over between scans
    let again = scanner.broadcast(&mut seen).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(handshakes.load(Ordering::SeqCst), 6);
    assert_eq!(seen.len(), 1);
}

#[tokio::test]
async fn test_broadcast_without_devices_is_empty() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let scanner = Scanner::with_config(
        DiscoveryConfig::new()
            .with_broadcast_addr(silent.local_addr().unwrap())
            .with_timeout(Duration::from_millis(150)),
    );

    let found = scanner.discover().await.unwrap();
    assert!(found.is_empty());
}
