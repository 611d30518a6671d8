//! Integration tests for the keep-alive scheduler.

mod common;

use common::{init_tracing, TestClient};
use gate::{Conduit, KeepAlive};
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_one_packet_per_interval() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut client = TestClient::connect(addr).await;
    let (server, _) = listener.accept().await.unwrap();
    let conduit = Conduit::new(server, Duration::from_secs(5)).unwrap();
    let (_reader, writer) = conduit.split();

    let mut keepalive = KeepAlive::attach_with_interval(writer, Duration::from_millis(150));

    let mut ids = Vec::new();
    for _ in 0..3 {
        let mut frame = client.recv_frame().await.expect("keep alive packet");
        assert_eq!(wire::read_varint(&mut frame).unwrap(), 0x1f);
        ids.push(wire::read_varint(&mut frame).unwrap());
    }
    // Fresh identifier per tick; three equal random ids would be a bug.
    assert!(!(ids[0] == ids[1] && ids[1] == ids[2]));

    keepalive.detach();
    // Nothing more arrives after detaching.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!client.at_eof().await);
    assert!(keepalive.is_finished());
}

#[tokio::test]
async fn test_schedule_cancels_on_inactive_connection() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _client = TestClient::connect(addr).await;
    let (server, _) = listener.accept().await.unwrap();
    let conduit = Conduit::new(server, Duration::from_secs(5)).unwrap();
    let (_reader, writer) = conduit.split();

    let keepalive = KeepAlive::attach_with_interval(writer.clone(), Duration::from_millis(100));
    writer.close().await.unwrap();
    assert!(!writer.is_active());

    // The next tick sees the dead connection and cancels itself.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(keepalive.is_finished());
}

#[tokio::test]
async fn test_independent_schedules_per_connection() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut first_client = TestClient::connect(addr).await;
    let (first_server, _) = listener.accept().await.unwrap();
    let mut second_client = TestClient::connect(addr).await;
    let (second_server, _) = listener.accept().await.unwrap();

    let (_first_reader, first_writer) =
        Conduit::new(first_server, Duration::from_secs(5)).unwrap().split();
    let (_second_reader, second_writer) =
        Conduit::new(second_server, Duration::from_secs(5)).unwrap().split();

    let mut first = KeepAlive::attach_with_interval(first_writer, Duration::from_millis(100));
    let _second = KeepAlive::attach_with_interval(second_writer, Duration::from_millis(100));

    assert!(first_client.recv_frame().await.is_some());
    assert!(second_client.recv_frame().await.is_some());

    // Detaching one schedule leaves the other ticking.
    first.detach();
    assert!(second_client.recv_frame().await.is_some());
}
