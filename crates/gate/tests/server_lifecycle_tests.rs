//! Lifecycle tests for the listening server. These run outside any async
//! context because the server owns its own runtimes.

mod common;

use common::{init_tracing, offline_context};
use gate::{GateConfig, GateServer};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

fn ephemeral_config() -> GateConfig {
    GateConfig {
        port: 0,
        read_timeout: Duration::from_secs(5),
    }
}

#[test]
fn test_start_serve_and_shutdown() {
    init_tracing();
    let context = offline_context();
    let mut server = GateServer::new(ephemeral_config(), context.services.clone());
    let addr = server.start().unwrap();
    assert!(server.is_started());

    // A legacy probe exercises the whole stack through both groups.
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream.write_all(&[0xfe]).unwrap();
    let mut marker = [0u8; 1];
    stream.read_exact(&mut marker).unwrap();
    assert_eq!(marker[0], 0xff);

    server.shutdown();
    assert!(!server.is_started());
    // Idempotent.
    server.shutdown();
}

#[test]
fn test_double_start_is_an_error() {
    init_tracing();
    let context = offline_context();
    let mut server = GateServer::new(ephemeral_config(), context.services.clone());
    server.start().unwrap();
    let error = server.start().unwrap_err();
    assert!(error.is_config());
    server.shutdown();
}

#[test]
fn test_bind_failure_aborts_startup() {
    init_tracing();
    let context = offline_context();
    let mut first = GateServer::new(ephemeral_config(), context.services.clone());
    let addr = first.start().unwrap();

    let mut second = GateServer::new(
        GateConfig {
            port: addr.port(),
            read_timeout: Duration::from_secs(5),
        },
        context.services.clone(),
    );
    assert!(second.start().is_err());
    assert!(!second.is_started());

    first.shutdown();
}

#[test]
fn test_io_handle_outlives_connections() {
    init_tracing();
    let context = offline_context();
    let mut server = GateServer::new(ephemeral_config(), context.services.clone());
    server.start().unwrap();

    // Auxiliary work schedules onto the I/O group through the handle.
    let handle = server.io_handle().unwrap();
    let value = handle.block_on(async { 6 * 7 });
    assert_eq!(value, 42);

    server.shutdown();
    assert!(server.io_handle().is_err());
}

#[test]
fn test_accept_stops_after_shutdown() {
    init_tracing();
    let context = offline_context();
    let mut server = GateServer::new(ephemeral_config(), context.services.clone());
    let addr = server.start().unwrap();
    server.shutdown();

    assert!(TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_err());
}
