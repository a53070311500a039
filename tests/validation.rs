//! Validation and rejection behavior over real sockets.

use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use tarpitd::patterns::PatternOverrides;

mod common;
use common::{start_pattern, unpaced};

/// A non-matching prefix gets no payload bytes, then a close inside the
/// documented punitive-delay window.
#[tokio::test]
async fn rejected_client_sees_silence_then_delayed_close() {
    let (addr, shutdown) = start_pattern("http_endless_header", unpaced()).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"DUCK").await.unwrap();

    let started = Instant::now();
    let mut leaked = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(45), client.read_to_end(&mut leaked)).await;
    let elapsed = started.elapsed();

    assert!(read.is_ok(), "close never arrived");
    assert!(leaked.is_empty(), "payload leaked to rejected client: {:?}", leaked);
    assert!(
        elapsed >= Duration::from_secs(15),
        "closed too fast: {:?}",
        elapsed
    );
    assert!(
        elapsed < Duration::from_secs(40),
        "closed too slow: {:?}",
        elapsed
    );

    shutdown.trigger();
}

/// A probe that sends nothing at an SSH tarpit still gets the banner it
/// was waiting for, and nothing else.
#[tokio::test]
async fn silent_ssh_probe_is_baited_with_banner() {
    let (addr, shutdown) = start_pattern("ssh_trans_hold", unpaced()).await;

    let mut client = TcpStream::connect(addr).await.unwrap();

    // Validator read window is 5s; the banner lands right after it.
    let mut ident = [0u8; 4];
    tokio::time::timeout(Duration::from_secs(10), client.read_exact(&mut ident))
        .await
        .expect("no banner within the validation window")
        .unwrap();
    assert_eq!(&ident, b"SSH-");

    shutdown.trigger();
}

/// Validation off means every client is served, protocol speaker or not.
#[tokio::test]
async fn disabled_validation_serves_anything() {
    let overrides = PatternOverrides {
        rate_limit: Some(0),
        client_validation: Some(false),
        ..Default::default()
    };
    let (addr, shutdown) = start_pattern("http_endless_header", overrides).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"DUCK").await.unwrap();

    let mut status = [0u8; 4];
    tokio::time::timeout(Duration::from_secs(5), client.read_exact(&mut status))
        .await
        .expect("no payload despite disabled validation")
        .unwrap();
    assert_eq!(&status, b"HTTP");

    shutdown.trigger();
}
