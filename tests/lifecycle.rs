//! Start/stop lifecycle of the embedded service.

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{Request, Response};
use http_front::{ConfigurationError, HttpService, LifecycleState, RouterError, ServiceError};

mod common;

use common::CountingEcho;

fn service() -> HttpService {
    common::builder().router(CountingEcho::default()).build().unwrap()
}

#[test]
fn test_build_without_router_fails() {
    let err = HttpService::builder().port(0).build().unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingRouter));
}

#[test]
fn test_bind_address_reports_the_listening_socket() {
    let running = common::start(service());

    assert_eq!(running.service.state(), LifecycleState::Running);
    assert_eq!(running.service.bind_address(), running.addr);
    assert_ne!(running.addr.port(), 0);
    TcpStream::connect(running.addr).expect("service should accept connections");

    running.stop().unwrap();
}

#[test]
fn test_stop_before_start_is_safe() {
    let service = service();
    service.stop();
    assert_eq!(service.state(), LifecycleState::Stopped);

    let err = service.start().unwrap_err();
    assert!(matches!(err, ServiceError::IllegalState { .. }));
    assert_eq!(service.state(), LifecycleState::Stopped);
}

#[test]
fn test_stop_is_idempotent() {
    let running = common::start(service());
    let service = running.service.clone();

    running.stop().unwrap();
    service.stop();
    service.stop();
    assert_eq!(service.state(), LifecycleState::Stopped);
}

#[test]
fn test_immediate_stop_from_another_thread() {
    let service = service();
    let runner = service.clone();
    let handle = std::thread::spawn(move || runner.start());

    while service.state() == LifecycleState::Created {
        std::thread::yield_now();
    }
    service.stop();

    let outcome = handle.join().unwrap();
    assert!(outcome.is_ok(), "start returned {outcome:?}");
    assert_eq!(service.state(), LifecycleState::Stopped);
    assert_eq!(service.active_connections(), 0);
}

#[test]
fn test_no_connections_after_stop() {
    let running = common::start(service());
    let addr = running.addr;
    running.stop().unwrap();

    assert!(TcpStream::connect_timeout(&addr, Duration::from_secs(1)).is_err());
}

#[test]
fn test_stop_drains_idle_connections() {
    use std::io::{Read, Write};

    let running = common::start(service());
    let mut stream = TcpStream::connect(running.addr).unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
        .unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).unwrap();
    assert!(buf[..n].starts_with(b"HTTP/1.1 200"));

    let service = running.service.clone();
    assert_eq!(service.active_connections(), 1);
    running.stop().unwrap();
    assert_eq!(service.active_connections(), 0);

    // The idle keep-alive connection was closed by the server.
    let mut rest = Vec::new();
    let _ = stream.read_to_end(&mut rest);
}

fn wait_for(flag: &AtomicBool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !flag.load(Ordering::SeqCst) {
        assert!(Instant::now() < deadline, "router was never entered");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_stop_lets_in_flight_request_finish() {
    use std::io::{Read, Write};

    let entered = Arc::new(AtomicBool::new(false));
    let flag = entered.clone();
    let service = common::builder()
        .router(move |_request: Request<Bytes>| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok::<_, RouterError>(Response::new(Bytes::from_static(b"late")))
            }
        })
        .build()
        .unwrap();
    let running = common::start(service);

    let addr = running.addr;
    let client = std::thread::spawn(move || {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
            .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
            .unwrap();
        let mut response = Vec::new();
        let _ = stream.read_to_end(&mut response);
        response
    });

    wait_for(&entered);
    running.stop().unwrap();

    let response = client.join().unwrap();
    assert!(
        response.starts_with(b"HTTP/1.1 200"),
        "got {:?}",
        String::from_utf8_lossy(&response)
    );
    assert!(response.ends_with(b"late"));
}

#[test]
fn test_stop_is_bounded_by_grace_period() {
    use std::io::Write;

    let entered = Arc::new(AtomicBool::new(false));
    let flag = entered.clone();
    let service = common::builder()
        .shutdown_grace_period(Duration::from_millis(300))
        .router(move |_request: Request<Bytes>| {
            let flag = flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
                // Holds a worker thread hostage, not just the task.
                std::thread::sleep(Duration::from_secs(10));
                Ok::<_, RouterError>(Response::new(Bytes::new()))
            }
        })
        .build()
        .unwrap();
    let running = common::start(service);

    let mut stream = TcpStream::connect(running.addr).unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
        .unwrap();
    wait_for(&entered);

    let started = Instant::now();
    let service = running.service.clone();
    let outcome = running.stop();
    let elapsed = started.elapsed();

    assert!(outcome.is_ok(), "start returned {outcome:?}");
    assert_eq!(service.state(), LifecycleState::Stopped);
    assert!(elapsed < Duration::from_millis(900), "stop took {elapsed:?}");
}

#[test]
fn test_bind_failure_is_reported() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let service = common::builder()
        .port(port)
        .router(CountingEcho::default())
        .build()
        .unwrap();
    let err = service.start().unwrap_err();

    assert!(matches!(err, ServiceError::Bind { .. }), "got {err:?}");
    assert_eq!(service.state(), LifecycleState::StartFailed);
    // Stopping a failed service is a no-op.
    service.stop();
    assert_eq!(service.state(), LifecycleState::StartFailed);
}

#[test]
fn test_second_start_is_rejected() {
    let running = common::start(service());

    let err = running.service.start().unwrap_err();
    assert!(matches!(
        err,
        ServiceError::IllegalState {
            state: LifecycleState::Running,
            ..
        }
    ));

    running.stop().unwrap();
}

#[tokio::test]
async fn test_start_inside_runtime_is_rejected() {
    let service = service();
    let err = service.start().unwrap_err();
    assert!(matches!(err, ServiceError::IllegalState { .. }));
    assert_eq!(service.state(), LifecycleState::Created);
}

#[test]
fn test_service_built_from_settings_file() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        host = "127.0.0.1"
        port = 0
        acceptor_threads = 1
        worker_threads = 2
        shutdown_grace_secs = 1
        max_aggregated_request_bytes = 65536
        "#
    )
    .unwrap();

    let settings = http_front::config::load_settings(file.path()).unwrap();
    let service = http_front::ServiceBuilder::from_settings(&settings)
        .router(CountingEcho::default())
        .build()
        .unwrap();
    assert_eq!(service.configuration().max_aggregated_request_bytes(), 65536);

    let running = common::start(service);
    TcpStream::connect(running.addr).unwrap();
    running.stop().unwrap();
}
