use extractor::CalaisClient;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

/// Answer a single request with a canned raw HTTP response, then hang up.
fn serve_once(response: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !received.ends_with(b"hello") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        stream.write_all(response.as_bytes()).unwrap();
    });
    format!("http://{addr}/tag")
}

fn annotate(endpoint: String) -> anyhow::Result<String> {
    let client = CalaisClient::new("key", Duration::from_secs(5)).unwrap().with_endpoint(endpoint);
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    runtime.block_on(client.annotate("hello".to_string()))
}

#[test]
fn returns_body_on_success() {
    let endpoint = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}");
    assert_eq!(annotate(endpoint).unwrap(), "{}");
}

#[test]
fn error_status_carries_body() {
    let endpoint = serve_once("HTTP/1.1 403 Forbidden\r\nContent-Length: 11\r\nConnection: close\r\n\r\nbad api key");
    let err = annotate(endpoint).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("403"), "{message}");
    assert!(message.contains("bad api key"), "{message}");
}

#[test]
fn truncated_body_is_an_error() {
    let endpoint = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n{\"doc\"");
    let err = annotate(endpoint).unwrap_err();
    assert!(format!("{err:#}").contains("reading Calais response body"), "{err:#}");
}
