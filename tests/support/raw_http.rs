//! One-shot HTTP responder over a plain `TcpListener`.
//!
//! wiremock always frames bodies with `Content-Length`; this writes the
//! response bytes verbatim so tests can send close-delimited or truncated
//! bodies.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener};
use std::thread::{self, JoinHandle};

use super::socket_guard::should_skip_socket_bound_test;

/// Serves `head` then `body` to the first connection and closes it.
/// Returns the base URL, or `None` when localhost cannot be bound.
#[allow(dead_code)]
pub fn serve_once(head: String, body: Vec<u8>) -> Option<(String, JoinHandle<()>)> {
    if should_skip_socket_bound_test() {
        return None;
    }
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind raw responder");
    let base_url = format!("http://{}", listener.local_addr().expect("local addr"));

    let server = thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body);
        let _ = stream.flush();
        let _ = stream.shutdown(Shutdown::Write);
    });

    Some((base_url, server))
}
