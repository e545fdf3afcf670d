//! Loopback HTTP fixture for exercising the login and submission protocol
//! against canned responses.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Overall budget for a stub to receive all of its expected requests.
const SERVE_DEADLINE: Duration = Duration::from_secs(10);

/// One-shot HTTP server that answers a fixed sequence of canned responses,
/// one per connection, and records every raw request it saw. Spawn it with
/// exactly as many responses as the code under test is expected to send
/// requests; `finish` then returns the recorded requests for assertions.
pub(crate) struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Renders a canned HTTP/1.1 response with the given status, extra
    /// header lines and body.
    pub(crate) fn response(status: u16, headers: &[&str], body: &str) -> String {
        let reason = match status {
            200 => "OK",
            403 => "Forbidden",
            500 => "Internal Server Error",
            _ => "Other",
        };
        let mut response = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            status,
            reason,
            body.len()
        );
        for header in headers {
            response.push_str(header);
            response.push_str("\r\n");
        }
        response.push_str("\r\n");
        response.push_str(body);
        response
    }

    pub(crate) fn spawn(responses: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        listener
            .set_nonblocking(true)
            .expect("set listener nonblocking");
        let addr = listener.local_addr().expect("listener address");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            let deadline = Instant::now() + SERVE_DEADLINE;
            for response in responses {
                let mut stream = match accept_until(&listener, deadline) {
                    Some(stream) => stream,
                    None => return,
                };
                let request = read_request(&mut stream);
                seen.lock().unwrap().push(request);
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        StubServer {
            addr,
            requests,
            handle,
        }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Waits for the canned responses to be consumed and returns the raw
    /// requests the server saw, in order.
    pub(crate) fn finish(self) -> Vec<String> {
        let _ = self.handle.join();
        let requests = self.requests.lock().unwrap();
        requests.clone()
    }
}

/// ASCII case-insensitive `contains`, for header assertions: the HTTP client
/// is free to emit header names in any case.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

fn accept_until(listener: &TcpListener, deadline: Instant) -> Option<TcpStream> {
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false).ok();
                return Some(stream);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() > deadline {
                    return None;
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(_) => return None,
        }
    }
}

/// Reads one HTTP request: headers, then as many body bytes as the
/// Content-Length header announces.
fn read_request(stream: &mut TcpStream) -> String {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let headers_end = loop {
        match stream.read(&mut chunk) {
            Ok(0) => break None,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = find_terminator(&buf) {
                    break Some(pos);
                }
            }
            Err(_) => break None,
        }
    };

    if let Some(pos) = headers_end {
        let header_text = String::from_utf8_lossy(&buf[..pos]).into_owned();
        let content_length = header_text
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.trim().eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);

        let expected = pos + 4 + content_length;
        while buf.len() < expected {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(_) => break,
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}
