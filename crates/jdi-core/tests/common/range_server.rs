//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves one static body at any path. HEAD answers with Content-Length (and
//! Accept-Ranges when enabled); a GET with `Range: bytes=a-b` gets 206.
//! Every GET is logged with its requested range.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (servers that block HEAD).
    pub head_allowed: bool,
    /// If false, GET ignores Range and always returns 200 with the full body,
    /// and no `Accept-Ranges` header is sent.
    pub support_ranges: bool,
    /// Pause between 16 KiB writes, to keep transfers in flight.
    pub throttle: Option<Duration>,
    /// When set, every request without exactly this `Cookie` header gets 403.
    pub required_cookie: Option<&'static str>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            support_ranges: true,
            throttle: None,
            required_cookie: None,
        }
    }
}

pub struct RangeServer {
    base: String,
    gets: Arc<Mutex<Vec<Option<(u64, u64)>>>>,
}

impl RangeServer {
    /// URL of `name` on this server, e.g. "http://127.0.0.1:1234/data.bin".
    pub fn url(&self, name: &str) -> String {
        format!("{}{}", self.base, name)
    }

    /// Ranges of the GETs served so far (`None` for a plain GET), sorted.
    pub fn get_ranges(&self) -> Vec<Option<(u64, u64)>> {
        let mut v = self.gets.lock().unwrap().clone();
        v.sort();
        v
    }
}

/// Starts a server on a background thread; it runs until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let gets = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&gets);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &body, opts, &log));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        gets,
    }
}

fn handle(mut stream: TcpStream, body: &[u8], opts: RangeServerOptions, log: &Mutex<Vec<Option<(u64, u64)>>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (method, range) = parse_request(request);
    if let Some(expected) = opts.required_cookie {
        if header(request, "cookie") != Some(expected) {
            let _ = stream.write_all(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            return;
        }
    }
    let total = body.len() as u64;
    let accept_ranges = if opts.support_ranges { "Accept-Ranges: bytes\r\n" } else { "" };

    if method.eq_ignore_ascii_case("HEAD") {
        if !opts.head_allowed {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            return;
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {total}\r\n{accept_ranges}Connection: close\r\n\r\n"
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }

    let range = range.filter(|_| opts.support_ranges);
    log.lock().unwrap().push(range);
    let (status, extra, slice) = match range {
        None => ("200 OK", String::new(), body),
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl || start >= total {
                let response = format!(
                    "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{total}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = stream.write_all(response.as_bytes());
                return;
            }
            (
                "206 Partial Content",
                format!("Content-Range: bytes {start}-{end_incl}/{total}\r\n"),
                &body[start as usize..=end_incl as usize],
            )
        }
    };
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\n{extra}{accept_ranges}Connection: close\r\n\r\n",
        slice.len()
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    match opts.throttle {
        None => {
            let _ = stream.write_all(slice);
        }
        Some(pause) => {
            for piece in slice.chunks(16 * 1024) {
                if stream.write_all(piece).is_err() {
                    return;
                }
                thread::sleep(pause);
            }
        }
    }
}

fn header<'a>(request: &'a str, name: &str) -> Option<&'a str> {
    request
        .lines()
        .skip(1)
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(n, _)| n.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim())
}

/// Returns (method, optional (start, end_inclusive) for `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let method = lines
        .next()
        .and_then(|l| l.split_whitespace().next())
        .unwrap_or("");
    let range = lines
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("range"))
        .and_then(|(_, value)| {
            let spec = value.trim().strip_prefix("bytes=")?;
            let (a, b) = spec.split_once('-')?;
            let start = a.trim().parse().ok()?;
            let end = match b.trim() {
                "" => u64::MAX,
                e => e.parse().ok()?,
            };
            Some((start, end))
        });
    (method, range)
}
