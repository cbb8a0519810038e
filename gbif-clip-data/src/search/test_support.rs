//! Test utilities for the HTTP occurrence source.
//!
//! [`CannedServer`] is a loopback HTTP/1.1 server that answers successive
//! connections with scripted responses and records each request target, so
//! [`HttpOccurrenceSource`](super::HttpOccurrenceSource) can be exercised
//! without reaching the public API.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

/// Search path served by [`CannedServer`].
pub const SEARCH_PATH: &str = "/v1/occurrence/search";

/// A scripted reply.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    status: u16,
    body: String,
    delay: Duration,
}

impl CannedResponse {
    /// `200 OK` with a JSON body.
    #[must_use]
    pub fn json(body: &Value) -> Self {
        Self::status(200, body.to_string())
    }

    /// Arbitrary status with a raw body.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// Wait `delay` before replying.
    #[must_use]
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Loopback server replying to one connection per scripted response.
///
/// # Example
///
/// ```
/// use gbif_clip_core::{OccurrenceSource, SpatialExtent};
/// use gbif_clip_data::HttpOccurrenceSource;
/// use gbif_clip_data::test_support::{CannedResponse, CannedServer, probe_body};
///
/// let server = CannedServer::start(vec![CannedResponse::json(&probe_body(42))])?;
/// let source = HttpOccurrenceSource::new(server.base_url())?;
/// let extent = SpatialExtent::new(0.0, 0.0, 1.0, 1.0)?;
///
/// assert_eq!(source.count(&extent)?, 42);
/// assert!(server.requests()[0].ends_with("&limit=0"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct CannedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CannedServer {
    /// Bind an ephemeral port and serve `responses` in order.
    ///
    /// Once the script is exhausted the listener closes, so later requests
    /// fail to connect.
    ///
    /// # Errors
    /// Returns an error if the loopback listener cannot be bound.
    pub fn start(responses: Vec<CannedResponse>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let address = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for response in responses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                if serve(stream, &response, &recorded).is_err() {
                    return;
                }
            }
        });
        Ok(Self {
            base_url: format!("http://{address}{SEARCH_PATH}"),
            requests,
        })
    }

    /// Search endpoint to configure the source with.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request targets (path and query) received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn serve(
    stream: TcpStream,
    response: &CannedResponse,
    requests: &Mutex<Vec<String>>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_owned();
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 || header == "\r\n" {
            break;
        }
    }
    requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(target);

    thread::sleep(response.delay);
    let mut writer = stream;
    write!(
        writer,
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    )?;
    writer.flush()
}

/// Probe response body reporting `count` matches.
#[must_use]
pub fn probe_body(count: i64) -> Value {
    json!({ "offset": 0, "limit": 0, "endOfRecords": false, "count": count, "results": [] })
}

/// Page response body holding `records`.
#[must_use]
pub fn page_body(records: Vec<Value>) -> Value {
    json!({ "endOfRecords": records.is_empty(), "results": records })
}

/// A located occurrence record with every attribute set.
#[must_use]
pub fn occurrence_json(id: u64, longitude: f64, latitude: f64) -> Value {
    json!({
        "gbifID": id.to_string(),
        "decimalLatitude": latitude,
        "decimalLongitude": longitude,
        "species": "Turdus merula",
        "country": "Germany",
        "eventDate": "2023-05-01",
        "catalogNumber": format!("OBS-{id}"),
        "identifiedBy": "A. Birder",
        "individualCount": 1,
    })
}
