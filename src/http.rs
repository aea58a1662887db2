use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use tracing::{info, warn};

use crate::error::{Result, ScrapeError};
use crate::settings::HttpSettings;

/// Statuses worth another attempt.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
/// Statuses whose `Retry-After` header is honoured.
pub const RETRY_AFTER_STATUSES: [u16; 2] = [429, 503];

/// Anything that can GET a URL and hand back the body.
pub trait Fetch {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<String>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        (**self).get(url, params)
    }
}

pub fn is_transient(status: u16) -> bool {
    RETRY_STATUSES.contains(&status)
}

/// Sleep before retry number `attempt + 1`: `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// `Retry-After` as delta-seconds or an HTTP date. Dates in the past give zero.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

fn retry_after(response: &Response) -> Option<Duration> {
    if !RETRY_AFTER_STATUSES.contains(&response.status().as_u16()) {
        return None;
    }
    let value = response.headers().get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, Utc::now())
}

/// Blocking client with bounded retry on transient failures.
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    backoff: Duration,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;
        Ok(HttpClient {
            client,
            max_retries: settings.max_retries,
            backoff: Duration::from_millis(settings.backoff_ms),
        })
    }

    /// Back off, but never for less than the server asked.
    fn wait(&self, url: &str, attempt: u32, reason: &str, requested: Option<Duration>) {
        let delay = backoff_delay(self.backoff, attempt).max(requested.unwrap_or_default());
        warn!(
            "{} on {} (attempt {}/{}), backing off {:.1}s",
            reason,
            url,
            attempt + 1,
            self.max_retries,
            delay.as_secs_f64()
        );
        std::thread::sleep(delay);
    }
}

impl Fetch for HttpClient {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut attempt = 0;
        loop {
            let mut request = self.client.get(url);
            if !params.is_empty() {
                request = request.query(params);
            }

            let response = match request.send() {
                Ok(r) => r,
                Err(e) if attempt < self.max_retries && (e.is_connect() || e.is_timeout()) => {
                    self.wait(url, attempt, "Connection failed", None);
                    attempt += 1;
                    continue;
                }
                Err(source) => {
                    return Err(ScrapeError::Request {
                        url: url.to_string(),
                        source,
                    })
                }
            };

            let status = response.status().as_u16();
            info!("GET {} → {}", response.url(), status);

            if is_transient(status) && attempt < self.max_retries {
                self.wait(url, attempt, &format!("HTTP {}", status), retry_after(&response));
                attempt += 1;
                continue;
            }
            if !response.status().is_success() {
                return Err(ScrapeError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            return response.text().map_err(|source| ScrapeError::Request {
                url: url.to_string(),
                source,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use chrono::TimeZone;

    fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        serve_with_headers(responses.into_iter().map(|(status, body)| (status, "", body)).collect())
    }

    /// Serve one canned `(status, extra headers, body)` per connection, in order.
    fn serve_with_headers(responses: Vec<(u16, &'static str, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        thread::spawn(move || {
            for (status, headers, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else { return };
                let mut buf = [0u8; 4096];
                let mut request = Vec::new();
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = format!(
                    "HTTP/1.1 {} X\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    headers,
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes());
            }
        });

        (format!("http://{}/jobs", addr), hits)
    }

    fn client(max_retries: u32) -> HttpClient {
        HttpClient::new(&HttpSettings {
            max_retries,
            backoff_ms: 1,
            timeout_secs: 5,
            ..HttpSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn transient_statuses() {
        for s in [429, 500, 502, 503, 504] {
            assert!(is_transient(s));
        }
        for s in [200, 301, 400, 403, 404, 501] {
            assert!(!is_transient(s));
        }
    }

    #[test]
    fn backoff_doubles() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(2000));
    }

    #[test]
    fn retries_transient_then_succeeds() {
        let (url, hits) = serve(vec![(503, ""), (502, ""), (200, "ok")]);
        let body = client(3).get(&url, &[]).unwrap();
        assert_eq!(body, "ok");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausted_retries_surface_status() {
        let (url, hits) = serve(vec![(500, ""), (500, ""), (500, "")]);
        let err = client(2).get(&url, &[]).unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 500, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retry_after_values() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(parse_retry_after("120", now), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 0 ", now), Some(Duration::ZERO));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("soon", now), None);
        assert_eq!(parse_retry_after("-5", now), None);
    }

    #[test]
    fn retry_after_outranks_short_backoff() {
        let (url, hits) = serve_with_headers(vec![(503, "Retry-After: 1\r\n", ""), (200, "", "ok")]);
        let started = Instant::now();
        let body = client(3).get(&url, &[]).unwrap();
        assert_eq!(body, "ok");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[test]
    fn retry_after_ignored_on_plain_server_errors() {
        let (url, _) = serve_with_headers(vec![(500, "Retry-After: 30\r\n", ""), (200, "", "ok")]);
        let started = Instant::now();
        assert_eq!(client(3).get(&url, &[]).unwrap(), "ok");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn client_errors_are_not_retried() {
        let (url, hits) = serve(vec![(404, "gone"), (200, "late")]);
        let err = client(3).get(&url, &[]).unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 404, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn refused_connection_is_a_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client(0).get(&format!("http://{}/", addr), &[]).unwrap_err();
        assert!(matches!(err, ScrapeError::Request { .. }));
    }
}
