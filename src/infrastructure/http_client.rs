//! HTTP client for scraping listing and detail pages
//!
//! Two request profiles are supported. `Plain` sends a realistic desktop
//! header set. `Browser` adds client hints and `Sec-Fetch-*` headers, keeps a
//! cookie jar, and recognises anti-bot challenge pages: on a challenge it
//! visits the site root once to pick up clearance cookies and retries.
//!
//! A client is a single session. [`HttpClientFactory`] builds a fresh one for
//! every scrape call so cookies never leak between calls.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::{ClientProfile, FetchResult, FetcherFactory, PageFetcher};
use crate::infrastructure::fetch_error::{FetchError, FetchOutcome};

/// Markers of an interstitial served with a 403/503 status
const CHALLENGE_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "cf-challenge",
    "cf-turnstile",
    "checking your browser",
    "just a moment",
    "please wait while we verify",
    "enable javascript and cookies to continue",
    "challenge-platform",
    "cf-chl-bypass",
    "cloudflare ray id",
    "verify you are human",
];

/// Markers strong enough to flag a 2xx page; protected sites embed
/// `challenge-platform` scripts in ordinary pages too
const STRONG_CHALLENGE_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "cf-chl-bypass",
    "checking your browser",
    "<title>just a moment",
    "enable javascript and cookies to continue",
];

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0",
];

/// Configuration for HTTP client behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Attempts per fetch, including the first one
    pub max_attempts: u32,
    /// Base delay of the exponential backoff
    pub retry_base_delay_ms: u64,
    /// Pool a session picks its user agent from
    pub user_agents: Vec<String>,
    pub max_redirects: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            max_attempts: 2,
            retry_base_delay_ms: 1000,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            max_redirects: 10,
        }
    }
}

impl HttpClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Delay before attempt `attempt + 1`; a server-supplied Retry-After wins when longer
    pub fn backoff_delay(&self, attempt: u32, retry_after_seconds: Option<u64>) -> Duration {
        let exponential = self
            .retry_base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
        let requested = retry_after_seconds.unwrap_or(0).saturating_mul(1000);
        Duration::from_millis(exponential.max(requested))
    }

    fn pick_user_agent(&self) -> &str {
        if self.user_agents.is_empty() {
            return DEFAULT_USER_AGENTS[0];
        }
        &self.user_agents[fastrand::usize(..self.user_agents.len())]
    }
}

/// Header set sent with every request of a profile
pub fn profile_headers(profile: ClientProfile) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    if profile == ClientProfile::Browser {
        let browser = [
            ("upgrade-insecure-requests", "1"),
            ("cache-control", "max-age=0"),
            ("sec-ch-ua", r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#),
            ("sec-ch-ua-mobile", "?0"),
            ("sec-ch-ua-platform", r#""Windows""#),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-user", "?1"),
        ];
        for (name, value) in browser {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    headers
}

/// Challenge marker found in a response, if any
pub fn detect_challenge(status: u16, body: &str) -> Option<&'static str> {
    let lower = body.to_lowercase();
    let markers = if matches!(status, 403 | 503) {
        CHALLENGE_MARKERS
    } else {
        STRONG_CHALLENGE_MARKERS
    };
    markers.iter().copied().find(|marker| lower.contains(marker))
}

/// `scheme://host[:port]/` of a URL
pub fn site_root(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}/", parsed.scheme(), host, port),
        None => format!("{}://{}/", parsed.scheme(), host),
    })
}

struct RawResponse {
    result: FetchResult,
    retry_after_seconds: Option<u64>,
}

/// One scraping session over a single reqwest client
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    profile: ClientProfile,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig, profile: ClientProfile) -> FetchOutcome<Self> {
        let user_agent = config.pick_user_agent().to_string();
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout())
            .user_agent(&user_agent)
            .default_headers(profile_headers(profile))
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if profile == ClientProfile::Browser {
            builder = builder.cookie_store(true).brotli(true);
        }

        let client = builder.build().map_err(|e| FetchError::ClientBuild {
            message: e.to_string(),
        })?;

        debug!("Built {:?} session with user agent: {}", profile, user_agent);
        Ok(Self {
            client,
            config,
            profile,
        })
    }

    /// Single GET; any status is returned as-is
    async fn send(&self, url: &str, timeout: Duration) -> FetchOutcome<RawResponse> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, timeout, &e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let retry_after_seconds = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::from_reqwest(url, timeout, &e)
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(RawResponse {
            result: FetchResult {
                status,
                body,
                final_url,
            },
            retry_after_seconds,
        })
    }

    /// GET with retry on throttling and server errors.
    /// Challenge pages are handed back untouched for the caller to inspect.
    async fn fetch_with_policy(&self, url: &str, timeout: Duration) -> FetchOutcome<FetchResult> {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            info!("🌐 HTTP GET (attempt {}/{}) : {}", attempt, attempts, url);
            let raw = self.send(url, timeout).await?;
            let status = raw.result.status;

            if (200..300).contains(&status) {
                return Ok(raw.result);
            }
            if self.profile == ClientProfile::Browser && detect_challenge(status, &raw.result.body).is_some() {
                return Ok(raw.result);
            }

            let error = FetchError::HttpStatus {
                status,
                url: url.to_string(),
                retry_after_seconds: raw.retry_after_seconds,
            };
            warn!("❌ HTTP error {} on attempt {}: {}", status, attempt, url);

            if error.is_retryable() && attempt < attempts {
                let delay = self.config.backoff_delay(attempt, error.retry_delay_seconds());
                debug!("Retrying {} in {:?}", url, delay);
                sleep(delay).await;
                continue;
            }
            return Err(error);
        }

        Err(FetchError::Connection {
            url: url.to_string(),
            message: "no attempt was made".to_string(),
        })
    }

    /// Visit the site root so the cookie jar picks up clearance cookies
    async fn warm_up(&self, url: &str, timeout: Duration) {
        let Some(root) = site_root(url) else {
            return;
        };
        info!("🔥 Warming up session at {}", root);
        if let Err(e) = self.send(&root, timeout).await {
            warn!("Warm-up request failed for {}: {}", root, e);
        }
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn get(&self, url: &str, timeout: Duration) -> FetchOutcome<FetchResult> {
        let first = self.fetch_with_policy(url, timeout).await?;
        if self.profile != ClientProfile::Browser {
            return Ok(first);
        }

        let Some(marker) = detect_challenge(first.status, &first.body) else {
            return Ok(first);
        };

        warn!("🛡️ Challenge page detected at {} (marker: {})", url, marker);
        self.warm_up(url, timeout).await;

        let retried = self.fetch_with_policy(url, timeout).await?;
        match detect_challenge(retried.status, &retried.body) {
            Some(marker) => Err(FetchError::Challenge {
                url: url.to_string(),
                marker: marker.to_string(),
            }),
            None if (200..300).contains(&retried.status) => Ok(retried),
            None => Err(FetchError::http_status(retried.status, url)),
        }
    }
}

/// Builds one [`HttpClient`] session per scrape call
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    config: HttpClientConfig,
}

impl HttpClientFactory {
    pub const fn new(config: HttpClientConfig) -> Self {
        Self { config }
    }
}

impl FetcherFactory for HttpClientFactory {
    fn session(&self, profile: ClientProfile) -> FetchOutcome<Box<dyn PageFetcher>> {
        let client = HttpClient::new(self.config.clone(), profile)?;
        Ok(Box::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new(HttpClientConfig::default(), ClientProfile::Browser);
        assert!(client.is_ok());
    }

    #[test]
    fn factory_builds_sessions_for_both_profiles() {
        let factory = HttpClientFactory::default();
        assert!(factory.session(ClientProfile::Plain).is_ok());
        assert!(factory.session(ClientProfile::Browser).is_ok());
    }

    #[test]
    fn browser_profile_adds_fetch_metadata() {
        let plain = profile_headers(ClientProfile::Plain);
        let browser = profile_headers(ClientProfile::Browser);
        assert!(plain.get("sec-fetch-mode").is_none());
        assert_eq!(browser.get("sec-fetch-mode").and_then(|v| v.to_str().ok()), Some("navigate"));
        assert!(plain.get(ACCEPT_LANGUAGE).is_some());
    }

    #[test]
    fn detects_challenge_pages() {
        let interstitial = "<html><head><title>Just a moment...</title></head><body>Checking your browser</body></html>";
        assert_eq!(detect_challenge(503, interstitial), Some("checking your browser"));
        assert_eq!(detect_challenge(200, interstitial), Some("checking your browser"));

        let normal = r#"<html><script src="/cdn-cgi/challenge-platform/scripts/jsd/main.js"></script><p>Movies</p></html>"#;
        assert_eq!(detect_challenge(200, normal), None);
        assert_eq!(detect_challenge(403, normal), Some("challenge-platform"));
    }

    #[test]
    fn backoff_is_exponential_and_honours_retry_after() {
        let config = HttpClientConfig {
            retry_base_delay_ms: 500,
            ..HttpClientConfig::default()
        };
        assert_eq!(config.backoff_delay(1, None), Duration::from_millis(500));
        assert_eq!(config.backoff_delay(3, None), Duration::from_millis(2000));
        assert_eq!(config.backoff_delay(1, Some(4)), Duration::from_secs(4));
    }

    #[test]
    fn site_root_keeps_scheme_and_host() {
        assert_eq!(
            site_root("https://1cinevood.asia/some-movie/?x=1").as_deref(),
            Some("https://1cinevood.asia/")
        );
        assert_eq!(site_root("http://localhost:8080/a").as_deref(), Some("http://localhost:8080/"));
        assert_eq!(site_root("not a url"), None);
    }

    const INTERSTITIAL: &str = "<html><head><title>Just a moment...</title></head><body>Checking your browser</body></html>";

    /// Serves one response per connection from `respond(path, times_seen_before)`
    /// and records every requested path
    async fn scripted_server(respond: fn(&str, usize) -> (u16, &'static str)) -> (String, Arc<Mutex<Vec<String>>>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let paths = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&paths);

        tokio::spawn(async move {
            let mut seen: HashMap<String, usize> = HashMap::new();
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0_u8; 2048];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                recorded.lock().unwrap().push(path.clone());

                let count = seen.entry(path.clone()).or_default();
                let (status, body) = respond(&path, *count);
                *count += 1;

                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base, paths)
    }

    fn single_attempt() -> HttpClientConfig {
        HttpClientConfig {
            max_attempts: 1,
            ..HttpClientConfig::default()
        }
    }

    #[tokio::test]
    async fn browser_session_reports_a_challenge_that_survives_the_warm_up() {
        let (base, paths) = scripted_server(|path, _| match path {
            "/" => (200, "<p>home</p>"),
            _ => (503, INTERSTITIAL),
        })
        .await;
        let client = HttpClient::new(single_attempt(), ClientProfile::Browser).unwrap();

        let result = client.get(&format!("{base}/movie/"), Duration::from_secs(5)).await;

        assert!(matches!(result, Err(FetchError::Challenge { .. })), "{result:?}");
        assert_eq!(*paths.lock().unwrap(), vec!["/movie/", "/", "/movie/"]);
    }

    #[tokio::test]
    async fn browser_session_recovers_once_the_warm_up_clears_the_challenge() {
        let (base, paths) = scripted_server(|path, seen| match (path, seen) {
            ("/movie/", 0) => (503, INTERSTITIAL),
            _ => (200, "<p>Movies</p>"),
        })
        .await;
        let client = HttpClient::new(single_attempt(), ClientProfile::Browser).unwrap();

        let page = client.get(&format!("{base}/movie/"), Duration::from_secs(5)).await.unwrap();

        assert_eq!(page.status, 200);
        assert!(page.body.contains("Movies"));
        assert_eq!(*paths.lock().unwrap(), vec!["/movie/", "/", "/movie/"]);
    }

    #[tokio::test]
    async fn plain_session_never_warms_up() {
        let (base, paths) = scripted_server(|_, _| (503, INTERSTITIAL)).await;
        let client = HttpClient::new(single_attempt(), ClientProfile::Plain).unwrap();

        let result = client.get(&format!("{base}/movie/"), Duration::from_secs(5)).await;

        assert!(matches!(result, Err(FetchError::HttpStatus { status: 503, .. })), "{result:?}");
        assert_eq!(*paths.lock().unwrap(), vec!["/movie/"]);
    }
}
