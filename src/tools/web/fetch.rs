//! Guarded web fetching
//!
//! Plugins that take a caller-supplied URL fetch it through [`WebFetchTool`],
//! which refuses non-HTTP schemes and hosts that resolve to private or
//! internal addresses.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use url::Url;

use crate::config::HttpConfig;
use crate::{Error, Result};

/// User agent sent on every upstream request
const USER_AGENT: &str = concat!("Courier/", env!("CARGO_PKG_VERSION"));

/// Maximum redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// Largest response body read into memory
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Build the HTTP client shared by all plugins
///
/// # Errors
///
/// Returns error if the proxy URL is invalid or the client cannot be built
pub fn build_client(http: &HttpConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(http.timeout)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(USER_AGENT);

    if let Some(proxy) = &http.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| Error::Config(format!("invalid proxy `{proxy}`: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(Error::Http)
}

/// HTTP response from a web fetch
#[derive(Debug, Clone)]
pub struct WebResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
    /// Final URL after any redirects
    pub url: String,
}

impl WebResponse {
    /// Whether the status is 2xx
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Web fetcher with SSRF protection
#[derive(Debug, Clone)]
pub struct WebFetchTool {
    client: Client,
    allow_private: bool,
    max_body_bytes: usize,
}

impl WebFetchTool {
    /// Wrap a shared client
    ///
    /// `allow_private` disables the private-address check; only tests and
    /// intranet deployments should set it.
    #[must_use]
    pub const fn new(client: Client, allow_private: bool) -> Self {
        Self {
            client,
            allow_private,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Override the response body cap
    #[must_use]
    pub const fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// GET a URL with SSRF protection
    ///
    /// # Errors
    ///
    /// Returns error if the URL is rejected, the request fails, or the body
    /// cannot be read as text
    pub async fn fetch(&self, url: &str) -> Result<WebResponse> {
        self.fetch_with_headers(url, &[]).await
    }

    /// GET a URL with extra request headers
    ///
    /// # Errors
    ///
    /// Returns error if the URL is rejected, a header is invalid, the request
    /// fails, or the body cannot be read or exceeds the size cap
    pub async fn fetch_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<WebResponse> {
        let parsed = self.check_url(url).await?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::WebFetch(format!("Invalid header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::WebFetch(format!("Invalid header value: {e}")))?;
            header_map.insert(name, value);
        }

        let response = self
            .client
            .get(parsed)
            .headers(header_map)
            .send()
            .await
            .map_err(|e| Error::WebFetch(format!("Request failed: {e}")))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = read_body(response, self.max_body_bytes).await?;

        tracing::debug!(url = %final_url, status, bytes = body.len(), "fetched page");
        Ok(WebResponse {
            status,
            body,
            url: final_url,
        })
    }

    /// Validate scheme and host of a URL before it is requested
    ///
    /// # Errors
    ///
    /// Returns error if the URL is malformed, not http(s), has no host, or
    /// resolves to a blocked address
    pub async fn check_url(&self, url: &str) -> Result<Url> {
        let parsed =
            Url::parse(url).map_err(|e| Error::WebFetch(format!("Invalid URL: {e}")))?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(Error::WebFetch(format!(
                "Invalid scheme: {scheme}. Only http and https are allowed"
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| Error::WebFetch("URL has no host".to_string()))?;

        if !self.allow_private {
            let port = parsed.port_or_known_default().unwrap_or(80);
            check_ssrf(host, port).await?;
        }

        Ok(parsed)
    }
}

/// Reject hosts that resolve to any blocked address
/// Read a response body, refusing to buffer more than `limit` bytes
async fn read_body(response: Response, limit: usize) -> Result<String> {
    let too_large = || Error::WebFetch(format!("Response body exceeds {limit} bytes"));

    if response
        .content_length()
        .is_some_and(|len| u64::try_from(limit).is_ok_and(|limit| len > limit))
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| Error::WebFetch(format!("Failed to read response body: {e}")))?;
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

async fn check_ssrf(host: &str, port: u16) -> Result<()> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::WebFetch(format!("Failed to resolve hostname: {e}")))?;

    for addr in addrs {
        if is_blocked_ip(addr.ip()) {
            return Err(Error::WebFetch(format!(
                "Blocked: {host} resolves to private/internal IP {}",
                addr.ip()
            )));
        }
    }

    Ok(())
}

/// Whether an address is loopback, private, link-local or unspecified
#[must_use]
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_blocked_ipv4(ipv4),
        IpAddr::V6(ipv6) => ipv6
            .to_ipv4_mapped()
            .map_or_else(|| is_blocked_ipv6(ipv6), is_blocked_ipv4),
    }
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();

    // 0.0.0.0/8, 127.0.0.0/8, 10.0.0.0/8
    if a == 0 || a == 127 || a == 10 {
        return true;
    }

    // 172.16.0.0/12
    if a == 172 && (16..=31).contains(&b) {
        return true;
    }

    // 192.168.0.0/16, 169.254.0.0/16
    (a == 192 && b == 168) || (a == 169 && b == 254)
}

fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];

    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link-local
        || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn blocked(ip: &str) -> bool {
        is_blocked_ip(ip.parse().unwrap())
    }

    fn fetcher(allow_private: bool) -> WebFetchTool {
        WebFetchTool::new(Client::new(), allow_private)
    }

    #[test]
    fn blocks_private_ipv4_ranges() {
        for ip in [
            "0.0.0.0",
            "127.0.0.1",
            "10.255.255.255",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.1",
            "169.254.169.254",
        ] {
            assert!(blocked(ip), "{ip} should be blocked");
        }
    }

    #[test]
    fn allows_public_ipv4() {
        for ip in ["8.8.8.8", "1.1.1.1", "172.15.0.1", "172.32.0.1", "192.169.0.1"] {
            assert!(!blocked(ip), "{ip} should be allowed");
        }
    }

    #[test]
    fn blocks_private_ipv6_ranges() {
        for ip in ["::1", "::", "fc00::1", "fdff::1", "fe80::1", "::ffff:127.0.0.1"] {
            assert!(blocked(ip), "{ip} should be blocked");
        }
        assert!(!blocked("2606:4700:4700::1111"));
        assert!(!blocked("::ffff:8.8.8.8"));
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let err = fetcher(false).check_url("file:///etc/passwd").await.unwrap_err();
        assert!(err.to_string().contains("Invalid scheme"));
    }

    #[tokio::test]
    async fn rejects_loopback_hosts() {
        let err = fetcher(false)
            .check_url("http://127.0.0.1:8080/admin")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Blocked"));
    }

    #[tokio::test]
    async fn allow_private_skips_the_check() {
        let url = fetcher(true).check_url("http://127.0.0.1:8080/").await.unwrap();
        assert_eq!(url.port(), Some(8080));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
            .mount(&server)
            .await;

        let err = fetcher(true)
            .with_max_body_bytes(1024)
            .fetch(&server.uri())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds 1024 bytes"));

        let page = fetcher(true)
            .with_max_body_bytes(4096)
            .fetch(&server.uri())
            .await
            .unwrap();
        assert_eq!(page.body.len(), 2048);
    }

    #[test]
    fn builds_client_with_proxy() {
        let http = HttpConfig {
            proxy: Some("http://proxy.local:3128".to_string()),
            timeout: Duration::from_secs(5),
            allow_private_urls: false,
        };
        assert!(build_client(&http).is_ok());
    }
}
