use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

/// Version value that asks for the latest published GitHub release.
pub const LATEST_SENTINEL: &str = "LAST";

pub const GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LatestRelease {
    pub tag_name: String,
}

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("requesting {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("latest version not found in response from {url}")]
    MissingTag {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub struct GithubApi {
    base_url: String,
    client: Client,
}

impl GithubApi {
    pub fn new() -> Self {
        Self::with_base_url(GITHUB_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn latest_release_url(&self, repo_slug: &str) -> String {
        format!("{}/repos/{repo_slug}/releases/latest", self.base_url)
    }

    /// Single blocking GET, no retry.
    pub fn latest_release(&self, repo_slug: &str) -> Result<LatestRelease, ReleaseError> {
        let url = self.latest_release_url(repo_slug);
        log::info!("looking up latest release at {url}");

        let response = self
            .client
            .get(&url)
            .header(
                reqwest::header::USER_AGENT,
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            )
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .map_err(|source| ReleaseError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseError::Status { url, status });
        }

        let body = response.text().map_err(|source| ReleaseError::Request {
            url: url.clone(),
            source,
        })?;
        parse_latest_release(&body).map_err(|source| ReleaseError::MissingTag { url, source })
    }
}

impl Default for GithubApi {
    fn default() -> Self {
        Self::new()
    }
}

pub fn parse_latest_release(body: &str) -> Result<LatestRelease, serde_json::Error> {
    serde_json::from_str(body)
}

/// Replace the `LAST` sentinel with the tag of the latest release. Any other
/// version is returned untouched; `api` is only called for the sentinel.
pub fn resolve_version<F>(version: &str, repo_slug: &str, api: F) -> Result<String, ReleaseError>
where
    F: FnOnce() -> GithubApi,
{
    if version != LATEST_SENTINEL {
        return Ok(version.to_string());
    }

    let release = api().latest_release(repo_slug)?;
    log::info!("latest release of {repo_slug} is {}", release.tag_name);
    Ok(release.tag_name)
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    use super::{GithubApi, LatestRelease, ReleaseError, parse_latest_release, resolve_version};

    /// Serve exactly one HTTP response and hand back the request line.
    fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
        let addr = listener.local_addr().expect("listener address");
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept connection");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("read request line");
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).expect("read header");
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            let mut stream = stream;
            stream
                .write_all(response.as_bytes())
                .expect("write response");
            request_line
        });

        (format!("http://{addr}"), handle)
    }

    #[test]
    fn parses_tag_name_and_ignores_other_fields() {
        let release = parse_latest_release(r#"{"tag_name":"v2.0.0","draft":false,"id":1}"#)
            .expect("valid release body");
        assert_eq!(
            release,
            LatestRelease {
                tag_name: "v2.0.0".to_string()
            }
        );
    }

    #[test]
    fn rejects_body_without_tag_name() {
        assert!(parse_latest_release(r#"{"name":"no tag here"}"#).is_err());
        assert!(parse_latest_release(r#"{"tag_name":42}"#).is_err());
    }

    #[test]
    fn literal_versions_skip_the_network() {
        let version = resolve_version("v1.2.3", "a/b", || -> GithubApi {
            panic!("client must not be built for a literal version")
        })
        .expect("no lookup needed");
        assert_eq!(version, "v1.2.3");
    }

    #[test]
    fn sentinel_resolves_to_latest_tag() {
        let (base, handle) = serve_once("200 OK", r#"{"tag_name":"v2.0.0"}"#);
        let version = resolve_version("LAST", "owner/repo", || GithubApi::with_base_url(base))
            .expect("lookup succeeds");
        assert_eq!(version, "v2.0.0");

        let request_line = handle.join().expect("server thread");
        assert!(request_line.starts_with("GET /repos/owner/repo/releases/latest "));
    }

    #[test]
    fn sentinel_fails_when_tag_is_missing() {
        let (base, handle) = serve_once("200 OK", r#"{"message":"Not Found"}"#);
        let err = resolve_version("LAST", "owner/repo", || GithubApi::with_base_url(base))
            .expect_err("tag is missing");
        assert!(matches!(err, ReleaseError::MissingTag { .. }));
        handle.join().expect("server thread");
    }

    #[test]
    fn error_status_is_reported() {
        let (base, handle) = serve_once("404 Not Found", r#"{"message":"Not Found"}"#);
        let api = GithubApi::with_base_url(base);

        let err = api.latest_release("owner/repo").expect_err("404 is an error");
        match err {
            ReleaseError::Status { status, .. } => assert_eq!(status.as_u16(), 404),
            other => panic!("unexpected error: {other}"),
        }
        handle.join().expect("server thread");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = GithubApi::with_base_url("https://example.test/");
        assert_eq!(
            api.latest_release_url("a/b"),
            "https://example.test/repos/a/b/releases/latest"
        );
    }
}
