use super::error::RestError;
use super::form::FormParams;
use async_trait::async_trait;
use mockall::automock;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// How a request authenticates against the management port.
#[derive(Debug, Clone, Default)]
pub enum Auth {
    #[default]
    Anonymous,
    /// `Authorization: Splunk <sessionKey>`
    SessionKey(Arc<SecretString>),
    /// `Authorization: Bearer <token>`
    Token(Arc<SecretString>),
}

impl Auth {
    pub fn session_key(key: impl Into<String>) -> Self {
        Auth::SessionKey(Arc::new(SecretString::from(key.into())))
    }

    pub fn token(token: impl Into<String>) -> Self {
        Auth::Token(Arc::new(SecretString::from(token.into())))
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Auth::Anonymous)
    }

    /// Value for the `Authorization` header. Exposes the secret.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Auth::Anonymous => None,
            Auth::SessionKey(key) => Some(format!("Splunk {}", key.expose_secret())),
            Auth::Token(token) => Some(format!("Bearer {}", token.expose_secret())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Form(FormParams),
    Json(String),
}

/// Whether the caller wants the body of a successful response.
/// Error bodies are always read so they can be reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyHandling {
    #[default]
    Keep,
    Discard,
}

#[derive(Debug)]
pub struct RestRequest {
    pub method: Method,
    pub url: Url,
    pub auth: Auth,
    pub body: RequestBody,
    pub body_handling: BodyHandling,
}

impl RestRequest {
    pub fn form(&self) -> Option<&FormParams> {
        match &self.body {
            RequestBody::Form(params) => Some(params),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl RestResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            reason,
            body: body.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn status_text(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }
}

/// Abstract away the wire so the REST layer can be tested without a server.
/// Implementations must be safe to share between tasks.
#[automock]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: RestRequest) -> Result<RestResponse, RestError>;
}

#[derive(Debug, Clone)]
pub struct DefaultHttpTransport {
    client: reqwest::Client,
}

impl DefaultHttpTransport {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, RestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|error| RestError::ClientBuild { error })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for DefaultHttpTransport {
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: RestRequest) -> Result<RestResponse, RestError> {
        let method = request.method.to_string();
        let url = request.url.to_string();
        let transport_error = |error| RestError::Transport {
            method: method.clone(),
            url: url.clone(),
            error,
        };

        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone());
        if let Some(value) = request.auth.header_value() {
            let mut header = reqwest::header::HeaderValue::from_str(&value)
                .map_err(|_| RestError::invalid_param("auth", "credential is not a valid header"))?;
            header.set_sensitive(true);
            builder = builder.header(reqwest::header::AUTHORIZATION, header);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(params) => builder.form(params.pairs()),
            RequestBody::Json(json) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(json),
        };

        let mut response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!("Response status was {}", status);

        let body = if status.as_u16() >= 400 || request.body_handling == BodyHandling::Keep {
            response.text().await.map_err(transport_error)?
        } else {
            while response.chunk().await.map_err(transport_error)?.is_some() {}
            String::new()
        };

        Ok(RestResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_header_value() {
        assert_eq!(
            Some("Splunk abc".to_string()),
            Auth::session_key("abc").header_value()
        );
        assert_eq!(
            Some("Bearer xyz".to_string()),
            Auth::token("xyz").header_value()
        );
        assert_eq!(None, Auth::Anonymous.header_value());
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let auth = Auth::session_key("super-secret");
        assert!(!format!("{:?}", auth).contains("super-secret"));
    }

    /// Answers one request on a local port with `status` and `body`, and
    /// hands back the raw request head it received.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> anyhow::Result<(Url, tokio::task::JoinHandle<anyhow::Result<String>>)> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = Url::parse(&format!("http://{}/services/apps", listener.local_addr()?))?;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let read = socket.read(&mut buf).await?;
                if read == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..read]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await?;
            socket.shutdown().await?;
            Ok::<_, anyhow::Error>(String::from_utf8_lossy(&head).to_lowercase())
        });
        Ok((url, server))
    }

    fn get(url: Url, auth: Auth, body_handling: BodyHandling) -> RestRequest {
        RestRequest {
            method: Method::Get,
            url,
            auth,
            body: RequestBody::Empty,
            body_handling,
        }
    }

    #[tokio::test]
    async fn test_default_transport_sends_authorization() -> anyhow::Result<()> {
        let (url, server) = serve_once("200 OK", r#"{"entry":[]}"#).await?;
        let transport = DefaultHttpTransport::new(DEFAULT_TIMEOUT, false)?;

        let response = transport
            .send(get(url, Auth::session_key("abc123"), BodyHandling::Keep))
            .await?;

        assert_eq!(200, response.status);
        assert_eq!(r#"{"entry":[]}"#, response.body);
        let head = server.await??;
        assert!(head.starts_with("get /services/apps"));
        assert!(head.contains("authorization: splunk abc123\r\n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_default_transport_anonymous_has_no_authorization() -> anyhow::Result<()> {
        let (url, server) = serve_once("200 OK", "").await?;
        let transport = DefaultHttpTransport::new(DEFAULT_TIMEOUT, false)?;

        transport
            .send(get(url, Auth::Anonymous, BodyHandling::Keep))
            .await?;

        assert!(!server.await??.contains("authorization:"));
        Ok(())
    }

    #[tokio::test]
    async fn test_default_transport_drains_discarded_body() -> anyhow::Result<()> {
        let (url, server) = serve_once("200 OK", "not needed").await?;
        let transport = DefaultHttpTransport::new(DEFAULT_TIMEOUT, false)?;

        let response = transport
            .send(get(url, Auth::token("t0k"), BodyHandling::Discard))
            .await?;

        assert_eq!(200, response.status);
        assert_eq!("", response.body);
        assert!(server.await??.contains("authorization: bearer t0k\r\n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_default_transport_reads_error_body_when_discarding() -> anyhow::Result<()> {
        let (url, server) = serve_once("404 Not Found", "no such app").await?;
        let transport = DefaultHttpTransport::new(DEFAULT_TIMEOUT, false)?;

        let response = transport
            .send(get(url, Auth::Anonymous, BodyHandling::Discard))
            .await?;

        assert!(response.is_error());
        assert_eq!("404 Not Found", response.status_text());
        assert_eq!("no such app", response.body);
        server.await??;
        Ok(())
    }

    #[test]
    fn test_response_status_text() {
        let response = RestResponse::new(404, "");
        assert!(response.is_error());
        assert_eq!("404 Not Found", response.status_text());
    }
}
