use super::error::RestError;
use super::form::FormParams;
use super::transport::{
    Auth, BodyHandling, DefaultHttpTransport, HttpTransport, Method, RequestBody, RestRequest,
    RestResponse, DEFAULT_TIMEOUT,
};
use crate::rest::Namespace;
use educe::Educe;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

pub const OUTPUT_MODE: (&str, &str) = ("output_mode", "json");
pub const LOGIN_PATH: &str = "/services/auth/login";

/// Client for the management REST API.
///
/// Cheap to clone; clones share the same transport, which is safe to use from
/// many tasks at once.
#[derive(Educe, Clone)]
#[educe(Debug)]
pub struct Client {
    base_url: Url,
    namespace: Namespace,
    auth: Auth,
    #[educe(Debug(ignore))]
    transport: Arc<dyn HttpTransport>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "sessionKey")]
    session_key: String,
}

impl Client {
    /// Builds a client using the default reqwest transport.
    pub fn new(base_url: &str) -> Result<Self, RestError> {
        let transport = DefaultHttpTransport::new(DEFAULT_TIMEOUT, false)?;
        Self::with_transport(base_url, Arc::new(transport))
    }

    pub fn with_transport(
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, RestError> {
        if base_url.trim().is_empty() {
            return Err(RestError::invalid_param("base_url", "must not be empty"));
        }
        Ok(Self {
            base_url: Url::parse(base_url.trim())?,
            namespace: Namespace::default(),
            auth: Auth::Anonymous,
            transport,
        })
    }

    /// Client for a script started by the platform, authenticated with the
    /// session key the platform handed over on startup.
    pub fn from_session(server_uri: &str, session_key: &str) -> Result<Self, RestError> {
        if session_key.is_empty() {
            return Err(RestError::invalid_param("session_key", "must not be empty"));
        }
        Ok(Self::new(server_uri)?.with_auth(Auth::session_key(session_key)))
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Exchanges a username and password for a session key, which is used for
    /// every following request.
    #[instrument(skip(self, password))]
    pub async fn login(&mut self, username: &str, password: &SecretString) -> Result<(), RestError> {
        if username.is_empty() {
            return Err(RestError::invalid_param("username", "must not be empty"));
        }
        let mut params = FormParams::new();
        params
            .set("username", username)
            .set("password", password.expose_secret());

        let url = self.build_url(LOGIN_PATH, &[])?;
        let response: LoginResponse = self
            .fetch_into(Method::Post, url, RequestBody::Form(params))
            .await?;
        self.auth = Auth::session_key(response.session_key);
        info!("Logged in as {}", username);

        Ok(())
    }

    /// Resolves `root` against the base URL, appends each of `segments` as an
    /// encoded path segment and forces `output_mode=json`.
    pub fn build_url(&self, root: &str, segments: &[&str]) -> Result<Url, RestError> {
        let mut url = self.base_url.join(root)?;
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| RestError::invalid_param("base_url", "cannot be a base URL"))?
                .pop_if_empty()
                .extend(segments);
        }
        url.query_pairs_mut().append_pair(OUTPUT_MODE.0, OUTPUT_MODE.1);
        Ok(url)
    }

    /// Sends a request and only checks the status; the response body is dropped.
    pub async fn fetch(&self, method: Method, url: Url, body: RequestBody) -> Result<(), RestError> {
        self.execute(method, url, body, BodyHandling::Discard)
            .await
            .map(|_| ())
    }

    /// Sends a request and decodes the JSON response into `T`.
    pub async fn fetch_into<T>(
        &self,
        method: Method,
        url: Url,
        body: RequestBody,
    ) -> Result<T, RestError>
    where
        T: DeserializeOwned,
    {
        let url_text = url.to_string();
        let response = self.execute(method, url, body, BodyHandling::Keep).await?;
        serde_json::from_str(&response.body).map_err(|error| RestError::Decode {
            url: url_text,
            error,
        })
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: RequestBody,
        body_handling: BodyHandling,
    ) -> Result<RestResponse, RestError> {
        let url_text = url.to_string();
        debug!("{} {}", method, url_text);

        let response = self
            .transport
            .send(RestRequest {
                method,
                url,
                auth: self.auth.clone(),
                body,
                body_handling,
            })
            .await?;

        if response.is_error() {
            return Err(RestError::Http {
                method: method.to_string(),
                url: url_text,
                status: response.status_text(),
                body: response.body,
            });
        }

        Ok(response)
    }
}
