use super::error::RestError;
use super::rest_client::Client;
use super::transport::{Auth, DefaultHttpTransport};
use crate::rest::Namespace;
use clap::{ArgGroup, Parser};
use educe::Educe;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the management API. Every option can also be set
/// through its environment variable.
#[derive(Parser, Educe, Clone)]
#[educe(Debug)]
#[clap(group = ArgGroup::new("connection"))]
pub struct ClientOptions {
    /// Base URL of the management port.
    #[arg(long, env = "SPLUNK_URL", default_value = "https://localhost:8089", global(true))]
    pub url: String,

    /// Bearer token used instead of a session key.
    #[arg(long, env = "SPLUNK_TOKEN", global(true), hide_env_values = true)]
    #[educe(Debug(ignore))]
    pub token: Option<String>,

    /// Existing session key, e.g. the one passed to a script on startup.
    #[arg(long, env = "SPLUNK_SESSION_KEY", global(true), hide_env_values = true)]
    #[educe(Debug(ignore))]
    pub session_key: Option<String>,

    /// User to log in with when neither a token nor a session key is set.
    #[arg(long, env = "SPLUNK_USERNAME", global(true))]
    pub username: Option<String>,

    #[arg(long, env = "SPLUNK_PASSWORD", global(true), hide_env_values = true)]
    #[educe(Debug(ignore))]
    pub password: Option<String>,

    /// Owner part of the default namespace. Blank means any owner.
    #[arg(long, env = "SPLUNK_OWNER", default_value = "", global(true))]
    pub owner: String,

    /// App part of the default namespace. Blank means any app.
    #[arg(long, env = "SPLUNK_APP", default_value = "", global(true))]
    pub app: String,

    /// Accept self-signed certificates on the management port.
    #[arg(long, env = "SPLUNK_INSECURE", default_value = "false", global(true))]
    pub insecure: bool,

    /// Overall timeout of every request, in seconds.
    #[arg(long, env = "SPLUNK_TIMEOUT_SECS", default_value = "10", global(true))]
    pub timeout_secs: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: "https://localhost:8089".to_string(),
            token: None,
            session_key: None,
            username: None,
            password: None,
            owner: String::new(),
            app: String::new(),
            insecure: false,
            timeout_secs: 10,
        }
    }
}

impl ClientOptions {
    fn auth(&self) -> Auth {
        match (&self.session_key, &self.token) {
            (Some(key), _) if !key.is_empty() => Auth::session_key(key.as_str()),
            (_, Some(token)) if !token.is_empty() => Auth::token(token.as_str()),
            _ => Auth::Anonymous,
        }
    }

    /// Builds a client from these options without touching the network.
    pub fn build_client(&self) -> Result<Client, RestError> {
        let transport =
            DefaultHttpTransport::new(Duration::from_secs(self.timeout_secs), self.insecure)?;
        let namespace = Namespace::scoped(&self.owner, &self.app);

        Ok(Client::with_transport(&self.url, Arc::new(transport))?
            .with_namespace(namespace)
            .with_auth(self.auth()))
    }

    /// Builds a client and logs in with username/password when no session key
    /// or token was given.
    pub async fn connect(&self) -> Result<Client, RestError> {
        let mut client = self.build_client()?;
        if client.auth().is_anonymous() {
            match (&self.username, &self.password) {
                (Some(username), Some(password)) => {
                    let password = SecretString::from(password.clone());
                    client.login(username, &password).await?;
                }
                _ => debug!("No credentials configured, using an anonymous client"),
            }
        }
        Ok(client)
    }
}
