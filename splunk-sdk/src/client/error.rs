use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParam { name: String, reason: String },
    #[error("Collection {name:?} at {path:?} is not initialized, it needs a name, a path and a client")]
    UninitializedCollection { name: String, path: String },
    #[error("{method} {url} failed with {status}: {body}")]
    Http {
        method: String,
        url: String,
        status: String,
        body: String,
    },
    #[error("Unable to send {method} {url}. {error:?}")]
    Transport {
        method: String,
        url: String,
        #[source]
        error: reqwest::Error,
    },
    #[error("Unable to decode response from {url}. {error:?}")]
    Decode {
        url: String,
        #[source]
        error: serde_json::Error,
    },
    #[error("Unable to encode request body for {url}. {error:?}")]
    Encode {
        url: String,
        #[source]
        error: serde_json::Error,
    },
    #[error("Response from {url} did not contain any entry")]
    EmptyResponse { url: String },
    #[error("Unable to build URL. {error:?}")]
    Url {
        #[from]
        error: url::ParseError,
    },
    #[error("Unable to build HTTP client. {error:?}")]
    ClientBuild {
        #[source]
        error: reqwest::Error,
    },
    #[error("{kind} {name:?} was not found in {path}")]
    NotFound {
        kind: String,
        name: String,
        path: String,
    },
}

impl RestError {
    pub(crate) fn invalid_param(name: &str, reason: &str) -> Self {
        RestError::InvalidParam {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status code carried by the error, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RestError::Http { status, .. } => status
                .split_whitespace()
                .next()
                .and_then(|code| code.parse().ok()),
            _ => None,
        }
    }
}
