use crate::client::RestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParamError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParam { name: String, reason: String },
    #[error("{value:?} is not a valid choice for {param}. Valid choices are: {choices}")]
    InvalidChoice {
        param: String,
        value: String,
        choices: String,
    },
    #[error("Parameter {name} is already registered")]
    Duplicate { name: String },
    #[error("Parameter {name} is required but no value was supplied")]
    MissingRequired { name: String },
    #[error("No client available to read {param} from the server")]
    NoClient { param: String },
    #[error("Unable to read {param} from the server. {error}")]
    Remote {
        param: String,
        #[source]
        error: RestError,
    },
}

impl ParamError {
    pub(crate) fn invalid_param(name: &str, reason: &str) -> Self {
        ParamError::InvalidParam {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A value could not be resolved; `fallback` holds the default value (with
/// environment variables expanded) to use in degraded mode.
#[derive(Error, Debug)]
#[error("{error}, falling back to the default value")]
pub struct ValueFallback {
    pub fallback: String,
    #[source]
    pub error: ParamError,
}

impl ValueFallback {
    pub fn into_fallback(self) -> String {
        self.fallback
    }
}
