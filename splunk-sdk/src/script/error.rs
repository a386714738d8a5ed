use crate::client::RestError;
use crate::params::ParamError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Rest(#[from] RestError),
    #[error("Unable to read the {what} from the platform. {error:?}")]
    Io {
        what: &'static str,
        #[source]
        error: std::io::Error,
    },
    #[error("Unable to parse the {what} XML. {error:?}")]
    Xml {
        what: &'static str,
        #[source]
        error: serde_xml_rs::Error,
    },
    #[error("Unable to parse the alert payload. {error:?}")]
    Json {
        #[source]
        error: serde_json::Error,
    },
    #[error("Stanza {stanza} failed: {error:?}")]
    Worker {
        stanza: String,
        error: anyhow::Error,
    },
    #[error("{} of {total} stanzas failed", .failures.len())]
    Stanzas {
        total: usize,
        failures: Vec<ScriptError>,
    },
}
