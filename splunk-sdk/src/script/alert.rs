use super::error::ScriptError;
use crate::client::Client;
use crate::params::{Param, ParamRegistry};
use crate::rest::Namespace;
use educe::Educe;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use tracing::info;

pub const ALERT_ACTIONS_CONF: &str = "alert_actions";

/// A field of the triggering result: one value, or several for a multivalue
/// field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multi(Vec<String>),
}

impl FieldValue {
    /// The first value, or an empty string for an empty multivalue field.
    pub fn first(&self) -> &str {
        match self {
            FieldValue::Single(value) => value,
            FieldValue::Multi(values) => values.first().map(String::as_str).unwrap_or_default(),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Single(value) => vec![value.as_str()],
            FieldValue::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// The JSON document an alert action receives on stdin with `--execute`.
#[derive(Educe, Clone, Default, Deserialize)]
#[educe(Debug)]
pub struct AlertPayload {
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub results_file: String,
    #[serde(default)]
    pub results_link: String,
    #[serde(default)]
    pub server_host: String,
    #[serde(default)]
    pub server_uri: String,
    #[serde(default)]
    #[educe(Debug(ignore))]
    pub session_key: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub search_name: String,
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
    #[serde(default)]
    pub result: BTreeMap<String, FieldValue>,
}

/// A custom alert action. Its own parameters live in the `alert_actions`
/// stanza named after the action.
#[derive(Debug)]
pub struct AlertAction {
    name: String,
    registry: ParamRegistry,
}

impl AlertAction {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            registry: ParamRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &ParamRegistry {
        &self.registry
    }

    pub fn register_param(
        &mut self,
        name: &str,
        title: &str,
        description: &str,
        default_value: &str,
        required: bool,
        sensitive: bool,
    ) -> Result<Arc<Param>, ScriptError> {
        let param = Param::new(
            ALERT_ACTIONS_CONF,
            &self.name,
            name,
            title,
            description,
            default_value,
            required,
            sensitive,
        )?;
        Ok(self.registry.register_param(param)?)
    }

    /// Registers a parameter read from another configuration file.
    pub fn register_global_param(&mut self, param: Param) -> Result<Arc<Param>, ScriptError> {
        Ok(self.registry.register_global_param(param)?)
    }

    pub fn param(&self, name: &str) -> Option<Arc<Param>> {
        self.registry.get(name)
    }

    pub fn read_payload<R: Read>(&self, mut reader: R) -> Result<AlertPayload, ScriptError> {
        let mut document = String::new();
        reader
            .read_to_string(&mut document)
            .map_err(|error| ScriptError::Io {
                what: "alert payload",
                error,
            })?;
        serde_json::from_str(&document).map_err(|error| ScriptError::Json { error })
    }

    /// Forces the payload's configuration onto the registered parameters.
    pub fn configure(&self, payload: &AlertPayload) -> Result<(), ScriptError> {
        self.registry.apply(&payload.configuration)?;
        Ok(())
    }

    /// A client on the payload's server, authenticated with its session key
    /// and scoped to the app and owner that triggered the alert.
    pub fn client(&self, payload: &AlertPayload) -> Result<Client, ScriptError> {
        let namespace = Namespace::scoped(&payload.owner, &payload.app);
        Ok(Client::from_session(&payload.server_uri, &payload.session_key)?
            .with_namespace(namespace))
    }

    /// Reads the payload, configures the parameters and connects back to the
    /// server.
    pub fn execute<R: Read>(&self, reader: R) -> Result<(AlertPayload, Client), ScriptError> {
        let payload = self.read_payload(reader)?;
        info!(
            target: "script",
            "Alert action {} triggered by {} ({})",
            self.name,
            payload.search_name,
            payload.sid
        );
        self.configure(&payload)?;
        let client = self.client(&payload)?;
        Ok((payload, client))
    }
}
