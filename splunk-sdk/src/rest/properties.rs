use super::collection::Collection;
use super::namespace::Namespace;
use crate::client::{Client, FormParams, Method, RequestBody, RestError};
use std::collections::BTreeMap;
use tracing::debug;

pub const PROPERTIES_PATH: &str = "properties";
const CONF_SUFFIX: &str = ".conf";

/// Strips a trailing `.conf` so `inputs.conf` and `inputs` name the same file.
pub fn conf_name(config_file: &str) -> &str {
    let config_file = config_file.trim();
    config_file
        .strip_suffix(CONF_SUFFIX)
        .unwrap_or(config_file)
}

/// Key/value access to one configuration file (`properties/<conf>/<stanza>`).
#[derive(Debug, Clone)]
pub struct Properties {
    client: Client,
    namespace: Namespace,
    conf: String,
}

impl Properties {
    pub fn new(client: &Client, config_file: &str) -> Self {
        Self::namespaced(client, config_file, client.namespace())
    }

    /// Reads values the way the platform resolves them system wide.
    pub fn system(client: &Client, config_file: &str) -> Self {
        Self::namespaced(client, config_file, &Namespace::system())
    }

    pub fn namespaced(client: &Client, config_file: &str, namespace: &Namespace) -> Self {
        Self {
            client: client.clone(),
            namespace: namespace.clone(),
            conf: conf_name(config_file).to_string(),
        }
    }

    pub fn conf(&self) -> &str {
        &self.conf
    }

    fn require(&self, stanza: &str) -> Result<(), RestError> {
        if self.conf.is_empty() {
            return Err(RestError::invalid_param("config_file", "must not be empty"));
        }
        if stanza.is_empty() {
            return Err(RestError::invalid_param("stanza", "must not be empty"));
        }
        Ok(())
    }

    /// Collection of the keys of one stanza; every entry's content is the value.
    pub fn stanza_collection(&self, stanza: &str) -> Collection<String> {
        Collection::namespaced(
            &self.client,
            &format!("{}/{}/{}", PROPERTIES_PATH, self.conf, stanza),
            PROPERTIES_PATH,
            &self.namespace,
        )
        .with_segment(&self.conf)
        .with_segment(stanza)
    }

    pub async fn stanza(&self, stanza: &str) -> Result<BTreeMap<String, String>, RestError> {
        self.require(stanza)?;
        Ok(self
            .stanza_collection(stanza)
            .list()
            .await?
            .into_iter()
            .map(|entry| (entry.name, entry.content))
            .collect())
    }

    pub async fn get_property(&self, stanza: &str, key: &str) -> Result<String, RestError> {
        self.require(stanza)?;
        if key.is_empty() {
            return Err(RestError::invalid_param("key", "must not be empty"));
        }

        let collection = self.stanza_collection(stanza);
        debug!("Looking up {} in {}", key, collection.path());
        collection
            .list()
            .await?
            .into_iter()
            .find(|entry| entry.name == key)
            .map(|entry| entry.content)
            .ok_or_else(|| RestError::NotFound {
                kind: "Property".to_string(),
                name: key.to_string(),
                path: collection.path(),
            })
    }

    pub async fn set_property(&self, stanza: &str, key: &str, value: &str) -> Result<(), RestError> {
        self.require(stanza)?;
        if key.is_empty() {
            return Err(RestError::invalid_param("key", "must not be empty"));
        }

        let url = self.client.build_url(
            &self.namespace.services_ns_url(),
            &[PROPERTIES_PATH, self.conf.as_str(), stanza],
        )?;
        let params = FormParams::from([(key, value)]);
        self.client
            .fetch(Method::Post, url, RequestBody::Form(params))
            .await
    }

    pub async fn create_stanza(&self, stanza: &str) -> Result<(), RestError> {
        self.require(stanza)?;

        let url = self
            .client
            .build_url(&self.namespace.services_ns_url(), &[PROPERTIES_PATH, self.conf.as_str()])?;
        let params = FormParams::from([("__stanza", stanza)]);
        self.client
            .fetch(Method::Post, url, RequestBody::Form(params))
            .await
    }
}
