use super::collection::Collection;
use super::envelope::Entry;
use super::namespace::Namespace;
use crate::client::{Client, FormParams, Method, RequestBody, RestError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};
use url::Url;

pub const KV_CONFIG_PATH: &str = "storage/collections/config";
pub const KV_DATA_PATH: &str = "storage/collections/data";
const FIELD_PREFIX: &str = "field.";
const ACCELERATED_PREFIX: &str = "accelerated_fields.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum KvFieldType {
    Array,
    Number,
    Bool,
    String,
    Cidr,
    Time,
}

/// Definition of one KV store collection.
///
/// The endpoint flattens field types and accelerations into dotted keys
/// (`field.<name>`, `accelerated_fields.<name>`); the accessors give them back
/// as typed maps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KvCollectionConfig {
    #[serde(default, rename = "eai:appName")]
    pub app_name: String,
    #[serde(default, rename = "eai:userName")]
    pub user_name: String,
    #[serde(flatten)]
    properties: BTreeMap<String, Value>,
}

impl KvCollectionConfig {
    pub fn fields(&self) -> BTreeMap<String, KvFieldType> {
        self.properties
            .iter()
            .filter_map(|(key, value)| {
                let name = key.strip_prefix(FIELD_PREFIX)?;
                let kind = KvFieldType::from_str(value.as_str()?).ok()?;
                Some((name.to_string(), kind))
            })
            .collect()
    }

    /// Accelerated field name to its JSON index definition.
    pub fn accelerated_fields(&self) -> BTreeMap<String, String> {
        self.properties
            .iter()
            .filter_map(|(key, value)| {
                let name = key.strip_prefix(ACCELERATED_PREFIX)?;
                Some((name.to_string(), value.as_str()?.to_string()))
            })
            .collect()
    }

    pub fn enforce_types(&self) -> bool {
        self.flag("enforceTypes")
    }

    pub fn replicate(&self) -> bool {
        self.flag("replicate")
    }

    fn flag(&self, key: &str) -> bool {
        match self.properties.get(key) {
            Some(Value::Bool(value)) => *value,
            Some(Value::String(value)) => matches!(value.as_str(), "1" | "true"),
            Some(Value::Number(value)) => value.as_u64() == Some(1),
            _ => false,
        }
    }
}

/// KV store collection definitions (`storage/collections/config`).
#[derive(Debug, Clone)]
pub struct KvStoreCollections {
    collection: Collection<KvCollectionConfig>,
}

impl KvStoreCollections {
    pub fn new(client: &Client) -> Self {
        Self {
            collection: Collection::new(client, "KV Store collections", KV_CONFIG_PATH),
        }
    }

    pub fn namespaced(client: &Client, namespace: &Namespace) -> Self {
        Self {
            collection: Collection::namespaced(
                client,
                "KV Store collections",
                KV_CONFIG_PATH,
                namespace,
            ),
        }
    }

    pub fn collection(&self) -> &Collection<KvCollectionConfig> {
        &self.collection
    }

    pub async fn list(&self) -> Result<Vec<Entry<KvCollectionConfig>>, RestError> {
        self.collection.list().await
    }

    pub async fn get(&self, name: &str) -> Result<Entry<KvCollectionConfig>, RestError> {
        self.collection.get(name).await
    }

    pub async fn create(
        &self,
        name: &str,
        fields: &BTreeMap<String, KvFieldType>,
    ) -> Result<Entry<KvCollectionConfig>, RestError> {
        let mut params = field_params(fields);
        params.set("name", name);
        self.collection.create(name, &params).await
    }

    pub async fn update_fields(
        &self,
        name: &str,
        fields: &BTreeMap<String, KvFieldType>,
    ) -> Result<(), RestError> {
        self.collection.update(name, &field_params(fields)).await
    }

    pub async fn delete(&self, name: &str) -> Result<(), RestError> {
        self.collection.delete(name).await
    }
}

fn field_params(fields: &BTreeMap<String, KvFieldType>) -> FormParams {
    fields
        .iter()
        .map(|(name, kind)| (format!("{}{}", FIELD_PREFIX, name), kind.to_string()))
        .collect()
}

#[derive(Debug, Deserialize)]
struct KeyResponse {
    #[serde(rename = "_key")]
    key: String,
}

/// Typed access to the records of one KV store collection
/// (`storage/collections/data/<collection>`). Records travel as JSON.
#[derive(Debug, Clone)]
pub struct KvStore<R> {
    client: Client,
    namespace: Namespace,
    collection: String,
    _record: PhantomData<fn() -> R>,
}

impl<R> KvStore<R>
where
    R: Serialize + DeserializeOwned,
{
    pub fn new(client: &Client, collection: &str) -> Self {
        Self::namespaced(client, collection, client.namespace())
    }

    pub fn namespaced(client: &Client, collection: &str, namespace: &Namespace) -> Self {
        Self {
            client: client.clone(),
            namespace: namespace.clone(),
            collection: collection.to_string(),
            _record: PhantomData,
        }
    }

    fn url(&self, extra: &[&str]) -> Result<Url, RestError> {
        if self.collection.is_empty() {
            return Err(RestError::invalid_param("collection", "must not be empty"));
        }
        let mut segments: Vec<&str> = KV_DATA_PATH.split('/').collect();
        segments.push(&self.collection);
        segments.extend_from_slice(extra);
        self.client
            .build_url(&self.namespace.services_ns_url(), &segments)
    }

    fn encode<T: Serialize>(&self, url: &Url, value: &T) -> Result<RequestBody, RestError> {
        serde_json::to_string(value)
            .map(RequestBody::Json)
            .map_err(|error| RestError::Encode {
                url: url.to_string(),
                error,
            })
    }

    /// Records matching the Mongo style `filter`, or every record without one.
    pub async fn query(&self, filter: Option<&Value>) -> Result<Vec<R>, RestError> {
        let mut url = self.url(&[])?;
        if let Some(filter) = filter {
            url.query_pairs_mut()
                .append_pair("query", &filter.to_string());
        }
        self.client
            .fetch_into(Method::Get, url, RequestBody::Empty)
            .await
    }

    pub async fn get(&self, key: &str) -> Result<R, RestError> {
        require_key(key)?;
        let url = self.url(&[key])?;
        self.client
            .fetch_into(Method::Get, url, RequestBody::Empty)
            .await
    }

    /// Stores a new record and returns the key the store assigned to it.
    pub async fn insert(&self, record: &R) -> Result<String, RestError> {
        let url = self.url(&[])?;
        let body = self.encode(&url, record)?;
        let response: KeyResponse = self.client.fetch_into(Method::Post, url, body).await?;
        Ok(response.key)
    }

    pub async fn update(&self, key: &str, record: &R) -> Result<(), RestError> {
        require_key(key)?;
        let url = self.url(&[key])?;
        let body = self.encode(&url, record)?;
        self.client.fetch(Method::Post, url, body).await
    }

    /// Inserts or replaces many records at once, returning their keys in order.
    pub async fn batch_save(&self, records: &[R]) -> Result<Vec<String>, RestError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.url(&["batch_save"])?;
        let body = self.encode(&url, &records)?;
        self.client.fetch_into(Method::Post, url, body).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), RestError> {
        require_key(key)?;
        let url = self.url(&[key])?;
        self.client
            .fetch(Method::Delete, url, RequestBody::Empty)
            .await
    }

    /// Removes every record, keeping the collection definition.
    pub async fn delete_all(&self) -> Result<(), RestError> {
        let url = self.url(&[])?;
        self.client
            .fetch(Method::Delete, url, RequestBody::Empty)
            .await
    }
}

fn require_key(key: &str) -> Result<(), RestError> {
    if key.is_empty() {
        return Err(RestError::invalid_param("key", "must not be empty"));
    }
    Ok(())
}
