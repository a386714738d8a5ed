use super::acl::{
    AccessControlList, PARAM_APP, PARAM_OWNER, PARAM_PERMS_READ, PARAM_PERMS_WRITE, PARAM_SHARING,
};
use super::envelope::{CollectionResponse, Entry};
use super::namespace::Namespace;
use crate::client::{Client, FormParams, Method, RequestBody, RestError};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::{debug, instrument};
use url::Url;

pub const SERVICES_ROOT: &str = "/services/";
const SAVED_SEARCHES_MARKER: &str = "/saved/searches/";
const PERMS_SEPARATOR: &str = ", ";

/// Typed CRUD client over one family of REST resources.
///
/// `T` is the shape of each entry's `content`. The collection is bound to an
/// endpoint (`root` + `segments`) and a client; it can be reused for as many
/// calls as needed against that endpoint.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    client: Option<Client>,
    name: String,
    root: String,
    segments: Vec<String>,
    _content: PhantomData<fn() -> T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            client: None,
            name: String::new(),
            root: String::new(),
            segments: Vec::new(),
            _content: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: DeserializeOwned,
{
    /// Collection scoped to the client's default namespace.
    pub fn new(client: &Client, name: &str, path: &str) -> Self {
        Self::namespaced(client, name, path, client.namespace())
    }

    /// Collection scoped to an explicit namespace.
    pub fn namespaced(client: &Client, name: &str, path: &str, namespace: &Namespace) -> Self {
        Self::with_root(client, name, &namespace.services_ns_url(), path)
    }

    /// Collection under `/services/`, for resources that do not live in a namespace.
    pub fn global(client: &Client, name: &str, path: &str) -> Self {
        Self::with_root(client, name, SERVICES_ROOT, path)
    }

    fn with_root(client: &Client, name: &str, root: &str, path: &str) -> Self {
        Self {
            client: Some(client.clone()),
            name: name.to_string(),
            root: root.to_string(),
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
            _content: PhantomData,
        }
    }

    /// Appends one path segment, taken literally (it gets percent-encoded).
    pub fn with_segment(mut self, segment: &str) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unencoded path of the collection, e.g. `/servicesNS/-/-/storage/passwords`.
    pub fn path(&self) -> String {
        format!("{}{}", self.root, self.segments.join("/"))
    }

    fn entry_path(&self, entry_name: &str) -> String {
        format!("{}/{}", self.path(), entry_name)
    }

    fn client(&self) -> Result<&Client, RestError> {
        match &self.client {
            Some(client) if !self.name.is_empty() && !self.segments.is_empty() => Ok(client),
            _ => Err(RestError::UninitializedCollection {
                name: self.name.clone(),
                path: self.path(),
            }),
        }
    }

    fn url(&self, client: &Client, root: &str, extra: &[&str]) -> Result<Url, RestError> {
        let mut segments: Vec<&str> = self.segments.iter().map(|s| s.as_str()).collect();
        segments.extend_from_slice(extra);
        client.build_url(root, &segments)
    }

    /// Every entry of the collection.
    pub async fn list(&self) -> Result<Vec<Entry<T>>, RestError> {
        Ok(self.list_page(0, 0).await?.entry)
    }

    /// One page of entries with its paging metadata. A `count` of 0 asks for
    /// every entry.
    #[instrument(skip(self), fields(collection = %self.name))]
    pub async fn list_page(
        &self,
        offset: u64,
        count: u64,
    ) -> Result<CollectionResponse<T>, RestError> {
        let client = self.client()?;
        let mut url = self.url(client, &self.root, &[])?;
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("count", &count.to_string());

        client.fetch_into(Method::Get, url, RequestBody::Empty).await
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    pub async fn get(&self, entry_name: &str) -> Result<Entry<T>, RestError> {
        let client = self.client()?;
        require_name(entry_name)?;

        let url = self.url(client, &self.root, &[entry_name])?;
        let url_text = url.to_string();
        let response: CollectionResponse<T> =
            client.fetch_into(Method::Get, url, RequestBody::Empty).await?;

        first_entry(response, url_text)
    }

    /// Creates `entry_name` in the collection's own namespace.
    pub async fn create(&self, entry_name: &str, params: &FormParams) -> Result<Entry<T>, RestError> {
        let root = self.root.clone();
        self.create_under(&root, entry_name, params).await
    }

    /// Creates `entry_name` in `namespace` instead of the collection's namespace.
    pub async fn create_namespaced(
        &self,
        namespace: &Namespace,
        entry_name: &str,
        params: &FormParams,
    ) -> Result<Entry<T>, RestError> {
        self.create_under(&namespace.services_ns_url(), entry_name, params)
            .await
    }

    #[instrument(skip(self, params), fields(collection = %self.name))]
    async fn create_under(
        &self,
        root: &str,
        entry_name: &str,
        params: &FormParams,
    ) -> Result<Entry<T>, RestError> {
        let client = self.client()?;
        require_name(entry_name)?;
        require_params(params)?;

        let mut params = params.clone();
        if !params.contains("name") {
            params.set("name", entry_name);
        }

        let url = self.url(client, root, &[])?;
        let url_text = url.to_string();
        let response: CollectionResponse<T> = client
            .fetch_into(Method::Post, url, RequestBody::Form(params))
            .await?;

        first_entry(response, url_text)
    }

    #[instrument(skip(self, params), fields(collection = %self.name))]
    pub async fn update(&self, entry_name: &str, params: &FormParams) -> Result<(), RestError> {
        let client = self.client()?;
        require_name(entry_name)?;
        require_params(params)?;

        let url = self.url(client, &self.root, &[entry_name])?;
        client
            .fetch(Method::Post, url, RequestBody::Form(params.clone()))
            .await
    }

    #[instrument(skip(self), fields(collection = %self.name))]
    pub async fn delete(&self, entry_name: &str) -> Result<(), RestError> {
        let client = self.client()?;
        require_name(entry_name)?;

        let url = self.url(client, &self.root, &[entry_name])?;
        client.fetch(Method::Delete, url, RequestBody::Empty).await
    }

    /// Changes the ACL of `entry_name`, sending only what `acl` sets and
    /// completing the rest from the entry's current ACL.
    ///
    /// The endpoint needs `sharing` and `owner` on every call, accepts `app`
    /// only for saved searches, and blanks the permission list that is not
    /// sent. The current ACL is read right before the update, so a change made
    /// by someone else in between can be overwritten.
    #[instrument(skip(self, acl), fields(collection = %self.name))]
    pub async fn update_acl(
        &self,
        entry_name: &str,
        acl: &AccessControlList,
    ) -> Result<(), RestError> {
        let client = self.client()?;
        require_name(entry_name)?;

        let mut params = acl.to_params();
        let current = self.get(entry_name).await?.acl;

        if !params.has_value(PARAM_SHARING) {
            if let Some(sharing) = current.sharing {
                params.set(PARAM_SHARING, sharing.to_string());
            }
        }
        if !params.has_value(PARAM_OWNER) && !current.owner.is_empty() {
            params.set(PARAM_OWNER, current.owner.as_str());
        }

        if self.entry_path(entry_name).contains(SAVED_SEARCHES_MARKER) {
            if !params.has_value(PARAM_APP) && !current.app.is_empty() {
                params.set(PARAM_APP, current.app.as_str());
            }
        } else {
            params.remove(PARAM_APP);
        }

        match (
            params.has_value(PARAM_PERMS_READ),
            params.has_value(PARAM_PERMS_WRITE),
        ) {
            (true, false) => {
                for role in &current.perms.write {
                    params.add(PARAM_PERMS_WRITE, role.as_str());
                }
            }
            (false, true) => {
                for role in &current.perms.read {
                    params.add(PARAM_PERMS_READ, role.as_str());
                }
            }
            _ => {}
        }

        params.join_values(PARAM_PERMS_READ, PERMS_SEPARATOR);
        params.join_values(PARAM_PERMS_WRITE, PERMS_SEPARATOR);
        debug!("Reconciled ACL parameters {:?}", params);

        let url = self.url(client, &self.root, &[entry_name, "acl"])?;
        client
            .fetch(Method::Post, url, RequestBody::Form(params))
            .await
    }
}

fn require_name(entry_name: &str) -> Result<(), RestError> {
    if entry_name.trim().is_empty() {
        return Err(RestError::invalid_param("entry_name", "must not be empty"));
    }
    Ok(())
}

fn require_params(params: &FormParams) -> Result<(), RestError> {
    if params.is_empty() {
        return Err(RestError::invalid_param("params", "must not be empty"));
    }
    Ok(())
}

fn first_entry<T>(response: CollectionResponse<T>, url: String) -> Result<Entry<T>, RestError> {
    response
        .entry
        .into_iter()
        .next()
        .ok_or(RestError::EmptyResponse { url })
}
