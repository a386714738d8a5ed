use super::collection::Collection;
use super::envelope::Entry;
use super::envelope::null_as_default;
use crate::client::{Client, FormParams, RestError};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const USERS_PATH: &str = "authentication/users";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub realname: String,
    #[serde(default, rename = "defaultApp")]
    pub default_app: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub tz: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// User management (`authentication/users`). Users are not namespaced.
#[derive(Debug, Clone)]
pub struct Users {
    collection: Collection<User>,
}

impl Users {
    pub fn new(client: &Client) -> Self {
        Self {
            collection: Collection::global(client, "users", USERS_PATH),
        }
    }

    pub fn collection(&self) -> &Collection<User> {
        &self.collection
    }

    pub async fn list(&self) -> Result<Vec<Entry<User>>, RestError> {
        self.collection.list().await
    }

    pub async fn get(&self, name: &str) -> Result<Entry<User>, RestError> {
        self.collection.get(name).await
    }

    pub async fn create(
        &self,
        name: &str,
        password: &SecretString,
        roles: &[&str],
    ) -> Result<Entry<User>, RestError> {
        if roles.is_empty() {
            return Err(RestError::invalid_param("roles", "at least one role is required"));
        }
        let mut params = FormParams::new();
        params.set("password", password.expose_secret());
        for role in roles {
            params.add("roles", *role);
        }
        self.collection.create(name, &params).await
    }

    pub async fn set_roles(&self, name: &str, roles: &[&str]) -> Result<(), RestError> {
        let params: FormParams = roles.iter().map(|role| ("roles", *role)).collect();
        self.collection.update(name, &params).await
    }

    pub async fn update(&self, name: &str, params: &FormParams) -> Result<(), RestError> {
        self.collection.update(name, params).await
    }

    pub async fn delete(&self, name: &str) -> Result<(), RestError> {
        self.collection.delete(name).await
    }
}
