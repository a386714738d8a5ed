use super::acl::AccessControlList;
use super::collection::Collection;
use super::envelope::Entry;
use super::namespace::Namespace;
use crate::client::{Client, FormParams, RestError};
use educe::Educe;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const CREDENTIALS_PATH: &str = "storage/passwords";

#[derive(Educe, Clone, Deserialize)]
#[educe(Debug)]
pub struct Credential {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub realm: String,
    #[serde(default)]
    #[educe(Debug(ignore))]
    pub clear_password: String,
    #[serde(default)]
    #[educe(Debug(ignore))]
    pub encr_password: String,
}

/// Name of a stored credential: `<realm>:<user>:`, or `:<user>:` without realm.
pub fn credential_id(realm: &str, user: &str) -> String {
    format!("{}:{}:", realm, user)
}

/// Secrets stored encrypted by the platform (`storage/passwords`).
#[derive(Debug, Clone)]
pub struct Credentials {
    collection: Collection<Credential>,
}

impl Credentials {
    pub fn new(client: &Client) -> Self {
        Self {
            collection: Collection::new(client, "credentials", CREDENTIALS_PATH),
        }
    }

    pub fn namespaced(client: &Client, namespace: &Namespace) -> Self {
        Self {
            collection: Collection::namespaced(client, "credentials", CREDENTIALS_PATH, namespace),
        }
    }

    pub fn collection(&self) -> &Collection<Credential> {
        &self.collection
    }

    pub async fn list(&self) -> Result<Vec<Entry<Credential>>, RestError> {
        self.collection.list().await
    }

    pub async fn get(&self, realm: &str, user: &str) -> Result<Entry<Credential>, RestError> {
        require_user(user)?;
        self.collection.get(&credential_id(realm, user)).await
    }

    pub async fn create(
        &self,
        realm: &str,
        user: &str,
        password: &SecretString,
    ) -> Result<Entry<Credential>, RestError> {
        require_user(user)?;
        let mut params = FormParams::new();
        params.set("password", password.expose_secret());
        if !realm.is_empty() {
            params.set("realm", realm);
        }
        self.collection.create(user, &params).await
    }

    pub async fn update_password(
        &self,
        realm: &str,
        user: &str,
        password: &SecretString,
    ) -> Result<(), RestError> {
        require_user(user)?;
        let params = FormParams::from([("password", password.expose_secret())]);
        self.collection
            .update(&credential_id(realm, user), &params)
            .await
    }

    pub async fn delete(&self, realm: &str, user: &str) -> Result<(), RestError> {
        require_user(user)?;
        self.collection.delete(&credential_id(realm, user)).await
    }

    pub async fn update_acl(
        &self,
        realm: &str,
        user: &str,
        acl: &AccessControlList,
    ) -> Result<(), RestError> {
        require_user(user)?;
        self.collection
            .update_acl(&credential_id(realm, user), acl)
            .await
    }
}

fn require_user(user: &str) -> Result<(), RestError> {
    if user.is_empty() {
        return Err(RestError::invalid_param("user", "must not be empty"));
    }
    Ok(())
}
