use super::envelope::null_as_default;
use super::namespace::{Namespace, Sharing, WILDCARD};
use crate::client::FormParams;
use serde::{Deserialize, Serialize};

pub const PARAM_SHARING: &str = "sharing";
pub const PARAM_OWNER: &str = "owner";
pub const PARAM_APP: &str = "app";
pub const PARAM_PERMS_READ: &str = "perms.read";
pub const PARAM_PERMS_WRITE: &str = "perms.write";

/// Owner, app, sharing level and role permissions of a resource.
///
/// Filled from server responses, or built by the caller right before a
/// partial [`Collection::update_acl`](super::Collection::update_acl).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlList {
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub sharing: Option<Sharing>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub perms: Perms,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default)]
    pub can_list: bool,
    #[serde(default)]
    pub can_share_app: bool,
    #[serde(default)]
    pub can_share_global: bool,
    #[serde(default)]
    pub can_share_user: bool,
    #[serde(default)]
    pub modifiable: bool,
    #[serde(default)]
    pub removable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perms {
    #[serde(default, deserialize_with = "null_as_default")]
    pub read: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub write: Vec<String>,
}

impl AccessControlList {
    /// Form parameters for the `acl` endpoint. Unset fields are left out and
    /// every permission role becomes its own value.
    pub fn to_params(&self) -> FormParams {
        let mut params = FormParams::new();
        if let Some(sharing) = self.sharing {
            params.set(PARAM_SHARING, sharing.to_string());
        }
        if !self.owner.is_empty() {
            params.set(PARAM_OWNER, self.owner.as_str());
        }
        if !self.app.is_empty() {
            params.set(PARAM_APP, self.app.as_str());
        }
        for role in &self.perms.read {
            params.add(PARAM_PERMS_READ, role.as_str());
        }
        for role in &self.perms.write {
            params.add(PARAM_PERMS_WRITE, role.as_str());
        }
        params
    }

    /// `<owner>/<app>/`, with `-`, `*` and blank all rendered as `-`.
    pub fn services_ns_path(&self) -> String {
        format!("{}/{}/", wildcard(&self.owner), wildcard(&self.app))
    }

    /// Namespace the resource lives in.
    pub fn namespace(&self) -> Namespace {
        let sharing = self.sharing.map(|s| s.to_string()).unwrap_or_default();
        Namespace::new(
            &wildcard(&self.owner),
            &wildcard(&self.app),
            &sharing,
        )
        .unwrap_or_default()
    }
}

fn wildcard(value: &str) -> String {
    match value.trim() {
        "" | "*" | WILDCARD => WILDCARD.to_string(),
        value => value.to_string(),
    }
}
