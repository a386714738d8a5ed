use crate::client::RestError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};

pub const WILDCARD: &str = "-";

/// Visibility level of a resource.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sharing {
    #[default]
    User,
    App,
    System,
    Global,
}

/// Owner, app and sharing that scope a REST call
/// (`/servicesNS/<owner>/<app>/...`). Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    owner: String,
    app: String,
    sharing: Sharing,
}

impl Default for Namespace {
    fn default() -> Self {
        Self {
            owner: WILDCARD.to_string(),
            app: WILDCARD.to_string(),
            sharing: Sharing::User,
        }
    }
}

impl Namespace {
    /// Blank owner or app become the `-` wildcard, blank sharing becomes `user`.
    /// Any other sharing value than `user`, `app`, `system` or `global` is rejected.
    pub fn new(owner: &str, app: &str, sharing: &str) -> Result<Self, RestError> {
        let sharing = match sharing.trim() {
            "" => Sharing::User,
            value => Sharing::from_str(value).map_err(|_| RestError::InvalidParam {
                name: "sharing".to_string(),
                reason: format!(
                    "{:?} is not one of user, app, system or global",
                    value
                ),
            })?,
        };

        Ok(Self {
            sharing,
            ..Self::scoped(owner, app)
        })
    }

    /// `user` sharing scoped to `owner` and `app`, blanks becoming `-`.
    pub fn scoped(owner: &str, app: &str) -> Self {
        Self {
            owner: or_wildcard(owner),
            app: or_wildcard(app),
            sharing: Sharing::User,
        }
    }

    /// The context the platform itself uses for system wide configuration.
    pub fn system() -> Self {
        Self {
            owner: "nobody".to_string(),
            app: "system".to_string(),
            sharing: Sharing::System,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn sharing(&self) -> Sharing {
        self.sharing
    }

    pub fn services_ns_url(&self) -> String {
        format!("/servicesNS/{}/{}/", self.owner, self.app)
    }
}

fn or_wildcard(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        WILDCARD.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_namespace_is_wildcard() {
        let ns = Namespace::new("", "", "").unwrap();
        assert_eq!("/servicesNS/-/-/", ns.services_ns_url());
        assert_eq!(Sharing::User, ns.sharing());
        assert_eq!(Namespace::default(), ns);
    }

    #[test]
    fn test_explicit_namespace() {
        let ns = Namespace::new("admin", "search", "app").unwrap();
        assert_eq!("/servicesNS/admin/search/", ns.services_ns_url());
        assert_eq!(Sharing::App, ns.sharing());
    }

    #[test]
    fn test_scoped_namespace() {
        let ns = Namespace::scoped(" admin ", "");
        assert_eq!("/servicesNS/admin/-/", ns.services_ns_url());
        assert_eq!(Sharing::User, ns.sharing());
    }

    #[test]
    fn test_invalid_sharing_is_rejected() {
        let err = Namespace::new("admin", "search", "everyone").unwrap_err();
        assert!(matches!(err, RestError::InvalidParam { ref name, .. } if name == "sharing"));
    }

    #[test]
    fn test_system_namespace() {
        assert_eq!(
            "/servicesNS/nobody/system/",
            Namespace::system().services_ns_url()
        );
    }

    #[test]
    fn test_sharing_display() {
        assert_eq!("global", Sharing::Global.to_string());
        assert_eq!(Sharing::System, "system".parse().unwrap());
    }
}
