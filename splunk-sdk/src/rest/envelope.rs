use super::acl::AccessControlList;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Top level JSON document returned by every collection endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct CollectionResponse<T> {
    #[serde(default)]
    pub links: BTreeMap<String, String>,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub entry: Vec<Entry<T>>,
    #[serde(default)]
    pub paging: Paging,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub total: u64,
    #[serde(default, rename = "perPage")]
    pub per_page: u64,
    #[serde(default)]
    pub offset: u64,
}

/// One resource instance with its typed `content`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Entry<T> {
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub links: EntryLinks,
    #[serde(default, deserialize_with = "null_as_default")]
    pub acl: AccessControlList,
    pub content: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntryLinks {
    #[serde(default)]
    pub alternate: String,
    #[serde(default)]
    pub list: String,
    #[serde(default)]
    pub edit: String,
    #[serde(default)]
    pub remove: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Message {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// Treats an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::Sharing;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Password {
        username: String,
    }

    #[test]
    fn test_decode_collection() {
        let body = json!({
            "links": {"create": "/servicesNS/nobody/search/storage/passwords/_new"},
            "origin": "https://localhost:8089/servicesNS/nobody/search/storage/passwords",
            "generator": {"build": "abc", "version": "9.1.0"},
            "entry": [{
                "name": "realm:bob:",
                "id": "https://localhost:8089/servicesNS/nobody/search/storage/passwords/realm%3Abob%3A",
                "author": "admin",
                "links": {"list": "/servicesNS/nobody/search/storage/passwords/realm%3Abob%3A", "remove": "/x"},
                "acl": {
                    "app": "search",
                    "owner": "admin",
                    "sharing": "app",
                    "perms": {"read": ["*"], "write": ["admin"]},
                    "can_write": true
                },
                "content": {"username": "bob", "eai:acl": null}
            }],
            "paging": {"total": 1, "perPage": 30, "offset": 0},
            "messages": []
        });

        let decoded: CollectionResponse<Password> = serde_json::from_value(body).unwrap();
        assert_eq!(1, decoded.entry.len());
        assert_eq!(30, decoded.paging.per_page);

        let entry = &decoded.entry[0];
        assert_eq!("realm:bob:", entry.name);
        assert_eq!("bob", entry.content.username);
        assert_eq!(Some(Sharing::App), entry.acl.sharing);
        assert_eq!(vec!["admin"], entry.acl.perms.write);
        assert!(entry.links.remove.starts_with('/'));
    }

    #[test]
    fn test_decode_null_acl_and_perms() {
        let body = json!({
            "entry": [{"name": "x", "acl": {"owner": "nobody", "perms": null}, "content": "value"}]
        });
        let decoded: CollectionResponse<String> = serde_json::from_value(body).unwrap();
        assert!(decoded.entry[0].acl.perms.read.is_empty());
        assert_eq!("value", decoded.entry[0].content);
    }
}
