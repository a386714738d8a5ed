mod acl;
mod collection;
mod credentials;
mod envelope;
mod kvstore;
mod namespace;
mod properties;
mod users;

pub use acl::{
    AccessControlList, Perms, PARAM_APP, PARAM_OWNER, PARAM_PERMS_READ, PARAM_PERMS_WRITE,
    PARAM_SHARING,
};
pub use collection::{Collection, SERVICES_ROOT};
pub use credentials::{credential_id, Credential, Credentials, CREDENTIALS_PATH};
pub use envelope::{CollectionResponse, Entry, EntryLinks, Message, Paging};
pub use kvstore::{
    KvCollectionConfig, KvFieldType, KvStore, KvStoreCollections, KV_CONFIG_PATH, KV_DATA_PATH,
};
pub use namespace::{Namespace, Sharing, WILDCARD};
pub use properties::{conf_name, Properties, PROPERTIES_PATH};
pub use users::{User, Users, USERS_PATH};

#[cfg(test)]
pub(crate) use collection::tests as test_support;

pub mod prelude {
    pub use super::{
        credential_id, AccessControlList, Collection, CollectionResponse, Credential,
        Credentials, Entry, KvCollectionConfig, KvFieldType, KvStore, KvStoreCollections,
        Namespace, Perms, Properties, Sharing, User, Users,
    };
}
