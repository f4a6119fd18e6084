//! Helpers for following links embedded in Redfish documents
//!
//! A document references a child resource through an object holding the
//! resource path under [`ODATA_ID`]:
//!
//! ```json
//! { "Processors": { "@odata.id": "/redfish/v1/Systems/1/Processors" } }
//! ```
//!
//! Collections list their children as a sequence of such objects under
//! [`MEMBERS`].

use serde_json::Value;

/// Key holding a resource path inside a link object.
pub const ODATA_ID: &str = "@odata.id";

/// Key holding the member links of a collection.
pub const MEMBERS: &str = "Members";

/// Service root key holding the systems collection link.
pub const SYSTEMS: &str = "Systems";

/// Service root key holding the advertised protocol version.
pub const REDFISH_VERSION: &str = "RedfishVersion";

/// Canonical service root path.
pub const SERVICE_ROOT: &str = "/redfish/v1/";

/// Read the link stored under `key`.
pub fn link<'a>(document: &'a Value, key: &str) -> Option<&'a str> {
    document.get(key).and_then(link_target)
}

/// Read the path out of a link object.
pub fn link_target(link: &Value) -> Option<&str> {
    link.get(ODATA_ID).and_then(Value::as_str)
}

/// Member links of a collection document, in document order.
///
/// Entries that are not link objects are skipped. A missing or malformed
/// `Members` field yields no links.
pub fn members(collection: &Value) -> Vec<String> {
    collection
        .get(MEMBERS)
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(link_target)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Follow a chain of object keys, e.g. `["MemorySummary", "TotalSystemMemoryGiB"]`.
pub fn lookup<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(document, |current, key| current.get(key))
}

/// Identifier derived from the last segment of a resource path.
///
/// Trailing slashes are ignored, so `/redfish/v1/Systems/1/` yields `1`.
pub fn derive_id(link: &str) -> String {
    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
