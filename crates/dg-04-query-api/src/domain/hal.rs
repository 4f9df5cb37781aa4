//! HAL envelopes.
//!
//! ```json
//! { "_embedded": { ... }, "_links": { "self": { "href": "/token/CA1" } } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const HAL_CONTENT_TYPE: &str = "application/hal+json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalLink {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hal {
    #[serde(rename = "_embedded")]
    pub embedded: Value,
    #[serde(rename = "_links")]
    pub links: BTreeMap<String, HalLink>,
}

impl Hal {
    pub fn new(embedded: impl Into<Value>, self_href: impl Into<String>) -> Self {
        let mut links = BTreeMap::new();
        links.insert("self".to_string(), HalLink { href: self_href.into() });
        Self {
            embedded: embedded.into(),
            links,
        }
    }

    pub fn with_link(mut self, rel: &str, href: impl Into<String>) -> Self {
        self.links.insert(rel.to_string(), HalLink { href: href.into() });
        self
    }

    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links.get(rel).map(|l| l.href.as_str())
    }
}

/// `path` with `pairs` appended as a query string.
pub fn with_query(path: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{path}?{}", query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let hal = Hal::new(json!({"amount": "10"}), "/token/CA1/account/A1")
            .with_link("next", "/x?offset=1");
        let value = serde_json::to_value(&hal).unwrap();
        assert_eq!(value["_embedded"]["amount"], "10");
        assert_eq!(value["_links"]["self"]["href"], "/token/CA1/account/A1");
        assert_eq!(value["_links"]["next"]["href"], "/x?offset=1");
    }

    #[test]
    fn test_with_query() {
        assert_eq!(with_query("/a", &[]), "/a");
        assert_eq!(
            with_query("/a", &[("offset", "5".into()), ("reverse", "true".into())]),
            "/a?offset=5&reverse=true"
        );
    }
}
