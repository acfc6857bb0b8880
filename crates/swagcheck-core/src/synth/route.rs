//! Routing literal test parameters to their place in the request

use serde_json::{Map, Value};

use crate::description::Location;
use crate::synth::expand::ExpandedParameters;

/// Literal parameters split by destination.
///
/// `query`, `header` and `body` are `None` when nothing was routed there.
/// `path` stays `Some` (possibly empty) whenever routing ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutedParameters {
    pub path: Option<Map<String, Value>>,
    pub query: Option<Map<String, Value>>,
    pub header: Option<Map<String, Value>>,
    /// Flat (dotted-key) body fields
    pub body: Option<Map<String, Value>>,
    /// Parameters with no usable location; never sent
    pub invalid: Map<String, Value>,
}

/// Where a literal parameter named `key` belongs.
#[must_use]
pub fn locate(key: &str, expanded: &ExpandedParameters) -> Location {
    if let Some(definition) = expanded.get(key) {
        return match definition.location {
            Location::Path => Location::Path,
            Location::Query => Location::Query,
            Location::Header => Location::Header,
            Location::Body | Location::Invalid => Location::Invalid,
        };
    }
    if expanded.body_has_property(key) {
        Location::Body
    } else {
        Location::Invalid
    }
}

/// Route every literal. Unknown keys land in `invalid` without failing.
#[must_use]
pub fn route(literals: Map<String, Value>, expanded: &ExpandedParameters) -> RoutedParameters {
    let mut path = Map::new();
    let mut query = Map::new();
    let mut header = Map::new();
    let mut body = Map::new();
    let mut invalid = Map::new();

    for (key, value) in literals {
        let bucket = match locate(&key, expanded) {
            Location::Path => &mut path,
            Location::Query => &mut query,
            Location::Header => &mut header,
            Location::Body => &mut body,
            Location::Invalid => {
                tracing::debug!(parameter = %key, "dropping parameter with no declared location");
                &mut invalid
            }
        };
        bucket.insert(key, value);
    }

    RoutedParameters {
        path: Some(path),
        query: non_empty(query),
        header: non_empty(header),
        body: non_empty(body),
        invalid,
    }
}

fn non_empty(bucket: Map<String, Value>) -> Option<Map<String, Value>> {
    (!bucket.is_empty()).then_some(bucket)
}
