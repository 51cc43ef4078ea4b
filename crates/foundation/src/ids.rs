use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of an ingested point.
///
/// Identity of a point is its id: two records with the same id are the same point.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(String);

impl PointId {
    pub fn new(id: impl Into<String>) -> Self {
        PointId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        PointId::new(s)
    }
}

impl From<String> for PointId {
    fn from(s: String) -> Self {
        PointId(s)
    }
}
