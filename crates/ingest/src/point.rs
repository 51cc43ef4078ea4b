use std::collections::BTreeMap;

use foundation::{LatLng, PointId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InvalidPoint;

/// Attribute keys with a canonical spelling.
pub mod attr {
    pub const ADDRESS: &str = "address";
    pub const RACK_TYPE: &str = "rackType";
    pub const SIGN_DESCRIPTION: &str = "signDescription";
    pub const SIGN_CODE: &str = "signCode";
    pub const INSTALL_DATE: &str = "installDate";
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Rack,
    Sign,
}

impl PointKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rack" => Some(PointKind::Rack),
            "sign" => Some(PointKind::Sign),
            _ => None,
        }
    }
}

/// An ingested point. Immutable once built; identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub id: PointId,
    pub position: LatLng,
    pub kind: PointKind,
    pub attributes: BTreeMap<String, String>,
}

impl Point {
    pub fn new(id: impl Into<PointId>, position: LatLng, kind: PointKind) -> Self {
        Self {
            id: id.into(),
            position,
            kind,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn address(&self) -> Option<&str> {
        self.attribute(attr::ADDRESS)
    }

    /// Marker title: the rack type, or "Street Sign" when there is none.
    pub fn display_title(&self) -> &str {
        self.attribute(attr::RACK_TYPE).unwrap_or("Street Sign")
    }

    /// Year the point was installed. Source data uses 1900 as an "unknown" sentinel.
    pub fn install_year(&self) -> Option<i32> {
        let raw = self.attribute(attr::INSTALL_DATE)?;
        let year: i32 = raw.get(..4)?.parse().ok()?;
        (year != 1900).then_some(year)
    }
}

/// A record as delivered by a [`crate::PointSource`], before validation.
///
/// Coordinates follow the feed convention: `x` is longitude, `y` is latitude.
/// Unrecognized fields are kept as attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawPoint {
    pub fn new(id: impl Into<String>, x: f64, y: f64, kind: PointKind) -> Self {
        let kind = match kind {
            PointKind::Rack => "rack",
            PointKind::Sign => "sign",
        };
        Self {
            id: Some(id.into()),
            x: Some(x),
            y: Some(y),
            kind: Some(kind.to_string()),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

fn canonical_key(key: &str) -> &str {
    match key {
        "rack_type" => attr::RACK_TYPE,
        "sign_description" => attr::SIGN_DESCRIPTION,
        "sign_code" => attr::SIGN_CODE,
        "date_inst" => attr::INSTALL_DATE,
        other => other,
    }
}

impl TryFrom<RawPoint> for Point {
    type Error = InvalidPoint;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        let id = match raw.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(InvalidPoint::MissingId),
        };
        let (Some(lng), Some(lat)) = (raw.x, raw.y) else {
            return Err(InvalidPoint::MissingCoordinates { id });
        };
        let position = LatLng::new(lat, lng);
        if !position.is_valid() {
            return Err(InvalidPoint::OutOfRange { id, lat, lng });
        }
        let kind = match raw.kind.as_deref() {
            None => PointKind::Rack,
            Some(s) => match PointKind::parse(s) {
                Some(kind) => kind,
                None => {
                    return Err(InvalidPoint::UnknownKind {
                        id,
                        kind: s.to_string(),
                    });
                }
            },
        };

        let mut attributes = BTreeMap::new();
        for (key, value) in raw.extra {
            let value = match value {
                Value::Null => continue,
                Value::String(s) => s,
                other => other.to_string(),
            };
            attributes.insert(canonical_key(&key).to_string(), value);
        }

        Ok(Point {
            id: PointId::new(id),
            position,
            kind,
            attributes,
        })
    }
}
