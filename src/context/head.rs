//! Request header carried on a [`Context`](super::Context).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A caller-owned request header that can project itself to a flat
/// key/value view.
pub trait RequestHeader: Send + Sync + fmt::Debug {
    /// Flat key/value projection.
    fn to_kv(&self) -> BTreeMap<String, Value>;

    /// JSON snapshot written into message envelopes.
    fn to_json(&self) -> Value {
        Value::Object(self.to_kv().into_iter().collect())
    }
}

// == Request Head ==
/// The usual request header of a service call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHead {
    pub uid: i64,
    pub source: i32,
    pub ip: String,
    pub region: String,
    pub dt: i32,
    pub unionid: String,
    #[serde(flatten)]
    pub properties: BTreeMap<String, String>,
}

impl RequestHeader for RequestHead {
    /// Typed fields plus properties. A property named like a typed field is
    /// skipped.
    fn to_kv(&self) -> BTreeMap<String, Value> {
        let mut kv = BTreeMap::from([
            ("uid".to_string(), Value::from(self.uid)),
            ("source".to_string(), Value::from(self.source)),
            ("ip".to_string(), Value::from(self.ip.clone())),
            ("region".to_string(), Value::from(self.region.clone())),
            ("dt".to_string(), Value::from(self.dt)),
            ("unionid".to_string(), Value::from(self.unionid.clone())),
        ]);

        for (key, value) in &self.properties {
            kv.entry(key.clone())
                .or_insert_with(|| Value::String(value.clone()));
        }
        kv
    }
}

// == Json Head ==
/// A header rebuilt from the JSON object of a received envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonHead(Map<String, Value>);

impl JsonHead {
    /// Wraps a JSON object. Anything else has no key/value projection.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl RequestHeader for JsonHead {
    fn to_kv(&self) -> BTreeMap<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}
