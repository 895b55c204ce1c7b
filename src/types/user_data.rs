use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Profile data accumulated over a conversation.
///
/// The endpoint returns fragments of this map on each turn.  Fragments are
/// merged shallowly: a key in the fragment overwrites the cached value, every
/// other cached key survives.  Nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserData(Map<String, Value>);

impl UserData {
    /// Create an empty map.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parse the persisted JSON text of a user-data map.
    ///
    /// The text must hold a JSON object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode for persistence.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Merge `fragment` into this map, key by key.
    pub fn merge(&mut self, fragment: &UserData) {
        for (key, value) in fragment.0.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Set a single key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a single key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no key has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for UserData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
