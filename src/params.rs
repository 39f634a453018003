//! Typed metadata values and the ordered key-value mapping they are collected into.
use std::borrow::Cow;
use std::fmt::Display;
use std::ops::Index;

use indexmap::map::{IntoIter, Iter, Keys};
use indexmap::IndexMap;

/// A scalar or textual metadata value.
///
/// Numeric values read from free text are inferred with [`Value::infer`], which
/// tries an integer, then a floating point number, before settling on a string.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Coerce `text` into the narrowest type that parses it. The text is used
    /// as-is, callers are expected to trim it first.
    ///
    /// Only finite numbers become [`Value::Float`], so `inf` or `NaN` stay text.
    pub fn infer<S: AsRef<str>>(text: S) -> Value {
        let text = text.as_ref();
        if let Ok(v) = text.parse::<i64>() {
            Value::Int(v)
        } else if let Some(v) = text.parse::<f64>().ok().filter(|v| v.is_finite()) {
            Value::Float(v)
        } else {
            Value::String(text.to_string())
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as text, borrowing when it already is text
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::String(s) => Cow::Borrowed(s),
            _ => Cow::Owned(self.to_string()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            // Debug formatting keeps the decimal point on whole numbers
            Self::Float(v) => write!(f, "{v:?}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),+) => {$(
        impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Value::Int(value as i64)
            }
        }
    )+};
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

/**
A mapping from metadata key to [`Value`] that is always ordered lexicographically
by key, regardless of the order entries were inserted in.

A wrapper around [`indexmap::IndexMap`].
*/
#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct MetadataMap {
    entries: IndexMap<String, Value>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`, returning the value it replaced.
    ///
    /// An existing key keeps its position, a new key is placed at its sorted position.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }
        let position = self
            .entries
            .keys()
            .position(|k| k.as_str() > key.as_str())
            .unwrap_or(self.entries.len());
        self.entries.shift_insert(position, key, value);
        None
    }

    /// Insert every pair from `pairs`, later pairs overwriting earlier ones
    pub fn extend<I: IntoIterator<Item = (String, Value)>>(&mut self, pairs: I) {
        for (key, value) in pairs {
            self.insert(key, value);
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Get the key and value at position `index` in key order
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<(&str, &Value)> {
        self.entries
            .get_index(index)
            .map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Keys<'_, String, Value> {
        self.entries.keys()
    }

    /// Iterate over the keys and values in key order
    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.entries.iter()
    }

    #[cfg(feature = "serde")]
    /// Write the mapping out in JSON format to `writer`
    pub fn to_writer<W: std::io::Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for MetadataMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = <IndexMap<String, Value> as serde::Deserialize>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl Index<&str> for MetadataMap {
    type Output = Value;

    fn index(&self, key: &str) -> &Self::Output {
        &self.entries[key]
    }
}

impl IntoIterator for MetadataMap {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetadataMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MetadataMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_value_inference() {
        assert_eq!(Value::infer("2"), Value::Int(2));
        assert_eq!(Value::infer("-17"), Value::Int(-17));
        assert_eq!(Value::infer("0.65"), Value::Float(0.65));
        assert_eq!(Value::infer("1e3"), Value::Float(1000.0));
        assert_eq!(Value::infer("100 ms"), Value::String("100 ms".into()));
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert!(Value::infer("abc").as_float().is_none());
    }

    #[test]
    fn test_non_finite_stays_text() {
        for text in ["inf", "-Infinity", "NaN", "nan"] {
            assert_eq!(Value::infer(text), Value::String(text.into()));
        }
        let map: MetadataMap = [("Shutter", Value::infer("inf"))].into_iter().collect();
        assert_eq!(map, map.clone());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Float(520.0).to_string(), "520.0");
        assert_eq!(Value::Float(-1.0).to_string(), "-1.0");
        assert_eq!(Value::Float(0.125).to_string(), "0.125");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::from("GFP").to_text(), "GFP");
    }

    #[test]
    fn test_map_stays_sorted() {
        let mut map = MetadataMap::new();
        map.insert("uiWidth", 512u32);
        map.insert("dZoom", 1.0);
        map.insert("binaryLayers", 0u32);
        map.insert("Gain", 2);
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["Gain", "binaryLayers", "dZoom", "uiWidth"]);

        let prior = map.insert("dZoom", 2.5);
        assert_eq!(prior, Some(Value::Float(1.0)));
        assert_eq!(map.len(), 4);
        assert_eq!(map["dZoom"], Value::Float(2.5));
        assert_eq!(map.get_index(2).map(|(k, _)| k), Some("dZoom"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip_sorts_keys() {
        let map: MetadataMap = serde_json::from_str(r#"{"z": 1, "Gain": "high", "a": 2.5}"#).unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["Gain", "a", "z"]);
        assert_eq!(map["a"], Value::Float(2.5));

        let mut buffer = Vec::new();
        map.to_writer(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(!text.contains("entries"));
        let reread: MetadataMap = serde_json::from_str(&text).unwrap();
        assert_eq!(reread, map);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"Gain":"high","a":2.5,"z":1}"#);
    }
}
