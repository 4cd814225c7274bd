use crate::libs::error::{Error, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt;

/// Attribute keys kept on a feature. Everything else belongs to its regions.
pub const FEATURE_KEYS: [&str; 6] = ["ID", "Name", "Note", "Alias", "Parent", "Derives_from"];

//----------------------------
// AttrValue
//----------------------------
/// An attribute value, either a single string or a comma-separated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Single(String),
    List(Vec<String>),
}

impl AttrValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            AttrValue::Single(v) => vec![v.as_str()],
            AttrValue::List(list) => list.iter().map(|v| v.as_str()).collect(),
        }
    }

    /// The value itself, or the first element of a list
    pub fn first(&self) -> Option<&str> {
        match self {
            AttrValue::Single(v) => Some(v.as_str()),
            AttrValue::List(list) => list.first().map(|v| v.as_str()),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values().contains(&value)
    }

    fn encode(&self) -> String {
        self.values().iter().map(|v| escape(v)).join(",")
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Single(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Single(value)
    }
}

impl From<Vec<String>> for AttrValue {
    /// One-element lists are stored as single values
    fn from(mut list: Vec<String>) -> Self {
        if list.len() == 1 {
            AttrValue::Single(list.remove(0))
        } else {
            AttrValue::List(list)
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.values().join(","))
    }
}

//----------------------------
// Attributes
//----------------------------
/// Column 9 of a GFF3 row, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(IndexMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first())
    }

    /// All values of `key`, empty when absent
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.0.get(key).map(|v| v.values()).unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Replaces any previous value of `key`
    /// An empty list removes the key, it would not read back.
    pub fn insert(&mut self, key: &str, value: impl Into<AttrValue>) {
        match value.into() {
            AttrValue::List(list) if list.is_empty() => {
                self.0.shift_remove(key);
            }
            value => {
                self.0.insert(key.to_string(), value);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.0.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Union of both maps; keys of `other` win.
    pub fn merged(&self, other: &Attributes) -> Attributes {
        let mut merged = self.clone();
        for (k, v) in other.iter() {
            merged.insert(k, v.clone());
        }
        merged
    }

    /// Splits into the attributes whose key is in `keys` and the rest.
    pub fn split(self, keys: &[&str]) -> (Attributes, Attributes) {
        let mut picked = Attributes::new();
        let mut rest = Attributes::new();
        for (k, v) in self.0 {
            if keys.contains(&k.as_str()) {
                picked.0.insert(k, v);
            } else {
                rest.0.insert(k, v);
            }
        }
        (picked, rest)
    }

    /// Renders column 9. Keys are ordered `ID`, `Name`, the others
    /// alphabetically, then `Target` and `Gap`; an empty map becomes `.`.
    ///
    /// ```
    /// # use hitgff::libs::gff::Attributes;
    /// let mut attrs = Attributes::new();
    /// attrs.insert("Target", "EST23 1 21");
    /// attrs.insert("Note", "a=b; c");
    /// attrs.insert("ID", "match1");
    /// attrs.insert("Alias", vec!["x".to_string(), "y,z".to_string()]);
    /// assert_eq!(
    ///     attrs.encode(),
    ///     "ID=match1;Alias=x,y%2Cz;Note=a%3Db%3B c;Target=EST23 1 21"
    /// );
    /// assert_eq!(Attributes::new().encode(), ".");
    /// ```
    pub fn encode(&self) -> String {
        if self.is_empty() {
            return ".".to_string();
        }

        self.0
            .iter()
            .sorted_by(|(a, _), (b, _)| key_rank(a).cmp(&key_rank(b)).then_with(|| a.cmp(b)))
            .map(|(k, v)| format!("{}={}", escape(k), v.encode()))
            .join(";")
    }

    /// Parses column 9. Values containing commas become lists, escapes are
    /// decoded, a repeated key keeps its last value.
    ///
    /// ```
    /// # use hitgff::libs::gff::{AttrValue, Attributes};
    /// let attrs = Attributes::decode("ID=cds1;Parent=mRNA1,mRNA2;Note=5%25 GC%3B low").unwrap();
    /// assert_eq!(attrs.get_str("ID"), Some("cds1"));
    /// assert_eq!(attrs.values("Parent"), vec!["mRNA1", "mRNA2"]);
    /// assert_eq!(attrs.get("Note"), Some(&AttrValue::Single("5% GC; low".to_string())));
    ///
    /// assert!(Attributes::decode(".").unwrap().is_empty());
    /// assert!(Attributes::decode("ID").is_err());
    /// assert!(Attributes::decode("ID=a%2").is_err());
    /// ```
    pub fn decode(s: &str) -> Result<Attributes> {
        let mut attrs = Attributes::new();
        let s = s.trim();
        if s.is_empty() || s == "." {
            return Ok(attrs);
        }

        for pair in s.split(';') {
            let pair = pair.trim_start();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::validation(format!("Attribute without value: {}", pair)))?;

            let values = value.split(',').map(unescape).collect::<Result<Vec<_>>>()?;
            attrs.insert(&unescape(key)?, values);
        }

        Ok(attrs)
    }
}

impl std::str::FromStr for Attributes {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Attributes::decode(s)
    }
}

fn key_rank(key: &str) -> u8 {
    match key {
        "ID" => 0,
        "Name" => 1,
        "Target" => 3,
        "Gap" => 4,
        _ => 2,
    }
}

/// Percent-escapes the characters with a meaning in column 9.
pub fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '=' => escaped.push_str("%3D"),
            ';' => escaped.push_str("%3B"),
            ',' => escaped.push_str("%2C"),
            '\t' => escaped.push_str("%09"),
            '\n' => escaped.push_str("%0A"),
            '\r' => escaped.push_str("%0D"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Decodes every `%XX` sequence.
pub fn unescape(s: &str) -> Result<String> {
    if !s.contains('%') {
        return Ok(s.to_string());
    }

    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::validation(format!("Malformed escape in: {}", s)))?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded)
        .map_err(|_| Error::validation(format!("Escape is not valid UTF-8: {}", s)))
}
