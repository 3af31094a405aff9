//! Properties
//!
//! The symbolic schema shared by examples, questions and trees. A [`PropertyMap`]
//! is an ordered list of keys, each with a closed vocabulary of values. Both keys
//! and values are addressed by dense indices; [`UNDEFINED_INDEX`] marks a key
//! or value that is not known.
use crate::constants::{UNDEFINED_INDEX, UNDEFINED_STRING};
use crate::errors::CartError;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::Index;
use std::rc::Rc;

pub type KeyIndex = usize;
pub type ValueIndex = usize;

/// Shared, read-only handle on a property map.
pub type PropertyMapRef = Rc<PropertyMap>;

/// Bijective symbol to index mapping of one key's values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ValueMap {
    symbols: Vec<String>,
    index: HashMap<String, ValueIndex>,
}

impl ValueMap {
    fn build(key: &str, symbols: Vec<String>) -> Result<Self, CartError> {
        let mut index = HashMap::with_capacity(symbols.len());
        for (i, s) in symbols.iter().enumerate() {
            if index.insert(s.clone(), i).is_some() {
                return Err(CartError::DuplicateValue(key.to_string(), s.clone()));
            }
        }
        Ok(ValueMap { symbols, index })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Index of a symbol, if it is part of the vocabulary.
    pub fn index(&self, symbol: &str) -> Option<ValueIndex> {
        self.index.get(symbol).copied()
    }

    /// Symbol of an index, [`UNDEFINED_STRING`] if out of range.
    pub fn symbol(&self, index: ValueIndex) -> &str {
        self.symbols.get(index).map(String::as_str).unwrap_or(UNDEFINED_STRING)
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn iter(&self) -> impl Iterator<Item = (ValueIndex, &str)> {
        self.symbols.iter().enumerate().map(|(i, s)| (i, s.as_str()))
    }
}

impl TryFrom<Vec<String>> for ValueMap {
    type Error = CartError;
    fn try_from(symbols: Vec<String>) -> Result<Self, Self::Error> {
        ValueMap::build(UNDEFINED_STRING, symbols)
    }
}

impl From<ValueMap> for Vec<String> {
    fn from(values: ValueMap) -> Self {
        values.symbols
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
    }
}

/// A key together with its vocabulary, the serialized form of one schema entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub key: String,
    pub values: Vec<String>,
}

/// Ordered keys with their closed vocabularies.
///
/// A default constructed map has no keys and counts as unset; operations
/// that need a schema reject it with [`CartError::UnsetPropertyMap`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<PropertyDefinition>", into = "Vec<PropertyDefinition>")]
pub struct PropertyMap {
    keys: Vec<String>,
    values: Vec<ValueMap>,
    key_index: HashMap<String, KeyIndex>,
}

impl PropertyMap {
    /// Build a map from keys and their vocabularies.
    ///
    /// * `keys` - Key names, in order.
    /// * `values` - One vocabulary per key; each must contain at least two symbols.
    pub fn new(keys: Vec<String>, values: Vec<Vec<String>>) -> Result<Self, CartError> {
        if keys.len() != values.len() {
            return Err(CartError::MismatchedKeyValueCounts(keys.len(), values.len()));
        }
        let mut key_index = HashMap::with_capacity(keys.len());
        let mut value_maps = Vec::with_capacity(values.len());
        for (i, (key, symbols)) in keys.iter().zip(values).enumerate() {
            if symbols.len() < 2 {
                return Err(CartError::InvalidVocabulary(key.clone(), symbols.len()));
            }
            if key_index.insert(key.clone(), i).is_some() {
                return Err(CartError::DuplicateKey(key.clone()));
            }
            value_maps.push(ValueMap::build(key, symbols)?);
        }
        Ok(PropertyMap {
            keys,
            values: value_maps,
            key_index,
        })
    }

    pub fn from_definitions(definitions: Vec<PropertyDefinition>) -> Result<Self, CartError> {
        let (keys, values) = definitions.into_iter().map(|d| (d.key, d.values)).unzip();
        PropertyMap::new(keys, values)
    }

    pub fn definitions(&self) -> Vec<PropertyDefinition> {
        self.keys
            .iter()
            .zip(self.values.iter())
            .map(|(key, values)| PropertyDefinition {
                key: key.clone(),
                values: values.symbols().to_vec(),
            })
            .collect()
    }

    pub fn is_set(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Fail with [`CartError::UnsetPropertyMap`] if the map has no keys.
    pub fn require_set(&self) -> Result<(), CartError> {
        if self.is_set() {
            Ok(())
        } else {
            Err(CartError::UnsetPropertyMap)
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, name: &str) -> Option<KeyIndex> {
        self.key_index.get(name).copied()
    }

    /// Name of a key, [`UNDEFINED_STRING`] if out of range.
    pub fn key_name(&self, index: KeyIndex) -> &str {
        self.keys.get(index).map(String::as_str).unwrap_or(UNDEFINED_STRING)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn exists(&self, name: &str) -> bool {
        self.key_index.contains_key(name)
    }

    pub fn is_defined(index: usize) -> bool {
        index != UNDEFINED_INDEX
    }

    /// Vocabulary of a key.
    pub fn values(&self, index: KeyIndex) -> Result<&ValueMap, CartError> {
        self.require_set()?;
        self.values
            .get(index)
            .ok_or(CartError::KeyIndexOutOfRange(index, self.keys.len()))
    }

    /// Resolve a key name.
    pub fn require_key(&self, name: &str) -> Result<KeyIndex, CartError> {
        self.require_set()?;
        self.key(name).ok_or_else(|| CartError::UnknownKey(name.to_string()))
    }

    /// Resolve a key and value by name.
    pub fn require_value(&self, key: &str, value: &str) -> Result<(KeyIndex, ValueIndex), CartError> {
        let key_index = self.require_key(key)?;
        let values = &self.values[key_index];
        match values.index(value) {
            Some(v) => Ok((key_index, v)),
            None => Err(CartError::UnknownValue(
                key.to_string(),
                value.to_string(),
                values.symbols().join(" "),
            )),
        }
    }

    /// Structural differences to another map, empty when both are equal.
    pub fn diff(&self, other: &PropertyMap) -> PropertyMapDiff {
        let mut differences = Vec::new();
        for (key, values) in self.keys.iter().zip(self.values.iter()) {
            match other.key(key) {
                None => differences.push(format!("key \"{}\" only in first map", key)),
                Some(j) => {
                    let i = self.key_index[key];
                    if i != j {
                        differences.push(format!("key \"{}\" has index {} and {}", key, i, j));
                    }
                    if values != &other.values[j] {
                        differences.push(format!(
                            "key \"{}\" has values {{{}}} and {{{}}}",
                            key,
                            values.symbols().join(" "),
                            other.values[j].symbols().join(" ")
                        ));
                    }
                }
            }
        }
        for key in other.keys.iter().filter(|k| !self.exists(k)) {
            differences.push(format!("key \"{}\" only in second map", key));
        }
        PropertyMapDiff { differences }
    }
}

impl Index<KeyIndex> for PropertyMap {
    type Output = ValueMap;
    fn index(&self, index: KeyIndex) -> &Self::Output {
        &self.values[index]
    }
}

impl PartialEq for PropertyMap {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys && self.values == other.values
    }
}

impl TryFrom<Vec<PropertyDefinition>> for PropertyMap {
    type Error = CartError;
    fn try_from(definitions: Vec<PropertyDefinition>) -> Result<Self, Self::Error> {
        PropertyMap::from_definitions(definitions)
    }
}

impl From<PropertyMap> for Vec<PropertyDefinition> {
    fn from(map: PropertyMap) -> Self {
        map.definitions()
    }
}

impl Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "properties:")?;
        for (key, values) in self.keys.iter().zip(self.values.iter()) {
            writeln!(f, "  {}: {}", key, values.symbols().join(" "))?;
        }
        Ok(())
    }
}

/// Report of the structural differences between two property maps.
#[derive(Debug, Clone, Default)]
pub struct PropertyMapDiff {
    pub differences: Vec<String>,
}

impl PropertyMapDiff {
    pub fn has_differences(&self) -> bool {
        !self.differences.is_empty()
    }
}

impl Display for PropertyMapDiff {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.differences.join("; "))
    }
}

/// Read-only view of one record's values.
pub trait Properties {
    /// Schema the record was built against.
    fn map(&self) -> &PropertyMap;

    /// Value of a key, `None` if the key is undefined for this record.
    fn value(&self, key: KeyIndex) -> Option<ValueIndex>;

    /// Value of a key, [`UNDEFINED_INDEX`] if the key is undefined for this record.
    fn index(&self, key: KeyIndex) -> ValueIndex {
        self.value(key).unwrap_or(UNDEFINED_INDEX)
    }

    /// Symbol of a key's value, looked up by names.
    fn symbol(&self, key: &str) -> Option<&str> {
        let map = self.map();
        let k = map.key(key)?;
        self.value(k).map(|v| map[k].symbol(v))
    }
}

/// Dense array backed properties.
#[derive(Debug, Clone)]
pub struct StoredProperties {
    map: PropertyMapRef,
    values: Vec<ValueIndex>,
}

impl StoredProperties {
    /// Properties with every key undefined.
    pub fn new(map: PropertyMapRef) -> Result<Self, CartError> {
        map.require_set()?;
        let values = vec![UNDEFINED_INDEX; map.len()];
        Ok(StoredProperties { map, values })
    }

    /// Properties from `(key, value)` name pairs; keys not listed stay undefined.
    pub fn from_pairs<K: AsRef<str>, V: AsRef<str>>(map: PropertyMapRef, pairs: &[(K, V)]) -> Result<Self, CartError> {
        let mut properties = StoredProperties::new(map)?;
        for (key, value) in pairs {
            properties.set(key.as_ref(), value.as_ref())?;
        }
        Ok(properties)
    }

    /// Properties from raw value indices, one per key.
    pub fn from_indices(map: PropertyMapRef, values: Vec<ValueIndex>) -> Result<Self, CartError> {
        map.require_set()?;
        if values.len() != map.len() {
            return Err(CartError::MismatchedKeyValueCounts(map.len(), values.len()));
        }
        for (k, v) in values.iter().enumerate() {
            if PropertyMap::is_defined(*v) && *v >= map[k].len() {
                return Err(CartError::ValueIndexOutOfRange(map.key_name(k).to_string(), *v));
            }
        }
        Ok(StoredProperties { map, values })
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CartError> {
        let (k, v) = self.map.require_value(key, value)?;
        self.values[k] = v;
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), CartError> {
        let k = self.map.require_key(key)?;
        self.values[k] = UNDEFINED_INDEX;
        Ok(())
    }

    pub fn map_ref(&self) -> &PropertyMapRef {
        &self.map
    }

    /// Defined `(key, value)` pairs by name.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| PropertyMap::is_defined(**v))
            .map(|(k, v)| (self.map.key_name(k).to_string(), self.map[k].symbol(*v).to_string()))
            .collect()
    }
}

impl Properties for StoredProperties {
    fn map(&self) -> &PropertyMap {
        &self.map
    }

    fn value(&self, key: KeyIndex) -> Option<ValueIndex> {
        match self.values.get(key) {
            Some(v) if PropertyMap::is_defined(*v) => Some(*v),
            _ => None,
        }
    }
}

impl Display for StoredProperties {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let pairs: Vec<String> = self.pairs().into_iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", pairs.join(" "))
    }
}
