//! Runtime support for generated code
//!
//! Generated units refer to this module through the configured runtime path
//! (`::declgen::runtime` by default). It holds the error types returned by
//! constructors, builders and converters, the structural [`Value`] that
//! converters encode into, and the [`Leaf`] encoder for primitive and
//! collection fields.

use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::Hash;
use std::sync::OnceLock;
use thiserror::Error;

pub use tracing;

/// A constructor contract did not hold
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ContractViolation {
    field: String,
    message: String,
}

impl ContractViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The field or parameter the contract guards
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Returned by generated `build()` methods
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Cannot build {type_name}: missing required fields {}", .fields.join(", "))]
    Missing { type_name: String, fields: Vec<String> },

    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

impl BuildError {
    pub fn missing(type_name: &str, fields: Vec<&str>) -> Self {
        BuildError::Missing {
            type_name: type_name.to_string(),
            fields: fields.into_iter().map(String::from).collect(),
        }
    }

    /// Every required field that was not set
    pub fn missing_fields(&self) -> &[String] {
        match self {
            BuildError::Missing { fields, .. } => fields,
            BuildError::Contract(_) => &[],
        }
    }
}

/// Returned by generated `decode()` functions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("expected {expected} but found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{value} is out of range for {expected}")]
    OutOfRange { value: String, expected: &'static str },

    #[error("{type_name} has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("field `{field}` appears more than once in {type_name}")]
    DuplicateField { type_name: String, field: String },

    #[error("{type_name}.{field}: {source}")]
    Field {
        type_name: String,
        field: String,
        #[source]
        source: Box<ConversionError>,
    },

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl ConversionError {
    fn mismatch(expected: &'static str, found: &Value) -> Self {
        ConversionError::Mismatch {
            expected,
            found: found.kind(),
        }
    }

    /// The error without field context
    pub fn root(&self) -> &ConversionError {
        match self {
            ConversionError::Field { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Structural value produced by converters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    /// Named entries in declaration order
    Record(Vec<(String, Value)>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Unsigned(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Entry of a record by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(entries) => entries.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Entry names of a record in order
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            Value::Record(entries) => entries.iter().map(|(n, _)| n.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Reads and writes one value
pub trait Leaf: Sized {
    fn to_value(&self) -> Value;
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

macro_rules! signed_leaf {
    ($($t:ty),*) => {$(
        impl Leaf for $t {
            fn to_value(&self) -> Value {
                Value::Integer(*self as i64)
            }

            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                let out_of_range = |v: String| ConversionError::OutOfRange {
                    value: v,
                    expected: stringify!($t),
                };
                match value {
                    Value::Integer(n) => {
                        <$t>::try_from(*n).map_err(|_| out_of_range(n.to_string()))
                    }
                    Value::Unsigned(n) => {
                        <$t>::try_from(*n).map_err(|_| out_of_range(n.to_string()))
                    }
                    other => Err(ConversionError::mismatch(stringify!($t), other)),
                }
            }
        }
    )*};
}

macro_rules! unsigned_leaf {
    ($($t:ty),*) => {$(
        impl Leaf for $t {
            fn to_value(&self) -> Value {
                Value::Unsigned(*self as u64)
            }

            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                let out_of_range = |v: String| ConversionError::OutOfRange {
                    value: v,
                    expected: stringify!($t),
                };
                match value {
                    Value::Integer(n) => {
                        <$t>::try_from(*n).map_err(|_| out_of_range(n.to_string()))
                    }
                    Value::Unsigned(n) => {
                        <$t>::try_from(*n).map_err(|_| out_of_range(n.to_string()))
                    }
                    other => Err(ConversionError::mismatch(stringify!($t), other)),
                }
            }
        }
    )*};
}

signed_leaf!(i8, i16, i32, i64, isize);
unsigned_leaf!(u8, u16, u32, u64, usize);

impl Leaf for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(n) => Ok(*n as f64),
            Value::Unsigned(n) => Ok(*n as f64),
            other => Err(ConversionError::mismatch("f64", other)),
        }
    }
}

impl Leaf for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl Leaf for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(ConversionError::mismatch("bool", other)),
        }
    }
}

impl Leaf for char {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        if let Value::Text(s) = value {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return Ok(c);
            }
        }
        Err(ConversionError::mismatch("char", value))
    }
}

impl Leaf for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => Err(ConversionError::mismatch("text", other)),
        }
    }
}

impl<T: Leaf> Leaf for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Sequences and sets encode as lists
macro_rules! list_leaf {
    ($($c:ident<T: $($bound:ident),*>),*) => {$(
        impl<T: Leaf $(+ $bound)*> Leaf for $c<T> {
            fn to_value(&self) -> Value {
                Value::List(self.iter().map(Leaf::to_value).collect())
            }

            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                match value {
                    Value::List(items) => items.iter().map(T::from_value).collect(),
                    other => Err(ConversionError::mismatch("list", other)),
                }
            }
        }
    )*};
}

list_leaf!(Vec<T:>, VecDeque<T:>, LinkedList<T:>, BTreeSet<T: Ord>, HashSet<T: Eq, Hash>);

/// Maps encode as lists of `[key, value]` pairs
macro_rules! map_leaf {
    ($($m:ident<K: $($bound:ident),*>),*) => {$(
        impl<K: Leaf $(+ $bound)*, V: Leaf> Leaf for $m<K, V> {
            fn to_value(&self) -> Value {
                Value::List(
                    self.iter()
                        .map(|(k, v)| Value::List(vec![k.to_value(), v.to_value()]))
                        .collect(),
                )
            }

            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                let Value::List(items) = value else {
                    return Err(ConversionError::mismatch("list", value));
                };
                items
                    .iter()
                    .map(|item| match item {
                        Value::List(pair) if pair.len() == 2 => {
                            Ok((K::from_value(&pair[0])?, V::from_value(&pair[1])?))
                        }
                        other => Err(ConversionError::mismatch("key-value pair", other)),
                    })
                    .collect()
            }
        }
    )*};
}

map_leaf!(BTreeMap<K: Ord>, HashMap<K: Eq, Hash>);

/// Reads the entries of one record
///
/// Absent entries read as `None` so the builder can report them as missing.
#[derive(Debug)]
pub struct RecordReader<'a> {
    type_name: &'static str,
    entries: &'a [(String, Value)],
    consumed: Vec<bool>,
}

impl<'a> RecordReader<'a> {
    pub fn new(type_name: &'static str, value: &'a Value) -> Result<Self, ConversionError> {
        let Value::Record(entries) = value else {
            return Err(ConversionError::mismatch("record", value));
        };
        for (i, (name, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(n, _)| n == name) {
                return Err(ConversionError::DuplicateField {
                    type_name: type_name.to_string(),
                    field: name.clone(),
                });
            }
        }
        Ok(Self {
            type_name,
            entries,
            consumed: vec![false; entries.len()],
        })
    }

    fn take(&mut self, field: &str) -> Option<&'a Value> {
        let entries = self.entries;
        let index = entries.iter().position(|(n, _)| n == field)?;
        self.consumed[index] = true;
        Some(&entries[index].1)
    }

    fn in_field(&self, field: &str, source: ConversionError) -> ConversionError {
        ConversionError::Field {
            type_name: self.type_name.to_string(),
            field: field.to_string(),
            source: Box::new(source),
        }
    }

    pub fn leaf<T: Leaf>(&mut self, field: &str) -> Result<Option<T>, ConversionError> {
        self.nested(field, T::from_value)
    }

    /// Entry decoded by another converter
    pub fn nested<T>(
        &mut self,
        field: &str,
        decode: impl FnOnce(&Value) -> Result<T, ConversionError>,
    ) -> Result<Option<T>, ConversionError> {
        match self.take(field) {
            None => Ok(None),
            Some(value) => decode(value).map(Some).map_err(|e| self.in_field(field, e)),
        }
    }

    /// Nullable entry decoded by another converter
    pub fn optional<T>(
        &mut self,
        field: &str,
        decode: impl FnOnce(&Value) -> Result<T, ConversionError>,
    ) -> Result<Option<Option<T>>, ConversionError> {
        self.nested(field, |value| match value {
            Value::Null => Ok(None),
            other => decode(other).map(Some),
        })
    }

    /// List entry whose elements are decoded by another converter
    pub fn list<T>(
        &mut self,
        field: &str,
        decode: impl Fn(&Value) -> Result<T, ConversionError>,
    ) -> Result<Option<Vec<T>>, ConversionError> {
        self.nested(field, |value| match value {
            Value::List(items) => items.iter().map(&decode).collect(),
            other => Err(ConversionError::mismatch("list", other)),
        })
    }

    /// Mark an output-only entry as read
    pub fn skip(&mut self, field: &str) {
        self.take(field);
    }

    /// Fails on entries nobody read
    pub fn finish(self) -> Result<(), ConversionError> {
        match self.consumed.iter().position(|c| !c) {
            Some(index) => Err(ConversionError::UnknownField {
                type_name: self.type_name.to_string(),
                field: self.entries[index].0.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Whole-string regular expression match; invalid patterns never match
pub fn matches_regex<S: AsRef<str> + ?Sized>(pattern: &str, value: &S) -> bool {
    static CACHE: OnceLock<Mutex<HashMap<String, Option<Regex>>>> = OnceLock::new();
    let mut cache = CACHE.get_or_init(Default::default).lock();
    cache
        .entry(pattern.to_string())
        .or_insert_with(|| Regex::new(&format!("^(?:{})$", pattern)).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("^[a-z]+$", "abc", true)]
    #[case("[a-z]+", "abc1", false)]
    #[case("a|b", "ab", false)]
    #[case("a|b", "b", true)]
    #[case("(", "(", false)]
    fn regex_matches_whole_string(
        #[case] pattern: &str,
        #[case] value: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(matches_regex(pattern, value), expected);
        assert_eq!(matches_regex(pattern, &value.to_string()), expected);
    }

    #[test]
    fn missing_fields_are_listed_together() {
        let err = BuildError::missing("Point", vec!["x", "y"]);
        assert_eq!(err.to_string(), "Cannot build Point: missing required fields x, y");
        assert_eq!(err.missing_fields(), ["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn contract_messages_pass_through() {
        let violation = ContractViolation::new("x", "The x has to be even but was 3.");
        let err = ConversionError::from(BuildError::from(violation));
        assert_eq!(err.to_string(), "The x has to be even but was 3.");
    }

    #[test]
    fn leaves_reject_out_of_range_values() {
        assert_eq!(u8::from_value(&Value::Integer(7)), Ok(7));
        assert!(matches!(
            u8::from_value(&Value::Integer(-1)),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(matches!(
            i64::from_value(&Value::Text("1".into())),
            Err(ConversionError::Mismatch { expected: "i64", found: "text" })
        ));
        assert_eq!(Option::<i32>::from_value(&Value::Null), Ok(None));
        assert_eq!(
            Vec::<String>::from_value(&vec!["a".to_string()].to_value()),
            Ok(vec!["a".to_string()])
        );
    }

    #[test]
    fn collections_encode_as_lists() {
        let set: BTreeSet<u8> = [3, 1].into_iter().collect();
        assert_eq!(
            set.to_value(),
            Value::List(vec![Value::Unsigned(1), Value::Unsigned(3)])
        );
        assert_eq!(BTreeSet::<u8>::from_value(&set.to_value()), Ok(set));

        let deque: VecDeque<String> = VecDeque::from(vec!["a".to_string()]);
        assert_eq!(VecDeque::<String>::from_value(&deque.to_value()), Ok(deque));

        let hashed: HashSet<char> = ['x', 'y'].into_iter().collect();
        assert_eq!(HashSet::<char>::from_value(&hashed.to_value()), Ok(hashed));
    }

    #[test]
    fn maps_encode_as_pairs() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1i64);
        let value = map.to_value();
        assert_eq!(
            value,
            Value::List(vec![Value::List(vec![Value::Text("a".into()), Value::Integer(1)])])
        );
        assert_eq!(BTreeMap::<String, i64>::from_value(&value), Ok(map.clone()));

        let hashed: HashMap<String, i64> = map.into_iter().collect();
        assert_eq!(HashMap::<String, i64>::from_value(&hashed.to_value()), Ok(hashed));

        assert!(matches!(
            BTreeMap::<String, i64>::from_value(&Value::List(vec![Value::Integer(1)])),
            Err(ConversionError::Mismatch { expected: "key-value pair", found: "integer" })
        ));
    }

    #[test]
    fn reader_tracks_unread_entries() {
        let value = Value::Record(vec![
            ("x".into(), Value::Integer(1)),
            ("double_x".into(), Value::Integer(2)),
            ("extra".into(), Value::Bool(true)),
        ]);
        let mut reader = RecordReader::new("Point", &value).unwrap();
        assert_eq!(reader.leaf::<i64>("x").unwrap(), Some(1));
        assert_eq!(reader.leaf::<i64>("y").unwrap(), None);
        reader.skip("double_x");
        assert_eq!(
            reader.finish(),
            Err(ConversionError::UnknownField {
                type_name: "Point".into(),
                field: "extra".into()
            })
        );
    }

    #[test]
    fn reader_reports_the_failing_field() {
        let value = Value::Record(vec![("x".into(), Value::Text("one".into()))]);
        let mut reader = RecordReader::new("Point", &value).unwrap();
        let err = reader.leaf::<i64>("x").unwrap_err();
        assert_eq!(err.to_string(), "Point.x: expected i64 but found text");
        assert!(matches!(err.root(), ConversionError::Mismatch { .. }));
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let value = Value::Record(vec![
            ("x".into(), Value::Integer(1)),
            ("x".into(), Value::Integer(2)),
        ]);
        assert!(matches!(
            RecordReader::new("Point", &value),
            Err(ConversionError::DuplicateField { .. })
        ));
    }

    #[test]
    fn values_serialize_to_json() {
        let value = Value::Record(vec![("x".into(), Value::Integer(1))]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"record":[["x",{"integer":1}]]}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
