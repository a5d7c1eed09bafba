//! Compact array-of-arrays values as embedded in report payloads
//!
//! The writer emits nested JSON arrays of integers, strings and nulls. They are
//! kept in this form until a node is actually decoded; lists are reference
//! counted so handing a subtree to a lazily-created child never copies it.

use crate::error::{Error, Result};
use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use std::fmt;
use std::rc::Rc;

/// One value of the compact encoding
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<[Raw]>),
}

impl Raw {
    /// Empty list, used for absent optional lists
    pub fn empty_list() -> Self {
        Raw::List(Rc::from(Vec::new()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Raw::Null)
    }

    /// Integer value; integral floats are accepted since some writers emit `1.0`
    pub fn as_int(&self, context: &'static str) -> Result<i64> {
        match self {
            Raw::Int(v) => Ok(*v),
            Raw::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            other => Err(Error::shape(
                context,
                format!("expected integer, found {}", other.kind()),
            )),
        }
    }

    /// Integer or null
    pub fn as_opt_int(&self, context: &'static str) -> Result<Option<i64>> {
        match self {
            Raw::Null => Ok(None),
            other => other.as_int(context).map(Some),
        }
    }

    pub fn as_str(&self, context: &'static str) -> Result<&str> {
        match self {
            Raw::Str(s) => Ok(s),
            other => Err(Error::shape(
                context,
                format!("expected string, found {}", other.kind()),
            )),
        }
    }

    pub fn as_list(&self, context: &'static str) -> Result<&[Raw]> {
        match self {
            Raw::List(items) => Ok(items),
            other => Err(Error::shape(
                context,
                format!("expected list, found {}", other.kind()),
            )),
        }
    }

    /// Shared handle to a list, for storing in a lazily evaluated child list
    pub fn list_rc(&self, context: &'static str) -> Result<Rc<[Raw]>> {
        match self {
            Raw::List(items) => Ok(Rc::clone(items)),
            other => Err(Error::shape(
                context,
                format!("expected list, found {}", other.kind()),
            )),
        }
    }

    /// View this value as a positional record
    pub fn element(&self, context: &'static str) -> Result<Element<'_>> {
        Ok(Element {
            items: self.as_list(context)?,
            context,
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            Raw::Null => "null",
            Raw::Bool(_) => "bool",
            Raw::Int(_) => "integer",
            Raw::Float(_) => "float",
            Raw::Str(_) => "string",
            Raw::List(_) => "list",
        }
    }
}

/// A compact record with fixed positional slots
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    items: &'a [Raw],
    context: &'static str,
}

impl<'a> Element<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Slot that may legitimately be missing (trailing optional fields)
    pub fn opt(&self, index: usize) -> Option<&'a Raw> {
        self.items.get(index)
    }

    /// Required slot
    pub fn get(&self, index: usize) -> Result<&'a Raw> {
        self.items.get(index).ok_or_else(|| {
            Error::shape(
                self.context,
                format!("missing slot {} (record has {})", index, self.items.len()),
            )
        })
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        self.get(index)?.as_int(self.context)
    }

    pub fn list(&self, index: usize) -> Result<&'a [Raw]> {
        self.get(index)?.as_list(self.context)
    }

    pub fn element(&self, index: usize) -> Result<Element<'a>> {
        self.get(index)?.element(self.context)
    }

    pub fn last(&self) -> Result<&'a Raw> {
        self.items
            .last()
            .ok_or_else(|| Error::shape(self.context, "empty record"))
    }
}

impl<'de> Deserialize<'de> for Raw {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawVisitor)
    }
}

struct RawVisitor;

impl<'de> Visitor<'de> for RawVisitor {
    type Value = Raw;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a compact report value (null, number, string or array)")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Raw, E> {
        Ok(Raw::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Raw, E> {
        Ok(Raw::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<Raw, D::Error>
    where
        D: Deserializer<'de>,
    {
        Raw::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Raw, E> {
        Ok(Raw::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Raw, E> {
        Ok(Raw::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Raw, E> {
        Ok(match i64::try_from(v) {
            Ok(v) => Raw::Int(v),
            Err(_) => Raw::Float(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Raw, E> {
        Ok(Raw::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Raw, E> {
        Ok(Raw::Str(Rc::from(v)))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Raw, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Raw>()? {
            items.push(item);
        }
        Ok(Raw::List(Rc::from(items)))
    }

    fn visit_map<A>(self, _map: A) -> std::result::Result<Raw, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        Err(de::Error::invalid_type(de::Unexpected::Map, &self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Raw {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_nested_lists() {
        let raw = parse(r#"[1, null, "x", [2, 3.0]]"#);
        let el = raw.element("test").unwrap();
        assert_eq!(el.len(), 4);
        assert_eq!(el.int(0).unwrap(), 1);
        assert!(el.get(1).unwrap().is_null());
        assert_eq!(el.get(2).unwrap().as_str("test").unwrap(), "x");
        let inner = el.element(3).unwrap();
        assert_eq!(inner.int(1).unwrap(), 3);
    }

    #[test]
    fn test_objects_are_rejected() {
        let result: std::result::Result<Raw, _> = serde_json::from_str(r#"[{"a": 1}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_slot_is_shape_error() {
        let raw = parse("[1]");
        let el = raw.element("suite").unwrap();
        let err = el.get(3).unwrap_err();
        assert!(err.to_string().contains("missing slot 3"));
        assert!(el.opt(3).is_none());
    }

    #[test]
    fn test_list_rc_shares_storage() {
        let raw = parse("[[1, 2], 3]");
        let el = raw.element("test").unwrap();
        let a = el.get(0).unwrap().list_rc("test").unwrap();
        let b = el.get(0).unwrap().list_rc("test").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_wrong_type_reports_kind() {
        let err = parse(r#""x""#).as_int("status").unwrap_err();
        assert_eq!(err.to_string(), "Malformed status: expected integer, found string");
    }
}
