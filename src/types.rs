// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use std::sync::Arc;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const TAG_NIL: u8 = 0x01;
const TAG_BOOL: u8 = 0x02;
const TAG_REF: u8 = 0x03;
const TAG_INT: u8 = 0x04;
const TAG_FLOAT: u8 = 0x05;
const TAG_STRING: u8 = 0x06;
const TAG_TIME: u8 = 0x07;
const TAG_SCORE: u8 = 0x08;
const TAG_ANY: u8 = 0x0a;
const TAG_FUNCTION_LIKE: u8 = 0x0b;
const TAG_ARRAY: u8 = 0x19;
const TAG_MAP: u8 = 0x1a;
const TAG_RESOURCE: u8 = 0x1b;
const TAG_ARRAY_LIKE: u8 = 0x29;
const TAG_MAP_LIKE: u8 = 0x2a;
const TAG_RESOURCE_LIKE: u8 = 0x2b;

/// Longest resource name the compact encoding can hold.
pub const MAX_RESOURCE_NAME_LEN: usize = u16::MAX as usize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("type '{label}' has no child type")]
    NotComposite { label: String },

    #[error("type '{label}' has no key type")]
    NotMap { label: String },

    #[error("invalid type encoding: {0}")]
    InvalidEncoding(String),

    #[error("resource name of {len} bytes exceeds the {max} byte limit")]
    NameTooLong { len: usize, max: usize },
}

/// A type of the query language.
///
/// `ArrayLike`, `MapLike` and `ResourceLike` are the dispatch classes that
/// [`Type::underlying`] collapses composite types into. `Ref` is the type of a
/// compiled argument that points at another chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Nil,
    Bool,
    Int,
    Float,
    String,
    Time,
    Score,
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Resource(Arc<str>),
    FunctionLike,
    Any,
    Ref,
    ArrayLike,
    MapLike,
    ResourceLike,
}

impl Type {
    pub fn array(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn resource(name: &str) -> Self {
        Type::Resource(name.into())
    }

    /// The dispatch class of this type.
    pub fn underlying(&self) -> Type {
        match self {
            Type::Array(_) => Type::ArrayLike,
            Type::Map(_, _) => Type::MapLike,
            Type::Resource(_) => Type::ResourceLike,
            other => other.clone(),
        }
    }

    /// Element type for arrays, value type for maps.
    pub fn child(&self) -> Result<Type, TypeError> {
        match self {
            Type::Array(elem) => Ok((**elem).clone()),
            Type::Map(_, value) => Ok((**value).clone()),
            _ => Err(TypeError::NotComposite {
                label: self.label(),
            }),
        }
    }

    pub fn key(&self) -> Result<Type, TypeError> {
        match self {
            Type::Map(key, _) => Ok((**key).clone()),
            _ => Err(TypeError::NotMap {
                label: self.label(),
            }),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_) | Type::ArrayLike)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Type::Map(_, _) | Type::MapLike)
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, Type::Resource(_) | Type::ResourceLike)
    }

    pub fn resource_name(&self) -> Option<&str> {
        match self {
            Type::Resource(name) => Some(name.as_ref()),
            _ => None,
        }
    }

    /// Whether any level of this type is `Any`.
    pub fn contains_any(&self) -> bool {
        match self {
            Type::Any => true,
            Type::Array(elem) => elem.contains_any(),
            Type::Map(key, value) => key.contains_any() || value.contains_any(),
            _ => false,
        }
    }

    /// Whether a value of this type may be passed where `expected` is declared.
    pub fn is_compatible_with(&self, expected: &Type) -> bool {
        match (expected, self) {
            (Type::Any, _) => true,
            (Type::ArrayLike, actual) => actual.is_array(),
            (Type::MapLike, actual) => actual.is_map(),
            (Type::ResourceLike, actual) => actual.is_resource(),
            (Type::Array(expected), Type::Array(actual)) => actual.is_compatible_with(expected),
            (Type::Map(ek, ev), Type::Map(ak, av)) => {
                ak.is_compatible_with(ek) && av.is_compatible_with(ev)
            }
            (expected, actual) => expected == actual,
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn label(&self) -> String {
        match self {
            Type::Nil => "null".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Int => "int".to_string(),
            Type::Float => "float".to_string(),
            Type::String => "string".to_string(),
            Type::Time => "time".to_string(),
            Type::Score => "score".to_string(),
            Type::Array(elem) => format!("[]{}", elem.label()),
            Type::Map(key, value) => format!("map[{}]{}", key.label(), value.label()),
            Type::Resource(name) => name.to_string(),
            Type::FunctionLike => "function".to_string(),
            Type::Any => "any".to_string(),
            Type::Ref => "ref".to_string(),
            Type::ArrayLike => "array".to_string(),
            Type::MapLike => "map".to_string(),
            Type::ResourceLike => "resource".to_string(),
        }
    }

    /// Parse a label produced by [`Type::label`]. Unknown names are resources.
    pub fn from_label(label: &str) -> Result<Type, TypeError> {
        let label = label.trim();
        if let Some(rest) = label.strip_prefix("[]") {
            return Ok(Type::array(Type::from_label(rest)?));
        }
        if let Some(rest) = label.strip_prefix("map[") {
            let close = matching_bracket(rest).ok_or_else(|| {
                TypeError::InvalidEncoding(format!("unterminated map key in '{label}'"))
            })?;
            let key = Type::from_label(&rest[..close])?;
            let value = Type::from_label(&rest[close + 1..])?;
            return Ok(Type::map(key, value));
        }
        Ok(match label {
            "null" | "nil" => Type::Nil,
            "bool" => Type::Bool,
            "int" => Type::Int,
            "float" => Type::Float,
            "string" => Type::String,
            "time" => Type::Time,
            "score" => Type::Score,
            "function" => Type::FunctionLike,
            "any" => Type::Any,
            "ref" => Type::Ref,
            "array" => Type::ArrayLike,
            "map" => Type::MapLike,
            "resource" => Type::ResourceLike,
            "" => return Err(TypeError::InvalidEncoding("empty type label".to_string())),
            name => Type::resource(name),
        })
    }

    /// Compact tagged encoding: one tag byte per level; resource names are
    /// stored with a little-endian u16 length prefix. Dispatch classes have
    /// tags of their own, distinct from the composite constructors.
    pub fn encode(&self) -> Result<Vec<u8>, TypeError> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), TypeError> {
        match self {
            Type::Nil => buf.push(TAG_NIL),
            Type::Bool => buf.push(TAG_BOOL),
            Type::Int => buf.push(TAG_INT),
            Type::Float => buf.push(TAG_FLOAT),
            Type::String => buf.push(TAG_STRING),
            Type::Time => buf.push(TAG_TIME),
            Type::Score => buf.push(TAG_SCORE),
            Type::FunctionLike => buf.push(TAG_FUNCTION_LIKE),
            Type::Any => buf.push(TAG_ANY),
            Type::Ref => buf.push(TAG_REF),
            Type::ArrayLike => buf.push(TAG_ARRAY_LIKE),
            Type::MapLike => buf.push(TAG_MAP_LIKE),
            Type::ResourceLike => buf.push(TAG_RESOURCE_LIKE),
            Type::Array(elem) => {
                buf.push(TAG_ARRAY);
                elem.encode_into(buf)?;
            }
            Type::Map(key, value) => {
                buf.push(TAG_MAP);
                key.encode_into(buf)?;
                value.encode_into(buf)?;
            }
            Type::Resource(name) => {
                let len = u16::try_from(name.len()).map_err(|_| TypeError::NameTooLong {
                    len: name.len(),
                    max: MAX_RESOURCE_NAME_LEN,
                })?;
                buf.push(TAG_RESOURCE);
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(name.as_bytes());
            }
        }
        Ok(())
    }

    pub fn decode(bytes: &[u8]) -> Result<Type, TypeError> {
        let (typ, rest) = Self::decode_prefix(bytes)?;
        if !rest.is_empty() {
            return Err(TypeError::InvalidEncoding(format!(
                "{} trailing bytes after type",
                rest.len()
            )));
        }
        Ok(typ)
    }

    fn decode_prefix(bytes: &[u8]) -> Result<(Type, &[u8]), TypeError> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| TypeError::InvalidEncoding("unexpected end of type".to_string()))?;
        let simple = match tag {
            TAG_NIL => Some(Type::Nil),
            TAG_BOOL => Some(Type::Bool),
            TAG_REF => Some(Type::Ref),
            TAG_INT => Some(Type::Int),
            TAG_FLOAT => Some(Type::Float),
            TAG_STRING => Some(Type::String),
            TAG_TIME => Some(Type::Time),
            TAG_SCORE => Some(Type::Score),
            TAG_ANY => Some(Type::Any),
            TAG_FUNCTION_LIKE => Some(Type::FunctionLike),
            TAG_ARRAY_LIKE => Some(Type::ArrayLike),
            TAG_MAP_LIKE => Some(Type::MapLike),
            TAG_RESOURCE_LIKE => Some(Type::ResourceLike),
            _ => None,
        };
        if let Some(typ) = simple {
            return Ok((typ, rest));
        }

        match tag {
            TAG_ARRAY => {
                let (elem, rest) = Self::decode_prefix(rest)?;
                Ok((Type::array(elem), rest))
            }
            TAG_MAP => {
                let (key, rest) = Self::decode_prefix(rest)?;
                let (value, rest) = Self::decode_prefix(rest)?;
                Ok((Type::map(key, value), rest))
            }
            TAG_RESOURCE => {
                let len_bytes = rest.get(..2).ok_or_else(|| {
                    TypeError::InvalidEncoding("missing resource name length".to_string())
                })?;
                let len = usize::from(u16::from_le_bytes([len_bytes[0], len_bytes[1]]));
                let name = rest.get(2..2 + len).ok_or_else(|| {
                    TypeError::InvalidEncoding("truncated resource name".to_string())
                })?;
                let name = core::str::from_utf8(name)
                    .map_err(|e| TypeError::InvalidEncoding(e.to_string()))?;
                Ok((Type::resource(name), &rest[2 + len..]))
            }
            other => Err(TypeError::InvalidEncoding(format!(
                "unknown type tag {other:#04x}"
            ))),
        }
    }
}

/// Byte offset of the `]` closing a map key, skipping nested `map[..]` keys.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in s.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' if depth == 0 => return Some(idx),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// Human-readable formats (JSON schemas, code dumps) carry labels; binary
// formats carry the compact encoding.
impl Serialize for Type {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.label())
        } else {
            let bytes = self.encode().map_err(serde::ser::Error::custom)?;
            serializer.serialize_bytes(&bytes)
        }
    }
}

struct TypeVisitor;

impl<'de> Visitor<'de> for TypeVisitor {
    type Value = Type;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a type label or encoded type bytes")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Type::from_label(v).map_err(E::custom)
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Type::decode(v).map_err(E::custom)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut bytes = Vec::new();
        while let Some(b) = seq.next_element::<u8>()? {
            bytes.push(b);
        }
        Type::decode(&bytes).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Type {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(TypeVisitor)
        } else {
            deserializer.deserialize_bytes(TypeVisitor)
        }
    }
}

/// Positional signature of a builtin function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Number of leading arguments that must be present.
    pub required: usize,
    /// Declared type of every accepted argument.
    pub args: Vec<Type>,
}

impl FunctionSignature {
    pub fn new(required: usize, args: Vec<Type>) -> Self {
        Self { required, args }
    }

    pub fn none() -> Self {
        Self::default()
    }
}
