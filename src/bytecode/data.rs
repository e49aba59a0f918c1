// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Runtime values and their wire form.
//!
//! [`RawData`] is what the executor and resource providers work with.
//! [`EvalResult`] is its serializable counterpart, keyed by the checksum of
//! the chunk that produced it. [`RawResult`] pairs the two views.
//!
//! `RawData::result()` followed by `EvalResult::raw_result()` reproduces the
//! original value, type and error for every concrete type. Two cases are
//! rejected instead: non-empty arrays whose element type is `any` (maps with
//! `any` values are fine, each value is written with its inferred type), and
//! arrays holding an element of a different type than declared. A top-level
//! `any` value is written with its inferred concrete type, so it comes back
//! typed.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::{Result, SerializationError};
use super::primitive::Primitive;
use crate::resources::Resource;
use crate::types::Type;

/// Handle to a resource instance. Equality only considers name and id.
#[derive(Clone)]
pub struct ResourceRef {
    pub name: String,
    pub id: String,
    pub instance: Option<Arc<Resource>>,
}

impl ResourceRef {
    pub fn new(name: &str, id: &str) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            instance: None,
        }
    }

    pub fn from_instance(instance: Arc<Resource>) -> Self {
        Self {
            name: instance.name().to_string(),
            id: instance.id().to_string(),
            instance: Some(instance),
        }
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.id == other.id
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("attached", &self.instance.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Nil,
    Bool(bool),
    /// Int and Score values.
    Int(i64),
    Float(f64),
    String(String),
    Time(DateTime<Utc>),
    Array(Vec<RawValue>),
    Map(BTreeMap<String, RawValue>),
    Resource(ResourceRef),
    Reference(i32),
    Function(i32),
}

impl RawValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, RawValue::Nil)
    }

    /// Truthiness used by filters.
    pub fn truthy(&self) -> bool {
        match self {
            RawValue::Nil => false,
            RawValue::Bool(b) => *b,
            RawValue::Int(i) => *i != 0,
            RawValue::Float(f) => *f != 0.0,
            RawValue::String(s) => !s.is_empty(),
            RawValue::Array(items) => !items.is_empty(),
            RawValue::Map(entries) => !entries.is_empty(),
            _ => true,
        }
    }

    /// Best concrete type for this value; heterogeneous collections get `any`
    /// elements.
    pub fn infer_type(&self) -> Type {
        match self {
            RawValue::Nil => Type::Nil,
            RawValue::Bool(_) => Type::Bool,
            RawValue::Int(_) => Type::Int,
            RawValue::Float(_) => Type::Float,
            RawValue::String(_) => Type::String,
            RawValue::Time(_) => Type::Time,
            RawValue::Array(items) => Type::array(common_type(items.iter())),
            RawValue::Map(entries) => Type::map(Type::String, common_type(entries.values())),
            RawValue::Resource(r) => Type::resource(&r.name),
            RawValue::Reference(_) => Type::Ref,
            RawValue::Function(_) => Type::FunctionLike,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            RawValue::Nil => Value::Null,
            RawValue::Bool(b) => Value::Bool(*b),
            RawValue::Int(i) => Value::from(*i),
            RawValue::Float(f) => Value::from(*f),
            RawValue::String(s) => Value::String(s.clone()),
            RawValue::Time(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            RawValue::Array(items) => Value::Array(items.iter().map(RawValue::to_json).collect()),
            RawValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            RawValue::Resource(r) => serde_json::json!({ "resource": r.name, "id": r.id }),
            RawValue::Reference(r) | RawValue::Function(r) => Value::from(*r),
        }
    }
}

fn common_type<'a>(mut values: impl Iterator<Item = &'a RawValue>) -> Type {
    let Some(first) = values.next() else {
        return Type::Any;
    };
    let typ = first.infer_type();
    if values.all(|v| v.infer_type() == typ) {
        typ
    } else {
        Type::Any
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Nil => f.write_str("null"),
            RawValue::Resource(r) => write!(f, "{} id = {}", r.name, r.id),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// A value together with its static type and an optional error.
#[derive(Debug, Clone, PartialEq)]
pub struct RawData {
    pub value: RawValue,
    pub typ: Type,
    pub error: Option<String>,
}

impl RawData {
    pub fn new(value: RawValue, typ: Type) -> Self {
        Self {
            value,
            typ,
            error: None,
        }
    }

    pub fn nil() -> Self {
        Self::new(RawValue::Nil, Type::Nil)
    }

    pub fn bool(v: bool) -> Self {
        Self::new(RawValue::Bool(v), Type::Bool)
    }

    pub fn int(v: i64) -> Self {
        Self::new(RawValue::Int(v), Type::Int)
    }

    pub fn score(v: i64) -> Self {
        Self::new(RawValue::Int(v), Type::Score)
    }

    pub fn float(v: f64) -> Self {
        Self::new(RawValue::Float(v), Type::Float)
    }

    pub fn string(v: &str) -> Self {
        Self::new(RawValue::String(v.to_string()), Type::String)
    }

    pub fn time(v: DateTime<Utc>) -> Self {
        Self::new(RawValue::Time(v), Type::Time)
    }

    pub fn array(elem: Type, items: Vec<RawValue>) -> Self {
        Self::new(RawValue::Array(items), Type::array(elem))
    }

    pub fn map(value_type: Type, entries: BTreeMap<String, RawValue>) -> Self {
        Self::new(RawValue::Map(entries), Type::map(Type::String, value_type))
    }

    pub fn resource(r: ResourceRef) -> Self {
        let typ = Type::resource(&r.name);
        Self::new(RawValue::Resource(r), typ)
    }

    /// A failed value of type `typ`.
    pub fn error(typ: Type, message: impl Into<String>) -> Self {
        Self {
            value: RawValue::Nil,
            typ,
            error: Some(message.into()),
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_primitive(&self) -> Result<Primitive> {
        value_to_primitive(&self.value, &self.typ)
    }

    /// Wire form of this value with an empty code id.
    pub fn result(&self) -> Result<EvalResult> {
        Ok(EvalResult {
            code_id: String::new(),
            data: self.to_primitive()?,
            error: self.error.clone(),
        })
    }

    pub fn from_primitive(primitive: &Primitive) -> Result<RawData> {
        Ok(RawData::new(
            primitive_to_value(primitive)?,
            primitive.typ.clone(),
        ))
    }
}

fn mismatch(typ: &Type) -> SerializationError {
    SerializationError::ValueMismatch { label: typ.label() }
}

fn value_to_primitive(value: &RawValue, typ: &Type) -> Result<Primitive> {
    if value.is_nil() {
        return Ok(Primitive::nil());
    }
    match (typ, value) {
        (Type::Bool, RawValue::Bool(b)) => Ok(Primitive::bool(*b)),
        (Type::Int, RawValue::Int(i)) => Ok(Primitive::int(*i)),
        (Type::Score, RawValue::Int(i)) => Ok(Primitive::score(*i)),
        (Type::Float, RawValue::Float(f)) => Ok(Primitive::float(*f)),
        (Type::String, RawValue::String(s)) => Ok(Primitive::string(s)),
        (Type::Time, RawValue::Time(t)) => Ok(Primitive::time(t)),
        (Type::Ref, RawValue::Reference(r)) => Ok(Primitive::reference(*r)),
        (Type::FunctionLike, RawValue::Function(r)) => Ok(Primitive::function(*r)),
        (Type::Resource(name), RawValue::Resource(r)) => Ok(Primitive::resource(name, &r.id)),
        (Type::Array(elem), RawValue::Array(items)) => {
            if **elem == Type::Any && !items.is_empty() {
                return Err(SerializationError::AnyArray { label: typ.label() });
            }
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let p = value_to_primitive(item, elem).map_err(|_| {
                    SerializationError::ArrayElementMismatch {
                        index,
                        expected: elem.label(),
                        actual: item.infer_type().label(),
                    }
                })?;
                out.push(p);
            }
            Ok(Primitive::array((**elem).clone(), out))
        }
        (Type::Map(key, val), RawValue::Map(entries)) => {
            let mut out = BTreeMap::new();
            for (k, v) in entries {
                let p = if **val == Type::Any {
                    value_to_primitive(v, &v.infer_type())?
                } else {
                    value_to_primitive(v, val)?
                };
                out.insert(k.clone(), p);
            }
            Ok(Primitive {
                typ: Type::map((**key).clone(), (**val).clone()),
                value: Vec::new(),
                array: Vec::new(),
                map: out,
            })
        }
        (Type::Any, v) => value_to_primitive(v, &v.infer_type()),
        _ => Err(mismatch(typ)),
    }
}

fn primitive_to_value(p: &Primitive) -> Result<RawValue> {
    Ok(match &p.typ {
        Type::Nil => RawValue::Nil,
        Type::Bool => RawValue::Bool(p.as_bool()?),
        Type::Int | Type::Score => RawValue::Int(p.as_int()?),
        Type::Float => RawValue::Float(p.as_float()?),
        Type::String => RawValue::String(p.as_str()?.to_string()),
        Type::Time => RawValue::Time(p.as_time()?),
        Type::Ref => RawValue::Reference(p.as_reference()?),
        Type::FunctionLike => RawValue::Function(p.as_reference()?),
        Type::Resource(name) => RawValue::Resource(ResourceRef::new(name, p.as_str()?)),
        Type::Array(_) => RawValue::Array(
            p.array
                .iter()
                .map(primitive_to_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        Type::Map(_, _) => {
            let mut out = BTreeMap::new();
            for (k, v) in &p.map {
                out.insert(k.clone(), primitive_to_value(v)?);
            }
            RawValue::Map(out)
        }
        other => return Err(mismatch(other)),
    })
}

/// Serializable result of one evaluated chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalResult {
    pub code_id: String,
    pub data: Primitive,
    #[serde(default)]
    pub error: Option<String>,
}

impl EvalResult {
    /// An error-only result.
    pub fn failed(code_id: &str, message: impl Into<String>) -> Self {
        Self {
            code_id: code_id.to_string(),
            data: Primitive::nil(),
            error: Some(message.into()),
        }
    }

    pub fn raw_result(&self) -> Result<RawResult> {
        let mut data = RawData::from_primitive(&self.data)?;
        data.error = self.error.clone();
        Ok(RawResult {
            data,
            code_id: self.code_id.clone(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|e| SerializationError::Encoding(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes).map_err(|e| SerializationError::Encoding(e.to_string()))
    }
}

/// Runtime data paired with the checksum of the chunk that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub data: RawData,
    pub code_id: String,
}

impl RawResult {
    pub fn result(&self) -> Result<EvalResult> {
        let mut result = self.data.result()?;
        result.code_id = self.code_id.clone();
        Ok(result)
    }
}
