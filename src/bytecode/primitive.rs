// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{Result, SerializationError};
use crate::types::Type;

/// A self-describing constant: the type tag decides how `value` is read.
///
/// Scalars keep a little-endian payload in `value`; arrays and maps keep
/// their children in `array` and `map`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    #[serde(rename = "type")]
    pub typ: Type,
    #[serde(default)]
    pub value: Vec<u8>,
    #[serde(default)]
    pub array: Vec<Primitive>,
    #[serde(default)]
    pub map: BTreeMap<String, Primitive>,
}

impl Primitive {
    fn scalar(typ: Type, value: Vec<u8>) -> Self {
        Self {
            typ,
            value,
            array: Vec::new(),
            map: BTreeMap::new(),
        }
    }

    pub fn nil() -> Self {
        Self::scalar(Type::Nil, Vec::new())
    }

    pub fn bool(v: bool) -> Self {
        Self::scalar(Type::Bool, vec![u8::from(v)])
    }

    pub fn int(v: i64) -> Self {
        Self::scalar(Type::Int, v.to_le_bytes().to_vec())
    }

    pub fn score(v: i64) -> Self {
        Self::scalar(Type::Score, v.to_le_bytes().to_vec())
    }

    pub fn float(v: f64) -> Self {
        Self::scalar(Type::Float, v.to_bits().to_le_bytes().to_vec())
    }

    pub fn string(v: &str) -> Self {
        Self::scalar(Type::String, v.as_bytes().to_vec())
    }

    pub fn time(v: &DateTime<Utc>) -> Self {
        let mut value = v.timestamp().to_le_bytes().to_vec();
        value.extend_from_slice(&v.timestamp_subsec_nanos().to_le_bytes());
        Self::scalar(Type::Time, value)
    }

    /// Reference to another chunk of the same code.
    pub fn reference(chunk_ref: i32) -> Self {
        Self::scalar(Type::Ref, chunk_ref.to_le_bytes().to_vec())
    }

    /// Reference to a nested function (block body), 1-based.
    pub fn function(function_ref: i32) -> Self {
        Self::scalar(Type::FunctionLike, function_ref.to_le_bytes().to_vec())
    }

    pub fn resource(name: &str, id: &str) -> Self {
        Self::scalar(Type::resource(name), id.as_bytes().to_vec())
    }

    pub fn array(elem: Type, items: Vec<Primitive>) -> Self {
        Self {
            typ: Type::array(elem),
            value: Vec::new(),
            array: items,
            map: BTreeMap::new(),
        }
    }

    /// String-keyed map primitive.
    pub fn map(value_type: Type, entries: BTreeMap<String, Primitive>) -> Self {
        Self {
            typ: Type::map(Type::String, value_type),
            value: Vec::new(),
            array: Vec::new(),
            map: entries,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.typ == Type::Nil
    }

    fn payload<const N: usize>(&self) -> Result<[u8; N]> {
        let bytes = self.value.get(..N).ok_or_else(|| SerializationError::InvalidPayload {
            label: self.typ.label(),
            reason: format!("expected {N} bytes, found {}", self.value.len()),
        })?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    pub fn as_bool(&self) -> Result<bool> {
        let [b] = self.payload::<1>()?;
        Ok(b != 0)
    }

    /// Int and Score payloads.
    pub fn as_int(&self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.payload::<8>()?))
    }

    pub fn as_float(&self) -> Result<f64> {
        Ok(f64::from_bits(u64::from_le_bytes(self.payload::<8>()?)))
    }

    pub fn as_str(&self) -> Result<&str> {
        core::str::from_utf8(&self.value).map_err(|e| SerializationError::InvalidPayload {
            label: self.typ.label(),
            reason: e.to_string(),
        })
    }

    pub fn as_time(&self) -> Result<DateTime<Utc>> {
        let secs = i64::from_le_bytes(self.payload::<8>()?);
        let nanos_bytes = self
            .value
            .get(8..12)
            .ok_or_else(|| SerializationError::InvalidPayload {
                label: self.typ.label(),
                reason: "missing nanoseconds".to_string(),
            })?;
        let nanos = u32::from_le_bytes([
            nanos_bytes[0],
            nanos_bytes[1],
            nanos_bytes[2],
            nanos_bytes[3],
        ]);
        DateTime::from_timestamp(secs, nanos).ok_or_else(|| SerializationError::InvalidPayload {
            label: self.typ.label(),
            reason: format!("timestamp {secs}.{nanos} out of range"),
        })
    }

    /// Chunk or function reference payload.
    pub fn as_reference(&self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.payload::<4>()?))
    }
}
