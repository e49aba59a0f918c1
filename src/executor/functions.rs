// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Runtime side of the builtin functions, dispatched on the receiver's
//! type class and the chunk id.

use core::cmp::Ordering;
use std::collections::BTreeMap;

use super::{ExecutionError, Executor, Frame, Result};
use crate::bytecode::{Chunk, RawData, RawValue};
use crate::types::Type;

pub(super) fn call(
    exec: &Executor<'_>,
    frame: &Frame<'_>,
    chunk: &Chunk,
    typ: &Type,
    receiver: RawData,
    depth: usize,
) -> Result<RawData> {
    let id = chunk.id.as_str();
    let mut args = Vec::with_capacity(chunk.args().len());
    for arg in chunk.args() {
        args.push(exec.operand(frame, arg, depth)?);
    }

    if let Some(op) = comparison(id) {
        return Ok(compare(op, &receiver, args.first()));
    }
    // Everything else propagates a missing receiver value.
    if receiver.value.is_nil() {
        return Ok(RawData::new(RawValue::Nil, typ.clone()));
    }

    let class = receiver.typ.underlying();
    match (&class, id) {
        (Type::ArrayLike, "[]") => index_array(&receiver, arg_int(id, &args)?, typ),
        (Type::ArrayLike, "{}") => block_map(exec, frame, &receiver, &args, depth),
        (Type::ArrayLike, "where") => filter(exec, frame, receiver, &args, depth),
        (Type::ArrayLike | Type::MapLike | Type::String, "length") => length(&receiver),
        (Type::ArrayLike, "containsString") => {
            let needle = arg_str(id, &args)?;
            let RawValue::Array(items) = &receiver.value else {
                return Err(mismatch(id, &receiver));
            };
            Ok(RawData::bool(
                items
                    .iter()
                    .any(|item| matches!(item, RawValue::String(s) if s == needle)),
            ))
        }
        (Type::MapLike, "[]") => {
            let key = arg_str(id, &args)?;
            let RawValue::Map(entries) = &receiver.value else {
                return Err(mismatch(id, &receiver));
            };
            let value = entries.get(key).cloned().unwrap_or(RawValue::Nil);
            Ok(RawData::new(value, typ.clone()))
        }
        (Type::MapLike, "keys") => {
            let RawValue::Map(entries) = &receiver.value else {
                return Err(mismatch(id, &receiver));
            };
            let keys = entries.keys().cloned().map(RawValue::String).collect();
            Ok(RawData::new(RawValue::Array(keys), typ.clone()))
        }
        (Type::MapLike, "values") => {
            let RawValue::Map(entries) = &receiver.value else {
                return Err(mismatch(id, &receiver));
            };
            let values = entries.values().cloned().collect();
            Ok(RawData::new(RawValue::Array(values), typ.clone()))
        }
        (Type::String, _) => string(id, &receiver, &args),
        (Type::Bool, "&&" | "||") => {
            let (RawValue::Bool(lhs), Some(RawValue::Bool(rhs))) =
                (&receiver.value, args.first().map(|a| &a.value))
            else {
                return Err(mismatch(id, &receiver));
            };
            Ok(RawData::bool(if id == "&&" {
                *lhs && *rhs
            } else {
                *lhs || *rhs
            }))
        }
        _ => Err(ExecutionError::UnknownFunction {
            id: id.to_string(),
            typ: receiver.typ.label(),
        }),
    }
}

fn mismatch(function: &str, receiver: &RawData) -> ExecutionError {
    ExecutionError::InvalidArgument {
        function: function.to_string(),
        reason: format!("unexpected receiver of type '{}'", receiver.typ.label()),
    }
}

fn arg_int(function: &str, args: &[RawData]) -> Result<i64> {
    match args.first().map(|a| &a.value) {
        Some(RawValue::Int(i)) => Ok(*i),
        _ => Err(ExecutionError::InvalidArgument {
            function: function.to_string(),
            reason: "expected an int argument".to_string(),
        }),
    }
}

fn arg_str<'a>(function: &str, args: &'a [RawData]) -> Result<&'a str> {
    match args.first().map(|a| &a.value) {
        Some(RawValue::String(s)) => Ok(s.as_str()),
        _ => Err(ExecutionError::InvalidArgument {
            function: function.to_string(),
            reason: "expected a string argument".to_string(),
        }),
    }
}

fn arg_function(function: &str, args: &[RawData]) -> Result<i32> {
    match args.first().map(|a| &a.value) {
        Some(RawValue::Function(f)) => Ok(*f),
        _ => Err(ExecutionError::InvalidArgument {
            function: function.to_string(),
            reason: "expected a block".to_string(),
        }),
    }
}

#[allow(clippy::as_conversions)]
fn length(receiver: &RawData) -> Result<RawData> {
    let len = match &receiver.value {
        RawValue::Array(items) => items.len(),
        RawValue::Map(entries) => entries.len(),
        RawValue::String(s) => s.chars().count(),
        _ => return Err(mismatch("length", receiver)),
    };
    Ok(RawData::int(len as i64))
}

// Out of range indices yield nil; negative indices count from the end.
fn index_array(receiver: &RawData, idx: i64, typ: &Type) -> Result<RawData> {
    let RawValue::Array(items) = &receiver.value else {
        return Err(mismatch("[]", receiver));
    };
    let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
    let idx = if idx < 0 { len + idx } else { idx };
    let value = usize::try_from(idx)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .unwrap_or(RawValue::Nil);
    Ok(RawData::new(value, typ.clone()))
}

fn element(receiver: &RawData, item: &RawValue) -> RawData {
    let typ = match receiver.typ.child() {
        Ok(Type::Any) | Err(_) => item.infer_type(),
        Ok(elem) => elem,
    };
    RawData::new(item.clone(), typ)
}

fn filter(
    exec: &Executor<'_>,
    frame: &Frame<'_>,
    receiver: RawData,
    args: &[RawData],
    depth: usize,
) -> Result<RawData> {
    let function_ref = arg_function("where", args)?;
    let RawValue::Array(items) = &receiver.value else {
        return Err(mismatch("where", &receiver));
    };

    let mut kept = Vec::new();
    for item in items {
        let values = exec.run_block(frame, function_ref, element(&receiver, item), depth)?;
        let mut keep = true;
        for (label, data) in &values {
            if let Some(err) = &data.error {
                return Err(ExecutionError::InvalidArgument {
                    function: "where".to_string(),
                    reason: format!("{label}: {err}"),
                });
            }
            keep &= data.value.truthy();
        }
        if keep {
            kept.push(item.clone());
        }
    }
    Ok(RawData::new(RawValue::Array(kept), receiver.typ))
}

fn block_map(
    exec: &Executor<'_>,
    frame: &Frame<'_>,
    receiver: &RawData,
    args: &[RawData],
    depth: usize,
) -> Result<RawData> {
    let function_ref = arg_function("{}", args)?;
    let RawValue::Array(items) = &receiver.value else {
        return Err(mismatch("{}", receiver));
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let values = exec.run_block(frame, function_ref, element(receiver, item), depth)?;
        let mut entries = BTreeMap::new();
        for (idx, (label, data)) in values.into_iter().enumerate() {
            entries.insert(row_key(&entries, label, idx), data.value);
        }
        out.push(RawValue::Map(entries));
    }
    Ok(RawData::array(Type::map(Type::String, Type::Any), out))
}

/// Block entries are keyed by label; a repeated label gets its position
/// appended so no entry is overwritten.
fn row_key(entries: &BTreeMap<String, RawValue>, label: String, idx: usize) -> String {
    if !entries.contains_key(&label) {
        return label;
    }
    let mut key = format!("{label}#{idx}");
    while entries.contains_key(&key) {
        key.push('#');
    }
    key
}

fn string(id: &str, receiver: &RawData, args: &[RawData]) -> Result<RawData> {
    let RawValue::String(s) = &receiver.value else {
        return Err(mismatch(id, receiver));
    };
    match id {
        "containsString" => Ok(RawData::bool(s.contains(arg_str(id, args)?))),
        "containsArrayString" => {
            let Some(RawValue::Array(needles)) = args.first().map(|a| &a.value) else {
                return Err(ExecutionError::InvalidArgument {
                    function: id.to_string(),
                    reason: "expected a []string argument".to_string(),
                });
            };
            Ok(RawData::bool(needles.iter().any(
                |n| matches!(n, RawValue::String(needle) if s.contains(needle.as_str())),
            )))
        }
        "downcase" => Ok(RawData::string(&s.to_lowercase())),
        "upcase" => Ok(RawData::string(&s.to_uppercase())),
        _ => Err(ExecutionError::UnknownFunction {
            id: id.to_string(),
            typ: receiver.typ.label(),
        }),
    }
}

#[derive(Clone, Copy)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn comparison(id: &str) -> Option<Comparison> {
    Some(match id {
        "==" => Comparison::Eq,
        "!=" => Comparison::Ne,
        "<" => Comparison::Lt,
        "<=" => Comparison::Le,
        ">" => Comparison::Gt,
        ">=" => Comparison::Ge,
        _ => return None,
    })
}

// Values of different kinds are unequal and unordered. Ordering against nil
// is false.
fn compare(op: Comparison, lhs: &RawData, rhs: Option<&RawData>) -> RawData {
    let rhs = rhs.map_or(&RawValue::Nil, |r| &r.value);
    let ordering = match (&lhs.value, rhs) {
        (RawValue::Int(a), RawValue::Int(b)) => Some(a.cmp(b)),
        (RawValue::Float(a), RawValue::Float(b)) => a.partial_cmp(b),
        (RawValue::String(a), RawValue::String(b)) => Some(a.cmp(b)),
        (RawValue::Time(a), RawValue::Time(b)) => Some(a.cmp(b)),
        (a, b) if a == b => Some(Ordering::Equal),
        _ => None,
    };
    let result = match op {
        Comparison::Eq => ordering == Some(Ordering::Equal),
        Comparison::Ne => ordering != Some(Ordering::Equal),
        Comparison::Lt => ordering == Some(Ordering::Less),
        Comparison::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Comparison::Gt => ordering == Some(Ordering::Greater),
        Comparison::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    };
    RawData::bool(result)
}
