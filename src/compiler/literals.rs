// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use super::error::{CompilerError, Result};
use crate::ast::Literal;
use crate::bytecode::Primitive;
use crate::types::Type;

/// Constant primitive for a literal. Arrays must be homogeneous; maps with
/// mixed value types get `any` values.
pub fn primitive(lit: &Literal) -> Result<Primitive> {
    Ok(match lit {
        Literal::Nil => Primitive::nil(),
        Literal::Bool(b) => Primitive::bool(*b),
        Literal::Int(i) => Primitive::int(*i),
        Literal::Float(f) => Primitive::float(*f),
        Literal::String(s) => Primitive::string(s),
        Literal::Array(items) => {
            let items = items.iter().map(primitive).collect::<Result<Vec<_>>>()?;
            let elem = match items.first() {
                None => Type::Any,
                Some(first) => first.typ.clone(),
            };
            if let Some((idx, item)) = items.iter().enumerate().find(|(_, p)| p.typ != elem) {
                return Err(CompilerError::InvalidLiteral {
                    reason: format!(
                        "array element {idx} is '{}' but the array holds '{}'",
                        item.typ.label(),
                        elem.label()
                    ),
                });
            }
            Primitive::array(elem, items)
        }
        Literal::Map(entries) => {
            let mut out = BTreeMap::new();
            for (key, value) in entries {
                out.insert(key.clone(), primitive(value)?);
            }
            let first = out.values().next().map(|p| p.typ.clone());
            let value_type = match first {
                Some(first) if out.values().all(|p| p.typ == first) => first,
                _ => Type::Any,
            };
            Primitive::map(value_type, out)
        }
    })
}
