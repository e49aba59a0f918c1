// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{bool_type, CompileHandler, HandlerTable};
use crate::types::{FunctionSignature, Type};

fn insert_ops(m: &mut HandlerTable, ops: &[&str], operand: &Type) {
    for op in ops {
        m.insert(
            (*op).to_string(),
            CompileHandler::simple(FunctionSignature::new(1, vec![operand.clone()]), bool_type),
        );
    }
}

/// Numeric types: equality and ordering against the same type.
pub fn register_ordered(m: &mut HandlerTable, typ: &Type) {
    insert_ops(m, &["==", "!=", "<", "<=", ">", ">="], typ);
}

pub fn register_bool(m: &mut HandlerTable) {
    insert_ops(m, &["==", "!=", "&&", "||"], &Type::Bool);
}

pub fn register_time(m: &mut HandlerTable) {
    insert_ops(m, &["==", "!=", "<", ">"], &Type::Time);
}
