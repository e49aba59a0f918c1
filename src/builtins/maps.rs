// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{child_type, int_type, CompileHandler, HandlerTable};
use crate::types::{FunctionSignature, Type};

pub fn register(m: &mut HandlerTable) {
    m.insert(
        "[]".to_string(),
        CompileHandler::simple(FunctionSignature::new(1, vec![Type::String]), child_type),
    );
    m.insert(
        "length".to_string(),
        CompileHandler::simple(FunctionSignature::none(), int_type),
    );
    m.insert(
        "keys".to_string(),
        CompileHandler::simple(FunctionSignature::none(), keys_type),
    );
    m.insert(
        "values".to_string(),
        CompileHandler::simple(FunctionSignature::none(), values_type),
    );
}

fn keys_type(typ: &Type) -> Type {
    Type::array(typ.key().unwrap_or(Type::String))
}

fn values_type(typ: &Type) -> Type {
    Type::array(typ.child().unwrap_or(Type::Any))
}
