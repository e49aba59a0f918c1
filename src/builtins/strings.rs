// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{bool_type, int_type, same_type, CompileHandler, HandlerTable};
use crate::ast::Call;
use crate::bytecode::Chunk;
use crate::compiler::{Compiler, CompilerError};
use crate::types::{FunctionSignature, Type};

pub fn register(m: &mut HandlerTable) {
    m.insert(
        "contains".to_string(),
        CompileHandler::custom(FunctionSignature::new(1, vec![Type::Any]), compile_contains),
    );
    m.insert(
        "downcase".to_string(),
        CompileHandler::simple(FunctionSignature::none(), same_type),
    );
    m.insert(
        "upcase".to_string(),
        CompileHandler::simple(FunctionSignature::none(), same_type),
    );
    m.insert(
        "length".to_string(),
        CompileHandler::simple(FunctionSignature::none(), int_type),
    );
    for op in ["==", "!="] {
        m.insert(
            op.to_string(),
            CompileHandler::simple(FunctionSignature::new(1, vec![Type::String]), bool_type),
        );
    }
}

// The runtime function id carries the argument type: `containsString` or
// `containsArrayString`.
fn compile_contains(
    c: &mut Compiler<'_>,
    typ: &Type,
    binding: i32,
    id: &str,
    call: &Call,
) -> Result<Type, CompilerError> {
    let args = c.compile_args(
        id,
        &FunctionSignature::new(1, vec![Type::Any]),
        typ,
        &call.args,
    )?;
    let arg_type = args
        .first()
        .map_or(Type::Nil, |arg| c.operand_type(arg));

    let function = match &arg_type {
        Type::String => "containsString",
        Type::Array(elem) if **elem == Type::String => "containsArrayString",
        other => {
            return Err(CompilerError::UnsupportedArgument {
                function: format!("string.{id}"),
                typ: other.label(),
            })
        }
    };
    c.add_chunk(Chunk::function(function, Type::Bool, binding, args));
    Ok(Type::Bool)
}
