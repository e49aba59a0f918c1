// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! List resources expose `length` and `where` through their `list` field.

use super::{CompileHandler, HandlerTable};
use crate::ast::Call;
use crate::bytecode::Chunk;
use crate::compiler::{Compiler, CompilerError};
use crate::types::{FunctionSignature, Type};

/// Builtins that only apply to resources with a `list_type`.
pub const LIST_FUNCTIONS: [&str; 2] = ["length", "where"];

pub fn register(m: &mut HandlerTable) {
    m.insert(
        "where".to_string(),
        CompileHandler::custom(
            FunctionSignature::new(1, vec![Type::FunctionLike]),
            compile_where,
        ),
    );
    m.insert(
        "length".to_string(),
        CompileHandler::custom(FunctionSignature::none(), compile_length),
    );
}

// Emits the `list` field chunk and returns its reference and type.
fn compile_list(c: &mut Compiler<'_>, typ: &Type, binding: i32) -> Result<(i32, Type), CompilerError> {
    let name = typ.resource_name().unwrap_or_default();
    let elem = c
        .schema()
        .resource(name)
        .and_then(|cls| cls.info.list_type.clone())
        .ok_or_else(|| CompilerError::NotListResource {
            resource: typ.label(),
        })?;
    let list_type = Type::array(elem);
    let list = c.add_chunk(Chunk::function("list", list_type.clone(), binding, Vec::new()));
    Ok((list, list_type))
}

fn compile_length(
    c: &mut Compiler<'_>,
    typ: &Type,
    binding: i32,
    id: &str,
    call: &Call,
) -> Result<Type, CompilerError> {
    c.compile_args(id, &FunctionSignature::none(), typ, &call.args)?;
    let (list, _) = compile_list(c, typ, binding)?;
    c.add_chunk(Chunk::function("length", Type::Int, list, Vec::new()));
    Ok(Type::Int)
}

fn compile_where(
    c: &mut Compiler<'_>,
    typ: &Type,
    binding: i32,
    id: &str,
    call: &Call,
) -> Result<Type, CompilerError> {
    let (list, list_type) = compile_list(c, typ, binding)?;
    let args = c.compile_args(
        id,
        &FunctionSignature::new(1, vec![Type::FunctionLike]),
        &list_type,
        &call.args,
    )?;
    c.add_chunk(Chunk::function("where", list_type.clone(), list, args));
    Ok(list_type)
}
