// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{child_type, int_type, same_type, CompileHandler, HandlerTable};
use crate::ast::Call;
use crate::bytecode::Chunk;
use crate::compiler::{Compiler, CompilerError};
use crate::types::{FunctionSignature, Type};

pub fn register(m: &mut HandlerTable) {
    m.insert(
        "[]".to_string(),
        CompileHandler::simple(FunctionSignature::new(1, vec![Type::Int]), child_type),
    );
    m.insert(
        "{}".to_string(),
        CompileHandler::simple(
            FunctionSignature::new(1, vec![Type::FunctionLike]),
            block_type,
        ),
    );
    m.insert(
        "length".to_string(),
        CompileHandler::simple(FunctionSignature::none(), int_type),
    );
    m.insert(
        "where".to_string(),
        CompileHandler::simple(
            FunctionSignature::new(1, vec![Type::FunctionLike]),
            same_type,
        ),
    );
    m.insert(
        "contains".to_string(),
        CompileHandler::custom(FunctionSignature::new(1, vec![Type::Any]), compile_contains),
    );
}

/// Each element becomes a map from block entrypoint label to value. A
/// repeated label is suffixed with `#<position>`.
fn block_type(_: &Type) -> Type {
    Type::array(Type::map(Type::String, Type::Any))
}

// `[]string` contains `string`
fn compile_contains(
    c: &mut Compiler<'_>,
    typ: &Type,
    binding: i32,
    id: &str,
    call: &Call,
) -> Result<Type, CompilerError> {
    if typ.child().ok() != Some(Type::String) {
        return Err(CompilerError::UnsupportedArgument {
            function: format!("{}.{id}", typ.label()),
            typ: typ.label(),
        });
    }
    let args = c.compile_args(
        id,
        &FunctionSignature::new(1, vec![Type::Any]),
        typ,
        &call.args,
    )?;
    let arg_type = args
        .first()
        .map_or(Type::Nil, |arg| c.operand_type(arg));
    if arg_type != Type::String {
        return Err(CompilerError::UnsupportedArgument {
            function: format!("{}.{id}", typ.label()),
            typ: arg_type.label(),
        });
    }
    c.add_chunk(Chunk::function("containsString", Type::Bool, binding, args));
    Ok(Type::Bool)
}
