// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Compile-time dispatch table for builtin functions.
//!
//! Handlers are keyed by the receiver's dispatch class
//! ([`Type::underlying`]) and the function name. A handler either states
//! the result type directly or takes over compilation of the call.

pub mod arrays;
pub mod comparison;
pub mod maps;
pub mod resources;
pub mod strings;

use core::fmt;
use std::collections::BTreeMap;

use crate::ast::Call;
use crate::compiler::{Compiler, CompilerError};
use crate::types::{FunctionSignature, Type};

/// Result type of a simple builtin, given the receiver type.
pub type ResultTypeFcn = fn(&Type) -> Type;

/// Custom compilation of a call: receives the compiler, receiver type,
/// receiver chunk reference, function name and the call node; appends its
/// chunks and returns the result type.
pub type CompileFcn =
    fn(&mut Compiler<'_>, &Type, i32, &str, &Call) -> Result<Type, CompilerError>;

#[derive(Clone, Copy)]
pub enum HandlerKind {
    Simple(ResultTypeFcn),
    Custom(CompileFcn),
}

#[derive(Clone)]
pub struct CompileHandler {
    pub signature: FunctionSignature,
    pub kind: HandlerKind,
}

impl CompileHandler {
    pub fn simple(signature: FunctionSignature, result: ResultTypeFcn) -> Self {
        Self {
            signature,
            kind: HandlerKind::Simple(result),
        }
    }

    pub fn custom(signature: FunctionSignature, compile: CompileFcn) -> Self {
        Self {
            signature,
            kind: HandlerKind::Custom(compile),
        }
    }
}

impl fmt::Debug for CompileHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            HandlerKind::Simple(_) => "simple",
            HandlerKind::Custom(_) => "custom",
        };
        f.debug_struct("CompileHandler")
            .field("signature", &self.signature)
            .field("kind", &kind)
            .finish()
    }
}

pub type HandlerTable = BTreeMap<String, CompileHandler>;

/// Immutable table of builtin handlers, passed to the compiler.
#[derive(Debug, Clone, Default)]
pub struct BuiltinRegistry {
    table: BTreeMap<Type, HandlerTable>,
}

impl BuiltinRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The handlers every query can use.
    pub fn standard() -> Self {
        let mut table = BTreeMap::new();
        arrays::register(table.entry(Type::ArrayLike).or_default());
        maps::register(table.entry(Type::MapLike).or_default());
        resources::register(table.entry(Type::ResourceLike).or_default());
        strings::register(table.entry(Type::String).or_default());
        for typ in [Type::Int, Type::Float, Type::Score] {
            comparison::register_ordered(table.entry(typ.clone()).or_default(), &typ);
        }
        comparison::register_bool(table.entry(Type::Bool).or_default());
        comparison::register_time(table.entry(Type::Time).or_default());
        Self { table }
    }

    /// Add or replace a handler. `name` may be `""` to register a catch-all
    /// for the type class.
    pub fn with_handler(mut self, typ: &Type, name: &str, handler: CompileHandler) -> Self {
        self.table
            .entry(typ.underlying())
            .or_default()
            .insert(name.to_string(), handler);
        self
    }

    /// Exact name first, then the catch-all registered under `""`.
    pub fn lookup(&self, typ: &Type, name: &str) -> Option<&CompileHandler> {
        let handlers = self.table.get(&typ.underlying())?;
        handlers.get(name).or_else(|| handlers.get(""))
    }

    /// Builtin names for the class of `typ`, sorted.
    pub fn names(&self, typ: &Type) -> Vec<String> {
        self.table
            .get(&typ.underlying())
            .map(|handlers| {
                handlers
                    .keys()
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Result type `bool`.
pub fn bool_type(_: &Type) -> Type {
    Type::Bool
}

/// Result type `int`.
pub fn int_type(_: &Type) -> Type {
    Type::Int
}

/// Same type as the receiver.
pub fn same_type(typ: &Type) -> Type {
    typ.clone()
}

/// Element type of arrays, value type of maps.
pub fn child_type(typ: &Type) -> Type {
    typ.child().unwrap_or(Type::Any)
}
