// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
#![allow(clippy::missing_const_for_fn)]

//! AST to bytecode compilation.
//!
//! Every top-level expression becomes an entrypoint of the resulting
//! [`Code`]. Receivers are compiled first, their static type picks the
//! handler, and each call appends one or more chunks. Block arguments
//! compile into nested functions whose first chunk is the bound element.

mod error;
mod literals;

pub use error::{CompilerError, Result};

use core::mem;

use crate::ast::{Arg, Call, Expr};
use crate::builtins::resources::LIST_FUNCTIONS;
use crate::builtins::{BuiltinRegistry, HandlerKind};
use crate::bytecode::{chunk_type, dereference_type, Chunk, Code, Primitive};
use crate::resources::Registry;
use crate::types::{FunctionSignature, Type};

// Saved state of the enclosing code while a block body is compiled.
#[derive(Debug)]
struct BlockFrame {
    outer: Code,
    bound: Type,
}

pub struct Compiler<'a> {
    schema: &'a Registry,
    builtins: &'a BuiltinRegistry,
    code: Code,
    blocks: Vec<BlockFrame>,
}

/// Compile `ast` against a resource schema and builtin table.
pub fn compile(ast: &[Expr], schema: &Registry, builtins: &BuiltinRegistry) -> Result<Code> {
    Compiler::new(schema, builtins).compile(ast)
}

impl<'a> Compiler<'a> {
    pub fn new(schema: &'a Registry, builtins: &'a BuiltinRegistry) -> Self {
        Self {
            schema,
            builtins,
            code: Code::new(),
            blocks: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'a Registry {
        self.schema
    }

    /// Code under construction (the innermost block body while inside one).
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// Compile a query. Any error aborts the whole compilation.
    pub fn compile(&mut self, ast: &[Expr]) -> Result<Code> {
        self.code = Code::new();
        self.blocks.clear();
        for expr in ast {
            let chunk_ref = self.compile_expr(expr)?;
            let label = expr.label();
            log::debug!("compiled entrypoint <{chunk_ref}> {label}");
            self.code.add_entrypoint(chunk_ref, &label);
        }
        let mut code = mem::take(&mut self.code);
        code.finalize();
        Ok(code)
    }

    /// Append a chunk to the code under construction.
    pub fn add_chunk(&mut self, chunk: Chunk) -> i32 {
        self.code.add_chunk(chunk)
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<i32> {
        match expr {
            Expr::Literal(lit) => {
                let primitive = literals::primitive(lit)?;
                Ok(self.add_chunk(Chunk::primitive(primitive)))
            }
            Expr::Call(call) => self.compile_call(call),
            Expr::Element => self.element_ref(),
            Expr::Block(_) => Err(CompilerError::UnexpectedBlock),
        }
    }

    fn element_ref(&self) -> Result<i32> {
        if self.blocks.is_empty() {
            Err(CompilerError::ElementOutsideBlock)
        } else {
            Ok(1)
        }
    }

    /// Compile an argument value into a primitive: literals inline, anything
    /// else as a reference to its chunk.
    pub fn compile_operand(&mut self, expr: &Expr) -> Result<Primitive> {
        match expr {
            Expr::Literal(lit) => literals::primitive(lit),
            Expr::Element => Ok(Primitive::reference(self.element_ref()?)),
            Expr::Call(call) => Ok(Primitive::reference(self.compile_call(call)?)),
            Expr::Block(_) => Err(CompilerError::UnexpectedBlock),
        }
    }

    /// Static type of a compiled operand.
    pub fn operand_type(&self, primitive: &Primitive) -> Type {
        dereference_type(&self.code, primitive)
    }

    fn compile_call(&mut self, call: &Call) -> Result<i32> {
        match &call.receiver {
            None => self.compile_root(call),
            Some(receiver) => {
                let binding = self.compile_expr(receiver)?;
                let typ = chunk_type(&self.code, binding);
                self.compile_method(&typ, binding, call)
            }
        }
    }

    /// Compile `call` on a receiver of type `typ` held in chunk `binding`.
    pub fn compile_method(&mut self, typ: &Type, binding: i32, call: &Call) -> Result<i32> {
        if let Some(resource) = typ.resource_name() {
            if let Some(field) = self.schema.field(resource, &call.name) {
                if field.is_private {
                    return Err(CompilerError::UnknownField {
                        resource: resource.to_string(),
                        field: call.name.clone(),
                    });
                }
                if !call.args.is_empty() {
                    return Err(CompilerError::TooManyArguments {
                        function: call.name.clone(),
                        max: 0,
                        actual: call.args.len(),
                    });
                }
                let chunk = Chunk::function(&call.name, field.typ.clone(), binding, Vec::new());
                return Ok(self.add_chunk(chunk));
            }
        }

        let Some(handler) = self.builtins.lookup(typ, &call.name) else {
            return Err(CompilerError::UnknownFunction {
                name: call.name.clone(),
                typ: typ.label(),
                available: self.available(typ),
            });
        };
        let handler = handler.clone();
        match handler.kind {
            HandlerKind::Simple(result_type) => {
                let args = self.compile_args(&call.name, &handler.signature, typ, &call.args)?;
                let chunk = Chunk::function(&call.name, result_type(typ), binding, args);
                Ok(self.add_chunk(chunk))
            }
            HandlerKind::Custom(compile) => {
                compile(self, typ, binding, &call.name, call)?;
                Ok(self.code.last_ref())
            }
        }
    }

    /// Every name callable on `typ`: builtins plus public resource fields.
    /// List builtins are left out for resources without a `list_type`.
    pub fn available(&self, typ: &Type) -> Vec<String> {
        let mut names = self.builtins.names(typ);
        if let Some(cls) = typ.resource_name().and_then(|r| self.schema.resource(r)) {
            if cls.info.list_type.is_none() {
                names.retain(|name| !LIST_FUNCTIONS.contains(&name.as_str()));
            }
            names.extend(
                cls.info
                    .fields
                    .values()
                    .filter(|f| !f.is_private)
                    .map(|f| f.name.clone()),
            );
        }
        names.sort();
        names.dedup();
        names
    }

    /// Validate and compile positional arguments against `signature`.
    /// Block arguments are compiled as functions bound to the element type
    /// of `receiver`.
    pub fn compile_args(
        &mut self,
        function: &str,
        signature: &FunctionSignature,
        receiver: &Type,
        args: &[Arg],
    ) -> Result<Vec<Primitive>> {
        if args.len() > signature.args.len() {
            return Err(CompilerError::TooManyArguments {
                function: function.to_string(),
                max: signature.args.len(),
                actual: args.len(),
            });
        }

        let mut out = Vec::with_capacity(args.len());
        for (idx, expected) in signature.args.iter().enumerate() {
            let position = idx + 1;
            let Some(arg) = args.get(idx) else {
                if idx < signature.required {
                    return Err(CompilerError::MissingArgument {
                        function: function.to_string(),
                        position,
                        expected: expected.label(),
                    });
                }
                break;
            };
            if let Some(name) = &arg.name {
                return Err(CompilerError::NamedArgument {
                    function: function.to_string(),
                    name: name.clone(),
                });
            }

            let primitive = match (&arg.value, expected) {
                (Expr::Block(body), Type::FunctionLike) => {
                    self.compile_block(block_binding(self.schema, receiver), body)?
                }
                (value, _) => self.compile_operand(value)?,
            };
            let actual = self.operand_type(&primitive);
            if !actual.is_compatible_with(expected) {
                return Err(CompilerError::TypeMismatch {
                    function: function.to_string(),
                    position,
                    expected: expected.label(),
                    actual: actual.label(),
                });
            }
            out.push(primitive);
        }
        Ok(out)
    }

    /// Compile a block body into a nested function whose chunk 1 is the
    /// bound element `_`.
    pub fn compile_block(&mut self, bound: Type, body: &[Expr]) -> Result<Primitive> {
        let outer = mem::take(&mut self.code);
        self.blocks.push(BlockFrame {
            outer,
            bound: bound.clone(),
        });
        self.code.add_chunk(Chunk::property("_", bound));
        self.code.parameters = 1;

        let mut result = Ok(());
        for expr in body {
            match self.compile_expr(expr) {
                Ok(chunk_ref) => self.code.add_entrypoint(chunk_ref, &expr.label()),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }

        let function = match self.blocks.pop() {
            Some(frame) => mem::replace(&mut self.code, frame.outer),
            None => mem::take(&mut self.code),
        };
        result?;
        Ok(Primitive::function(self.code.add_function(function)))
    }

    // A bare name is a field of the block's bound resource when one exists,
    // otherwise a resource constructor.
    fn compile_root(&mut self, call: &Call) -> Result<i32> {
        if let Some(frame) = self.blocks.last() {
            let bound = frame.bound.clone();
            let is_field = bound
                .resource_name()
                .is_some_and(|r| self.schema.field(r, &call.name).is_some());
            if is_field {
                return self.compile_method(&bound, 1, call);
            }
        }

        let name = &call.name;
        let schema = self.schema;
        let cls = schema
            .resource(name)
            .filter(|cls| !cls.info.private)
            .ok_or_else(|| CompilerError::UnknownResource {
                name: name.clone(),
                available: schema.public_names(),
            })?;

        let mut args = Vec::with_capacity(call.args.len() * 2);
        let mut seen: Vec<&str> = Vec::new();
        for arg in &call.args {
            let Some(arg_name) = &arg.name else {
                return Err(CompilerError::UnnamedResourceArgument {
                    resource: name.clone(),
                });
            };
            if seen.contains(&arg_name.as_str()) {
                return Err(CompilerError::DuplicateArgument {
                    resource: name.clone(),
                    name: arg_name.clone(),
                });
            }
            seen.push(arg_name);

            let field = cls.field(arg_name).ok_or_else(|| CompilerError::UnknownField {
                resource: name.clone(),
                field: arg_name.clone(),
            })?;
            let value = self.compile_operand(&arg.value)?;
            let actual = self.operand_type(&value);
            if !actual.is_compatible_with(&field.typ) {
                return Err(CompilerError::TypeMismatch {
                    function: name.clone(),
                    position: seen.len(),
                    expected: field.typ.label(),
                    actual: actual.label(),
                });
            }
            args.push(Primitive::string(arg_name));
            args.push(value);
        }

        let chunk = Chunk::function(name, Type::resource(name), 0, args);
        Ok(self.add_chunk(chunk))
    }
}

/// Type bound to `_` when a block is applied to `receiver`.
pub fn block_binding(schema: &Registry, receiver: &Type) -> Type {
    match receiver {
        Type::Array(elem) => (**elem).clone(),
        Type::Resource(name) => schema
            .resource(name)
            .and_then(|cls| cls.info.list_type.clone())
            .unwrap_or_else(|| receiver.clone()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests;
