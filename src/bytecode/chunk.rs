// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

use super::primitive::Primitive;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkCall {
    /// Evaluates to its constant primitive.
    Primitive,
    /// Calls `id` on the bound chunk (or a resource when unbound).
    Function,
    /// Value supplied by the caller at execution time.
    Property,
}

/// Function call payload of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(rename = "type")]
    pub typ: Type,
    /// Chunk reference of the receiver; 0 when unbound.
    pub binding: i32,
    #[serde(default)]
    pub args: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub call: ChunkCall,
    pub id: String,
    #[serde(default)]
    pub function: Option<Function>,
    #[serde(default)]
    pub primitive: Option<Primitive>,
}

impl Chunk {
    pub fn primitive(primitive: Primitive) -> Self {
        let id = primitive.typ.label();
        Self {
            call: ChunkCall::Primitive,
            id,
            function: None,
            primitive: Some(primitive),
        }
    }

    pub fn function(id: &str, typ: Type, binding: i32, args: Vec<Primitive>) -> Self {
        Self {
            call: ChunkCall::Function,
            id: id.to_string(),
            function: Some(Function { typ, binding, args }),
            primitive: None,
        }
    }

    /// Property chunk; `typ` is the declared type of the supplied value.
    pub fn property(name: &str, typ: Type) -> Self {
        Self {
            call: ChunkCall::Property,
            id: name.to_string(),
            function: None,
            primitive: Some(Primitive {
                typ,
                value: Vec::new(),
                array: Vec::new(),
                map: Default::default(),
            }),
        }
    }

    /// Receiver reference, if any.
    pub fn binding(&self) -> i32 {
        self.function.as_ref().map_or(0, |f| f.binding)
    }

    pub fn args(&self) -> &[Primitive] {
        self.function.as_ref().map_or(&[], |f| f.args.as_slice())
    }
}
