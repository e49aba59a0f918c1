// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
#![allow(clippy::as_conversions)]

use data_encoding::BASE64;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::chunk::{Chunk, ChunkCall};
use super::primitive::Primitive;
use crate::types::Type;

/// Compiled query: an append-only chunk log plus its entrypoints.
///
/// Chunk references are 1-based positions in `chunks`; a chunk only ever
/// refers to chunks before it. Nested `functions` hold block bodies and are
/// referenced by 1-based index through `FunctionLike` primitives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Code {
    /// Checksum over all entrypoints.
    pub id: String,
    pub chunks: Vec<Chunk>,
    pub entrypoints: Vec<i32>,
    pub labels: IndexMap<i32, String>,
    pub functions: Vec<Code>,
    /// Leading property chunks bound by the caller.
    pub parameters: i32,
    pub checksums: IndexMap<i32, String>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return its reference.
    pub fn add_chunk(&mut self, chunk: Chunk) -> i32 {
        self.chunks.push(chunk);
        self.last_ref()
    }

    pub fn last_ref(&self) -> i32 {
        self.chunks.len() as i32
    }

    pub fn chunk(&self, chunk_ref: i32) -> Option<&Chunk> {
        let idx = usize::try_from(chunk_ref).ok()?.checked_sub(1)?;
        self.chunks.get(idx)
    }

    pub fn chunk_mut(&mut self, chunk_ref: i32) -> Option<&mut Chunk> {
        let idx = usize::try_from(chunk_ref).ok()?.checked_sub(1)?;
        self.chunks.get_mut(idx)
    }

    /// Append a nested function and return its 1-based index.
    pub fn add_function(&mut self, function: Code) -> i32 {
        self.functions.push(function);
        self.functions.len() as i32
    }

    pub fn function(&self, function_ref: i32) -> Option<&Code> {
        let idx = usize::try_from(function_ref).ok()?.checked_sub(1)?;
        self.functions.get(idx)
    }

    pub fn add_entrypoint(&mut self, chunk_ref: i32, label: &str) {
        self.entrypoints.push(chunk_ref);
        self.labels.insert(chunk_ref, label.to_string());
    }

    pub fn checksum(&self, chunk_ref: i32) -> Option<&str> {
        self.checksums.get(&chunk_ref).map(String::as_str)
    }

    /// Compute chunk checksums and the code id, bottom-up through nested
    /// functions. A checksum covers the chunk and everything it depends on,
    /// never the numeric reference values, so it is stable across
    /// recompilation of the same query.
    pub fn finalize(&mut self) {
        for function in &mut self.functions {
            function.finalize();
        }
        self.checksums.clear();
        for idx in 0..self.chunks.len() {
            let sum = self.chunk_checksum(&self.chunks[idx]);
            self.checksums.insert(idx as i32 + 1, sum);
        }

        let mut hasher = Sha256::new();
        for ep in &self.entrypoints {
            hash_bytes(&mut hasher, self.checksum(*ep).unwrap_or_default().as_bytes());
        }
        self.id = BASE64.encode(&hasher.finalize());
    }

    fn chunk_checksum(&self, chunk: &Chunk) -> String {
        let mut hasher = Sha256::new();
        hasher.update([match chunk.call {
            ChunkCall::Primitive => 1u8,
            ChunkCall::Function => 2,
            ChunkCall::Property => 3,
        }]);
        hash_bytes(&mut hasher, chunk.id.as_bytes());
        if let Some(primitive) = &chunk.primitive {
            self.hash_primitive(&mut hasher, primitive);
        }
        if let Some(function) = &chunk.function {
            hash_type(&mut hasher, &function.typ);
            if function.binding > 0 {
                self.hash_reference(&mut hasher, function.binding);
            }
            for arg in &function.args {
                self.hash_primitive(&mut hasher, arg);
            }
        }
        BASE64.encode(&hasher.finalize())
    }

    fn hash_reference(&self, hasher: &mut Sha256, chunk_ref: i32) {
        hash_bytes(hasher, self.checksum(chunk_ref).unwrap_or_default().as_bytes());
    }

    fn hash_primitive(&self, hasher: &mut Sha256, primitive: &Primitive) {
        hash_type(hasher, &primitive.typ);
        match primitive.typ {
            Type::Ref => {
                if let Ok(r) = primitive.as_reference() {
                    self.hash_reference(hasher, r);
                }
            }
            Type::FunctionLike => {
                let id = primitive
                    .as_reference()
                    .ok()
                    .and_then(|r| self.function(r))
                    .map(|f| f.id.as_str())
                    .unwrap_or_default();
                hash_bytes(hasher, id.as_bytes());
            }
            _ => hash_bytes(hasher, &primitive.value),
        }
        for item in &primitive.array {
            self.hash_primitive(hasher, item);
        }
        for (key, value) in &primitive.map {
            hash_bytes(hasher, key.as_bytes());
            self.hash_primitive(hasher, value);
        }
    }
}

fn hash_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

// Registry names always fit the compact encoding; the label covers the rest.
fn hash_type(hasher: &mut Sha256, typ: &Type) {
    match typ.encode() {
        Ok(bytes) => hash_bytes(hasher, &bytes),
        Err(_) => hash_bytes(hasher, typ.label().as_bytes()),
    }
}

/// Static type of `primitive` when read inside `code`. References are
/// followed to the chunk they point at; dangling references resolve to
/// `any`.
pub fn dereference_type(code: &Code, primitive: &Primitive) -> Type {
    if primitive.typ != Type::Ref {
        return primitive.typ.clone();
    }
    let Ok(chunk_ref) = primitive.as_reference() else {
        return Type::Any;
    };
    chunk_type(code, chunk_ref)
}

/// Result type of the chunk at `chunk_ref`.
pub fn chunk_type(code: &Code, chunk_ref: i32) -> Type {
    let Some(chunk) = code.chunk(chunk_ref) else {
        return Type::Any;
    };
    match chunk.call {
        ChunkCall::Function => chunk
            .function
            .as_ref()
            .map_or(Type::Any, |f| f.typ.clone()),
        ChunkCall::Primitive | ChunkCall::Property => match &chunk.primitive {
            // References only point backwards, so this terminates.
            Some(p) if p.typ == Type::Ref && p.as_reference().ok() != Some(chunk_ref) => {
                dereference_type(code, p)
            }
            Some(p) => p.typ.clone(),
            None => Type::Any,
        },
    }
}
