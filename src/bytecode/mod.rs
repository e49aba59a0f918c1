// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Chunk-addressable bytecode and the runtime data it produces.

mod chunk;
mod code;
mod data;
mod error;
mod listing;
mod primitive;
mod serialization;

pub use chunk::{Chunk, ChunkCall, Function};
pub use code::{chunk_type, dereference_type, Code};
pub use data::{EvalResult, RawData, RawResult, RawValue, ResourceRef};
pub use error::SerializationError;
pub use listing::generate_code_listing;
pub use primitive::Primitive;
pub use serialization::VersionedCode;
