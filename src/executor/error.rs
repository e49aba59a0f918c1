// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::bytecode::SerializationError;
use crate::resources::ResourceError;

#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
    #[error("chunk <{chunk_ref}> does not exist")]
    InvalidReference { chunk_ref: i32 },

    #[error("function <{function_ref}> does not exist")]
    InvalidFunction { function_ref: i32 },

    #[error("cannot find runtime function '{id}' for type '{typ}'")]
    UnknownFunction { id: String, typ: String },

    #[error("invalid argument for '{function}': {reason}")]
    InvalidArgument { function: String, reason: String },

    #[error("property '{name}' was not provided")]
    MissingProperty { name: String },

    #[error("execution exceeded the maximum depth of {max}")]
    DepthExceeded { max: usize },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

pub type Result<T> = ::core::result::Result<T, ExecutionError>;
