// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

use crate::types::TypeError;

/// Failures converting between runtime data, primitives and encoded code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    #[error("arrays of type '{label}' cannot be serialized; element types must be concrete")]
    AnyArray { label: String },

    #[error("array element {index} has type '{actual}', expected '{expected}'")]
    ArrayElementMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("value does not match declared type '{label}'")]
    ValueMismatch { label: String },

    #[error("invalid payload for type '{label}': {reason}")]
    InvalidPayload { label: String, reason: String },

    #[error("invalid code container: {0}")]
    InvalidContainer(String),

    #[error("unsupported format version {version}; maximum supported is {max}")]
    UnsupportedVersion { version: u32, max: u32 },

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type Result<T> = core::result::Result<T, SerializationError>;
