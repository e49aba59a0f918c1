// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource '{name}' is not registered")]
    UnknownResource { name: String },

    #[error("resource '{name}' is already defined; merging resource definitions is not supported")]
    DuplicateResource { name: String },

    #[error("the name '{name}' is invalid (empty or whitespace-only names are not allowed)")]
    InvalidName { name: String },

    #[error("resource name of {len} bytes exceeds the {max} byte limit")]
    NameTooLong { len: usize, max: usize },

    #[error("cannot create resource '{resource}': {cause}")]
    ConstructionError { resource: String, cause: String },

    #[error("failed to compute field '{field}' of resource '{resource}': {cause}")]
    FieldComputationError {
        resource: String,
        field: String,
        cause: String,
    },

    #[error("operation not supported by the transport: missing capability '{capability}'")]
    UnsupportedOperation { capability: String },

    #[error("field '{field}' of resource '{resource}' depends on itself")]
    CyclicFieldDependency { resource: String, field: String },

    #[error("resource '{resource}' has no field '{field}'")]
    UnknownField { resource: String, field: String },

    #[error("cannot load resource schema: {0}")]
    InvalidSchema(String),
}

pub type Result<T> = core::result::Result<T, ResourceError>;
