// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilerError {
    #[error("cannot find function '{name}' for type '{typ}' (available: {})", .available.join(", "))]
    UnknownFunction {
        name: String,
        typ: String,
        available: Vec<String>,
    },

    #[error("cannot find resource '{name}' (available: {})", .available.join(", "))]
    UnknownResource { name: String, available: Vec<String> },

    #[error("resource '{resource}' has no field '{field}'")]
    UnknownField { resource: String, field: String },

    #[error("function '{function}' is missing argument {position} of type '{expected}'")]
    MissingArgument {
        function: String,
        position: usize,
        expected: String,
    },

    #[error("function '{function}' takes at most {max} arguments, got {actual}")]
    TooManyArguments {
        function: String,
        max: usize,
        actual: usize,
    },

    #[error("argument {position} of '{function}' must be '{expected}', found '{actual}'")]
    TypeMismatch {
        function: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("cannot find #{function} with this type {typ}")]
    UnsupportedArgument { function: String, typ: String },

    #[error("function '{function}' does not accept named argument '{name}'")]
    NamedArgument { function: String, name: String },

    #[error("arguments of resource '{resource}' must be named")]
    UnnamedResourceArgument { resource: String },

    #[error("argument '{name}' given more than once for resource '{resource}'")]
    DuplicateArgument { resource: String, name: String },

    #[error("resource '{resource}' is not a list")]
    NotListResource { resource: String },

    #[error("invalid literal: {reason}")]
    InvalidLiteral { reason: String },

    #[error("'_' can only be used inside a block")]
    ElementOutsideBlock,

    #[error("a block must be passed as a function argument")]
    UnexpectedBlock,
}

pub type Result<T> = ::core::result::Result<T, CompilerError>;
