// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
pub mod builtins;
pub mod bytecode;
pub mod compiler;
mod config;
mod executor;
pub mod jobpool;
pub mod motor;
pub mod resources;
mod types;

pub use builtins::BuiltinRegistry;
pub use bytecode::{Code, EvalResult, RawData, RawValue};
pub use compiler::{compile, CompilerError};
pub use config::Config;
pub use executor::{execute, execute_with_props, ExecutionError, Props};
pub use resources::{Registry, Runtime};
pub use types::{FunctionSignature, Type, TypeError};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ast::*;
}
