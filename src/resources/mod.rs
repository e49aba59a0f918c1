// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resource schemas and lazily computed resource instances.

mod error;
mod instance;
mod pack;
mod registry;
mod runtime;
mod schema;

pub use error::ResourceError;
pub use instance::{CacheEntry, FieldSource, Resource};
pub use pack::core_registry;
pub use registry::{resource_factory, validate_name, Registry, ResourceCls, ResourceFactory};
pub use runtime::{Args, FieldContext, ResourceProvider, Runtime};
pub use schema::{Field, ResourceInfo, Schema};

#[cfg(test)]
mod tests {
    mod pack;
    mod registry;
    mod runtime;
}
