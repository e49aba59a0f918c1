// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cell::RefCell;
use core::fmt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use super::error::{ResourceError, Result};
use super::runtime::{Args, FieldContext, ResourceProvider, Runtime};
use crate::bytecode::{RawData, RawValue, ResourceRef};
use crate::types::Type;

/// Cached outcome of one field computation.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub valid: bool,
    /// Unix seconds at which the value was stored.
    pub timestamp: i64,
    pub data: RawData,
}

#[derive(Debug, Default)]
struct FieldCache {
    entries: BTreeMap<String, CacheEntry>,
    // Fields currently being computed by the thread holding the lock.
    computing: BTreeSet<String>,
}

/// Where the value of a field comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// A constructor argument of the same name.
    Argument,
    /// A child resource, created on first access.
    Implicit(String),
    /// Computed by the resource's provider.
    Provider,
}

/// A live resource instance with its per-field cache.
///
/// Field reads are serialized per instance by a reentrant lock, so a
/// provider may read sibling fields of the same instance while computing.
pub struct Resource {
    name: String,
    id: String,
    args: Args,
    provider: Option<Arc<dyn ResourceProvider>>,
    cache: ReentrantMutex<RefCell<FieldCache>>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("args", &self.args.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Resource {
    pub(super) fn new(
        name: &str,
        id: &str,
        args: Args,
        provider: Option<Arc<dyn ResourceProvider>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            args,
            provider,
            cache: ReentrantMutex::new(RefCell::new(FieldCache::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub fn arg(&self, name: &str) -> Option<&RawData> {
        self.args.get(name)
    }

    /// Snapshot of a cache entry, valid or not.
    pub fn cached(&self, field: &str) -> Option<CacheEntry> {
        let guard = self.cache.lock();
        let cache = guard.borrow();
        cache.entries.get(field).cloned()
    }

    /// Mark a cached field stale so the next read recomputes it.
    pub fn invalidate(&self, field: &str) {
        let guard = self.cache.lock();
        let mut cache = guard.borrow_mut();
        if let Some(entry) = cache.entries.get_mut(field) {
            entry.valid = false;
        }
    }

    fn field_source(&self, runtime: &Runtime, field: &str) -> Result<(FieldSource, Type)> {
        let declared = runtime
            .registry()
            .field(&self.name, field)
            .ok_or_else(|| ResourceError::UnknownField {
                resource: self.name.clone(),
                field: field.to_string(),
            })?;
        let source = if self.args.contains_key(field) {
            FieldSource::Argument
        } else if declared.is_implicit_resource {
            let child = declared
                .typ
                .resource_name()
                .map_or_else(|| format!("{}.{field}", self.name), str::to_string);
            FieldSource::Implicit(child)
        } else {
            FieldSource::Provider
        };
        Ok((source, declared.typ.clone()))
    }

    /// Read a field, computing and caching it on first access.
    ///
    /// Errors are cached like values (unless disabled in the runtime
    /// config) and reported as `FieldComputationError`. Reading a field
    /// from within its own computation fails with `CyclicFieldDependency`.
    pub fn get(self: &Arc<Self>, runtime: &Runtime, field: &str) -> Result<RawData> {
        let guard = self.cache.lock();
        {
            let cache = guard.borrow();
            if let Some(entry) = cache.entries.get(field).filter(|e| e.valid) {
                return self.entry_result(field, &entry.data);
            }
            if cache.computing.contains(field) {
                return Err(ResourceError::CyclicFieldDependency {
                    resource: self.name.clone(),
                    field: field.to_string(),
                });
            }
        }

        let (source, typ) = self.field_source(runtime, field)?;
        guard.borrow_mut().computing.insert(field.to_string());
        log::debug!("computing {}[{}].{field} via {source:?}", self.name, self.id);
        let outcome = self.compute(runtime, field, &source, &typ);
        let mut cache = guard.borrow_mut();
        cache.computing.remove(field);

        let data = match outcome {
            Ok(mut data) => {
                if data.value.is_nil() && data.typ == Type::Nil {
                    data.typ = typ;
                }
                data
            }
            Err(err) => {
                if let Some(cyclic @ ResourceError::CyclicFieldDependency { .. }) =
                    err.downcast_ref::<ResourceError>()
                {
                    return Err(cyclic.clone());
                }
                log::warn!("{}.{field} failed: {err:#}", self.name);
                RawData::error(typ, format!("{err:#}"))
            }
        };

        if data.error.is_none() || runtime.config().cache_errors {
            cache.entries.insert(
                field.to_string(),
                CacheEntry {
                    valid: true,
                    timestamp: chrono::Utc::now().timestamp(),
                    data: data.clone(),
                },
            );
        }
        self.entry_result(field, &data)
    }

    fn entry_result(&self, field: &str, data: &RawData) -> Result<RawData> {
        match &data.error {
            Some(cause) => Err(ResourceError::FieldComputationError {
                resource: self.name.clone(),
                field: field.to_string(),
                cause: cause.clone(),
            }),
            None => Ok(data.clone()),
        }
    }

    fn compute(
        self: &Arc<Self>,
        runtime: &Runtime,
        field: &str,
        source: &FieldSource,
        typ: &Type,
    ) -> anyhow::Result<RawData> {
        match source {
            FieldSource::Argument => {
                let arg = self
                    .args
                    .get(field)
                    .ok_or_else(|| anyhow::anyhow!("argument '{field}' is missing"))?;
                let mut data = arg.clone();
                if !data.value.is_nil() && data.typ.contains_any() {
                    data.typ = typ.clone();
                }
                Ok(data)
            }
            FieldSource::Implicit(child) => {
                let instance = runtime.create_resource(child, Args::new())?;
                Ok(RawData::resource(ResourceRef::from_instance(instance)))
            }
            FieldSource::Provider => {
                let provider = self.provider.as_ref().ok_or_else(|| {
                    anyhow::anyhow!("resource '{}' has no provider for field '{field}'", self.name)
                })?;
                let ctx = FieldContext::new(runtime, self);
                let mut data = provider.compute(&ctx, field)?;
                if let RawValue::Nil = data.value {
                    if data.error.is_none() {
                        data.typ = typ.clone();
                    }
                }
                Ok(data)
            }
        }
    }
}
