// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;

use super::error::{ResourceError, Result};
use super::instance::Resource;
use super::registry::Registry;
use crate::bytecode::{RawData, RawValue};
use crate::config::Config;
use crate::motor::Motor;

/// Keyword arguments of a resource constructor.
pub type Args = BTreeMap<String, RawData>;

/// Computes the fields of one kind of resource.
pub trait ResourceProvider: Send + Sync {
    /// Instance id for the given arguments. `None` falls back to the
    /// resource name plus its sorted arguments.
    fn id(&self, _args: &Args) -> Option<String> {
        None
    }

    fn compute(&self, ctx: &FieldContext<'_>, field: &str) -> anyhow::Result<RawData>;
}

/// What a provider sees while computing a field.
pub struct FieldContext<'a> {
    runtime: &'a Runtime,
    resource: &'a Arc<Resource>,
}

impl<'a> FieldContext<'a> {
    pub(super) fn new(runtime: &'a Runtime, resource: &'a Arc<Resource>) -> Self {
        Self { runtime, resource }
    }

    pub fn runtime(&self) -> &Runtime {
        self.runtime
    }

    pub fn motor(&self) -> &Motor {
        self.runtime.motor()
    }

    pub fn resource(&self) -> &Arc<Resource> {
        self.resource
    }

    pub fn arg(&self, name: &str) -> Option<&RawData> {
        self.resource.arg(name)
    }

    /// String argument, if present and a string.
    pub fn arg_str(&self, name: &str) -> Option<&str> {
        match &self.resource.arg(name)?.value {
            RawValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Read another field of the same instance.
    pub fn get(&self, field: &str) -> Result<RawData> {
        self.resource.get(self.runtime, field)
    }
}

/// Live state shared by every query executed against one asset.
pub struct Runtime {
    registry: Arc<Registry>,
    motor: Motor,
    config: Config,
    instances: DashMap<(String, String), Arc<Resource>>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("resources", &self.registry.len())
            .field("instances", &self.instances.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Runtime {
    pub fn new(registry: Arc<Registry>, motor: Motor, config: Config) -> Self {
        Self {
            registry,
            motor,
            config,
            instances: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create (or reuse) the instance of `name` for the given arguments.
    pub fn create_resource(&self, name: &str, mut args: Args) -> Result<Arc<Resource>> {
        let cls = self
            .registry
            .resource(name)
            .ok_or_else(|| ResourceError::UnknownResource {
                name: name.to_string(),
            })?;

        let provider = match &cls.factory {
            Some(factory) => {
                factory(self, &mut args).map_err(|e| ResourceError::ConstructionError {
                    resource: name.to_string(),
                    cause: format!("{e:#}"),
                })?
            }
            None => None,
        };

        for (field_name, field) in &cls.info.fields {
            if field.is_mandatory && !args.contains_key(field_name) {
                return Err(ResourceError::ConstructionError {
                    resource: name.to_string(),
                    cause: format!("missing required argument '{field_name}'"),
                });
            }
        }
        if let Some(unknown) = args.keys().find(|k| !cls.info.fields.contains_key(*k)) {
            return Err(ResourceError::ConstructionError {
                resource: name.to_string(),
                cause: format!("unknown argument '{unknown}'"),
            });
        }

        let id = provider
            .as_ref()
            .and_then(|p| p.id(&args))
            .unwrap_or_else(|| default_id(name, &args));

        let instance = self
            .instances
            .entry((name.to_string(), id.clone()))
            .or_insert_with(|| {
                log::info!("created resource {name} id={id}");
                Arc::new(Resource::new(name, &id, args, provider))
            })
            .value()
            .clone();
        Ok(instance)
    }

    /// Read `field` of `resource` through its cache.
    pub fn get_field(&self, resource: &Arc<Resource>, field: &str) -> Result<RawData> {
        resource.get(self, field)
    }

    /// Previously created instance.
    pub fn instance(&self, name: &str, id: &str) -> Option<Arc<Resource>> {
        self.instances
            .get(&(name.to_string(), id.to_string()))
            .map(|e| e.value().clone())
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

fn default_id(name: &str, args: &Args) -> String {
    if args.is_empty() {
        return name.to_string();
    }
    let parts: Vec<String> = args
        .iter()
        .map(|(k, v)| format!("{k}={}", v.value))
        .collect();
    format!("{name}({})", parts.join(","))
}
