// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{ResourceError, Result};
use super::runtime::{Args, ResourceProvider, Runtime};
use super::schema::{Field, ResourceInfo, Schema};
use crate::types::{Type, MAX_RESOURCE_NAME_LEN};

/// Builds the provider for a new instance. Runs with the keyword arguments
/// of the constructor call and may add or rewrite them (the init step).
/// Returning `None` means every field comes from arguments or implicit
/// child resources.
pub type ResourceFactory = Arc<
    dyn Fn(&Runtime, &mut Args) -> anyhow::Result<Option<Arc<dyn ResourceProvider>>>
        + Send
        + Sync,
>;

/// Wrap a closure as a [`ResourceFactory`].
pub fn resource_factory<F>(f: F) -> ResourceFactory
where
    F: Fn(&Runtime, &mut Args) -> anyhow::Result<Option<Arc<dyn ResourceProvider>>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// A registered resource: its declaration and optional factory.
#[derive(Clone)]
pub struct ResourceCls {
    pub info: ResourceInfo,
    pub factory: Option<ResourceFactory>,
}

impl ResourceCls {
    fn new(name: &str) -> Self {
        Self {
            info: ResourceInfo::new(name),
            factory: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.id
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.info.fields.get(name)
    }
}

impl fmt::Debug for ResourceCls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCls")
            .field("info", &self.info)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

/// Validates that a name is not empty or whitespace-only and fits the
/// compact type encoding.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(ResourceError::InvalidName {
            name: name.to_string(),
        })
    } else if name.len() > MAX_RESOURCE_NAME_LEN {
        Err(ResourceError::NameTooLong {
            len: name.len(),
            max: MAX_RESOURCE_NAME_LEN,
        })
    } else {
        Ok(())
    }
}

/// Schema of every known resource.
///
/// Registries are built up front and then shared read-only (behind an `Arc`)
/// by the compiler and the runtime.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    resources: BTreeMap<String, ResourceCls>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a resource declaration and create any missing parents of a
    /// dotted name.
    pub fn add_resource_info(&mut self, mut info: ResourceInfo) -> Result<()> {
        validate_name(&info.id)?;
        for (key, field) in info.fields.iter_mut() {
            if field.name.is_empty() {
                field.name.clone_from(key);
            }
        }
        if let Some(elem) = &info.list_type {
            if !info.fields.contains_key("list") {
                info.fields
                    .insert("list".to_string(), Field::new("list", Type::array(elem.clone())));
            }
        }

        let name = info.id.clone();
        let private = info.private;
        match self.resources.entry(name.clone()) {
            Entry::Occupied(_) => return Err(ResourceError::DuplicateResource { name }),
            Entry::Vacant(e) => {
                e.insert(ResourceCls {
                    info,
                    factory: None,
                });
            }
        }

        self.ensure_resource_chain(&name, private);
        Ok(())
    }

    // For `a.b.c`, make sure `a` and `a.b` exist and link each level through
    // an implicit resource field. Parents start with the visibility of the
    // child that created them; any public child makes the chain public.
    fn ensure_resource_chain(&mut self, name: &str, private: bool) {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() < 2 {
            return;
        }

        let mut current = parts[0].to_string();
        for part in &parts[1..] {
            let next = format!("{current}.{part}");
            let parent = self.resources.entry(current.clone()).or_insert_with(|| {
                log::debug!("creating implicit resource '{current}' for '{name}'");
                let mut cls = ResourceCls::new(&current);
                cls.info.private = private;
                cls
            });
            if !private {
                parent.info.private = false;
            }

            let field = parent
                .info
                .fields
                .entry((*part).to_string())
                .or_insert_with(|| Field {
                    is_implicit_resource: true,
                    is_private: private,
                    ..Field::new(part, Type::resource(&next))
                });
            if !private {
                field.is_private = false;
            }

            current = next;
        }
    }

    /// Attach a factory to a declared resource.
    pub fn add_factory(&mut self, name: &str, factory: ResourceFactory) -> Result<()> {
        validate_name(name)?;
        let cls = self
            .resources
            .get_mut(name)
            .ok_or_else(|| ResourceError::UnknownResource {
                name: name.to_string(),
            })?;
        cls.factory = Some(factory);
        Ok(())
    }

    /// Load declarations from a JSON schema. Names are added in sorted order
    /// so that explicit parents land before the children that would
    /// otherwise create them implicitly.
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let schema: Schema =
            serde_json::from_str(json).map_err(|e| ResourceError::InvalidSchema(e.to_string()))?;
        self.load_schema(schema)
    }

    pub fn load_schema(&mut self, schema: Schema) -> Result<()> {
        for (name, mut info) in schema.resources {
            if info.id.is_empty() {
                info.id = name;
            }
            self.add_resource_info(info)?;
        }
        Ok(())
    }

    /// Copy every resource of `other` into this registry, replacing
    /// existing entries of the same name.
    pub fn add(&mut self, other: &Registry) {
        for (name, cls) in &other.resources {
            self.resources.insert(name.clone(), cls.clone());
        }
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceCls> {
        self.resources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Declared field of a resource.
    pub fn field(&self, resource: &str, field: &str) -> Option<&Field> {
        self.resources.get(resource)?.field(field)
    }

    /// All resource names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    /// Names of resources that queries may reference, sorted.
    pub fn public_names(&self) -> Vec<String> {
        self.resources
            .iter()
            .filter(|(_, cls)| !cls.info.private)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn fields(&self, name: &str) -> Result<&BTreeMap<String, Field>> {
        self.resources
            .get(name)
            .map(|cls| &cls.info.fields)
            .ok_or_else(|| ResourceError::UnknownResource {
                name: name.to_string(),
            })
    }

    pub fn schema(&self) -> Schema {
        Schema {
            resources: self
                .resources
                .iter()
                .map(|(name, cls)| (name.clone(), cls.info.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
