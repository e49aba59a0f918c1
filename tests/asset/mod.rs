// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

//! A mock asset: platform, command outputs, files and installed packages.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use assetql::bytecode::{RawData, RawValue, ResourceRef};
use assetql::motor::{MockTransport, Motor, Platform};
use assetql::resources::{
    core_registry, resource_factory, Args, FieldContext, ResourceProvider,
};
use assetql::{Config, Registry, Runtime, Type};
use serde::Deserialize;

const PACKAGES_SCHEMA: &str = r#"{
  "resources": {
    "packages": { "listType": "package" },
    "package": {
      "fields": {
        "name": { "type": "string", "isMandatory": true },
        "version": { "type": "string" },
        "installed": { "type": "bool" }
      }
    }
  }
}"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default = "installed_default")]
    pub installed: bool,
}

fn installed_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Asset {
    pub platform: Platform,
    pub packages: Vec<Package>,
    pub commands: BTreeMap<String, String>,
    pub files: BTreeMap<String, String>,
}

struct Packages {
    packages: Vec<Package>,
}

impl ResourceProvider for Packages {
    fn compute(&self, ctx: &FieldContext<'_>, field: &str) -> Result<RawData> {
        anyhow::ensure!(field == "list", "packages has no field '{field}'");
        let mut items = Vec::with_capacity(self.packages.len());
        for pkg in &self.packages {
            let mut args = Args::new();
            args.insert("name".to_string(), RawData::string(&pkg.name));
            args.insert("version".to_string(), RawData::string(&pkg.version));
            args.insert("installed".to_string(), RawData::bool(pkg.installed));
            let instance = ctx.runtime().create_resource("package", args)?;
            items.push(RawValue::Resource(ResourceRef::from_instance(instance)));
        }
        Ok(RawData::array(Type::resource("package"), items))
    }
}

impl Asset {
    pub fn with_packages(names: &[&str]) -> Self {
        Self {
            packages: names
                .iter()
                .map(|name| Package {
                    name: (*name).to_string(),
                    version: "1.0".to_string(),
                    installed: true,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn registry(&self) -> Result<Registry> {
        let mut registry = core_registry()?;
        registry.load_json(PACKAGES_SCHEMA)?;
        let packages = self.packages.clone();
        registry.add_factory(
            "packages",
            resource_factory(move |_, _| {
                Ok(Some(Arc::new(Packages {
                    packages: packages.clone(),
                }) as Arc<dyn ResourceProvider>))
            }),
        )?;
        Ok(registry)
    }

    pub fn transport(&self) -> MockTransport {
        let mut transport = MockTransport::new();
        for (command, stdout) in &self.commands {
            transport = transport.with_command(command, stdout);
        }
        for (path, content) in &self.files {
            transport = transport.with_file(path, content);
        }
        transport
    }

    pub fn runtime(&self, config: Config) -> Result<Runtime> {
        let motor = Motor::new(Arc::new(self.transport()), self.platform.clone());
        Ok(Runtime::new(Arc::new(self.registry()?), motor, config))
    }
}
