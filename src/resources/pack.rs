// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resources every asset supports: `platform`, `command` and `file`.

use std::sync::Arc;

use parking_lot::Mutex;

use super::error::Result;
use super::registry::{resource_factory, Registry, ResourceFactory};
use super::runtime::{Args, FieldContext, ResourceProvider};
use crate::bytecode::{RawData, RawValue};
use crate::motor::CommandOutput;
use crate::types::Type;

const CORE_SCHEMA: &str = include_str!("core.json");

/// Registry holding the core resources with their factories installed.
pub fn core_registry() -> Result<Registry> {
    let mut registry = Registry::new();
    registry.load_json(CORE_SCHEMA)?;
    registry.add_factory("platform", platform_factory())?;
    registry.add_factory("command", command_factory())?;
    registry.add_factory("file", file_factory())?;
    Ok(registry)
}

// The platform resource is fully described by its init step: every field
// becomes a constructor argument.
fn platform_factory() -> ResourceFactory {
    resource_factory(|runtime, args| {
        let platform = runtime.motor().platform();
        for (name, value) in [
            ("name", &platform.name),
            ("title", &platform.title),
            ("arch", &platform.arch),
            ("release", &platform.release),
            ("kind", &platform.kind),
            ("runtime", &platform.runtime),
        ] {
            args.insert(name.to_string(), RawData::string(value));
        }
        let family = platform
            .family
            .iter()
            .map(|f| RawValue::String(f.clone()))
            .collect();
        args.insert("family".to_string(), RawData::array(Type::String, family));
        Ok(Some(Arc::new(PlatformProvider) as Arc<dyn ResourceProvider>))
    })
}

struct PlatformProvider;

impl ResourceProvider for PlatformProvider {
    fn id(&self, _args: &Args) -> Option<String> {
        Some("platform".to_string())
    }

    fn compute(&self, _ctx: &FieldContext<'_>, field: &str) -> anyhow::Result<RawData> {
        anyhow::bail!("platform field '{field}' was not initialized")
    }
}

fn command_factory() -> ResourceFactory {
    resource_factory(|_runtime, _args| {
        Ok(Some(Arc::new(CommandProvider::default()) as Arc<dyn ResourceProvider>))
    })
}

/// Runs the command once and serves all output fields from that run.
#[derive(Default)]
struct CommandProvider {
    output: Mutex<Option<CommandOutput>>,
}

impl CommandProvider {
    fn output(&self, ctx: &FieldContext<'_>) -> anyhow::Result<CommandOutput> {
        let mut slot = self.output.lock();
        if let Some(output) = slot.as_ref() {
            return Ok(output.clone());
        }
        let command = ctx
            .arg_str("command")
            .ok_or_else(|| anyhow::anyhow!("command must be a string"))?;
        let output = ctx.motor().run_command(command)?;
        *slot = Some(output.clone());
        Ok(output)
    }
}

impl ResourceProvider for CommandProvider {
    fn id(&self, args: &Args) -> Option<String> {
        match &args.get("command")?.value {
            RawValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn compute(&self, ctx: &FieldContext<'_>, field: &str) -> anyhow::Result<RawData> {
        let output = self.output(ctx)?;
        match field {
            "stdout" => Ok(RawData::string(&output.stdout)),
            "stderr" => Ok(RawData::string(&output.stderr)),
            "exitcode" => Ok(RawData::int(i64::from(output.exit_status))),
            other => anyhow::bail!("command has no field '{other}'"),
        }
    }
}

fn file_factory() -> ResourceFactory {
    resource_factory(|_runtime, _args| {
        Ok(Some(Arc::new(FileProvider) as Arc<dyn ResourceProvider>))
    })
}

struct FileProvider;

impl ResourceProvider for FileProvider {
    fn id(&self, args: &Args) -> Option<String> {
        match &args.get("path")?.value {
            RawValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn compute(&self, ctx: &FieldContext<'_>, field: &str) -> anyhow::Result<RawData> {
        let path = ctx
            .arg_str("path")
            .ok_or_else(|| anyhow::anyhow!("path must be a string"))?;
        let fs = ctx.motor().fs()?;
        match field {
            "exists" => Ok(RawData::bool(fs.exists(path))),
            "content" => Ok(RawData::string(&fs.read_to_string(path)?)),
            other => anyhow::bail!("file has no field '{other}'"),
        }
    }
}
