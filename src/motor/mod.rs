// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Access to the scanned system.
//!
//! A [`Transport`] runs commands and reads files on the target; the [`Motor`]
//! wraps it together with the platform descriptor and refuses operations the
//! transport does not advertise.

#[cfg(feature = "local")]
mod local;
mod mock;

#[cfg(feature = "local")]
pub use local::LocalTransport;
pub use mock::MockTransport;

use core::fmt;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::resources::ResourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    RunCommand,
    File,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::RunCommand => f.write_str("run-command"),
            Capability::File => f.write_str("file"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &str) -> anyhow::Result<String>;
    fn exists(&self, path: &str) -> bool;
}

pub trait Transport: Send + Sync {
    fn run_command(&self, command: &str) -> anyhow::Result<CommandOutput>;
    fn fs(&self) -> &dyn FileSystem;
    fn capabilities(&self) -> BTreeSet<Capability>;
}

/// Read-only description of the scanned platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    pub name: String,
    pub title: String,
    pub arch: String,
    pub release: String,
    pub kind: String,
    pub runtime: String,
    pub family: Vec<String>,
}

#[derive(Clone)]
pub struct Motor {
    transport: Arc<dyn Transport>,
    platform: Platform,
}

impl fmt::Debug for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Motor")
            .field("platform", &self.platform)
            .field("capabilities", &self.transport.capabilities())
            .finish()
    }
}

impl Motor {
    pub fn new(transport: Arc<dyn Transport>, platform: Platform) -> Self {
        Self {
            transport,
            platform,
        }
    }

    /// Motor over the local machine.
    #[cfg(feature = "local")]
    pub fn local() -> Self {
        Self::new(Arc::new(LocalTransport::new()), LocalTransport::platform())
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.transport.capabilities().contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), ResourceError> {
        if self.has_capability(capability) {
            Ok(())
        } else {
            Err(ResourceError::UnsupportedOperation {
                capability: capability.to_string(),
            })
        }
    }

    pub fn run_command(&self, command: &str) -> anyhow::Result<CommandOutput> {
        self.require(Capability::RunCommand)?;
        log::debug!("motor> run command {command}");
        self.transport.run_command(command)
    }

    pub fn fs(&self) -> Result<&dyn FileSystem, ResourceError> {
        self.require(Capability::File)?;
        Ok(self.transport.fs())
    }
}
