// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

use super::{Capability, CommandOutput, FileSystem, Platform, Transport};

#[derive(Debug, Default)]
struct LocalFs;

impl FileSystem for LocalFs {
    fn read_to_string(&self, path: &str) -> anyhow::Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }
}

/// Runs commands through the local shell and reads the local filesystem.
#[derive(Debug)]
pub struct LocalTransport {
    shell: Vec<String>,
    fs: LocalFs,
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalTransport {
    pub fn new() -> Self {
        let shell = if cfg!(windows) {
            vec!["powershell".to_string(), "-c".to_string()]
        } else {
            vec!["sh".to_string(), "-c".to_string()]
        };
        Self { shell, fs: LocalFs }
    }

    /// Descriptor of the machine this process runs on.
    pub fn platform() -> Platform {
        Platform {
            name: std::env::consts::OS.to_string(),
            title: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            release: String::new(),
            kind: "baremetal".to_string(),
            runtime: "local".to_string(),
            family: vec![std::env::consts::FAMILY.to_string()],
        }
    }
}

impl Transport for LocalTransport {
    fn run_command(&self, command: &str) -> anyhow::Result<CommandOutput> {
        log::debug!("local> run command {command}");
        let (program, args) = self
            .shell
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("no shell configured"))?;
        let output = Command::new(program).args(args).arg(command).output()?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_status: output.status.code().unwrap_or(-1),
        })
    }

    fn fs(&self) -> &dyn FileSystem {
        &self.fs
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        [Capability::RunCommand, Capability::File].into_iter().collect()
    }
}
