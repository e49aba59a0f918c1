// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;

use super::{Capability, CommandOutput, FileSystem, Transport};

#[derive(Debug, Default)]
struct MockFs {
    files: BTreeMap<String, String>,
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &str) -> anyhow::Result<String> {
        match self.files.get(path) {
            Some(content) => Ok(content.clone()),
            None => anyhow::bail!("file '{path}' not found"),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}

/// In-memory transport with canned command output and files.
#[derive(Debug)]
pub struct MockTransport {
    commands: BTreeMap<String, CommandOutput>,
    fs: MockFs,
    capabilities: BTreeSet<Capability>,
    history: Mutex<Vec<String>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
            fs: MockFs::default(),
            capabilities: [Capability::RunCommand, Capability::File].into_iter().collect(),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_command(self, command: &str, stdout: &str) -> Self {
        self.with_command_output(
            command,
            CommandOutput {
                stdout: stdout.to_string(),
                ..CommandOutput::default()
            },
        )
    }

    pub fn with_command_output(mut self, command: &str, output: CommandOutput) -> Self {
        self.commands.insert(command.to_string(), output);
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.fs.files.insert(path.to_string(), content.to_string());
        self
    }

    pub fn without_capability(mut self, capability: Capability) -> Self {
        self.capabilities.remove(&capability);
        self
    }

    /// Commands run so far, in order.
    pub fn commands_run(&self) -> Vec<String> {
        self.history.lock().clone()
    }
}

impl Transport for MockTransport {
    fn run_command(&self, command: &str) -> anyhow::Result<CommandOutput> {
        self.history.lock().push(command.to_string());
        match self.commands.get(command) {
            Some(output) => Ok(output.clone()),
            None => Ok(CommandOutput {
                stdout: String::new(),
                stderr: format!("sh: {command}: command not found\n"),
                exit_status: 127,
            }),
        }
    }

    fn fs(&self) -> &dyn FileSystem {
        &self.fs
    }

    fn capabilities(&self) -> BTreeSet<Capability> {
        self.capabilities.clone()
    }
}
