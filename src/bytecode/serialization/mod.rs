// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod binary;
mod json;

use serde::{Deserialize, Serialize};

use super::Code;

/// Versioned code wrapper used by both encodings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedCode {
    /// Format version for compatibility checking
    pub version: u32,
    pub code: Code,
}

impl Code {
    /// Current serialization format version
    pub const SERIALIZATION_VERSION: u32 = 1;
    /// Magic bytes identifying compiled query files
    pub const MAGIC: [u8; 4] = *b"AQLC";
}

#[cfg(test)]
mod tests;
