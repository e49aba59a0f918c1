// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{Code, VersionedCode};
use crate::bytecode::error::{Result, SerializationError};

impl Code {
    /// Serialize to pretty JSON wrapped with the format version.
    pub fn serialize_json(&self) -> Result<String> {
        let versioned = VersionedCode {
            version: Self::SERIALIZATION_VERSION,
            code: self.clone(),
        };
        serde_json::to_string_pretty(&versioned)
            .map_err(|e| SerializationError::Encoding(format!("JSON serialization failed: {e}")))
    }

    pub fn deserialize_json(data: &str) -> Result<Code> {
        let versioned: VersionedCode = serde_json::from_str(data)
            .map_err(|e| SerializationError::Encoding(format!("JSON parsing failed: {e}")))?;
        if versioned.version == 0 || versioned.version > Self::SERIALIZATION_VERSION {
            return Err(SerializationError::UnsupportedVersion {
                version: versioned.version,
                max: Self::SERIALIZATION_VERSION,
            });
        }
        Ok(versioned.code)
    }
}
