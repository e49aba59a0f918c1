// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use postcard::{from_bytes, to_allocvec};

use super::Code;
use crate::bytecode::error::{Result, SerializationError};

const HEADER_LEN: usize = 12;

impl Code {
    fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
        let bytes = data
            .get(offset..offset.checked_add(4).ok_or_else(overflow)?)
            .ok_or_else(|| {
                SerializationError::InvalidContainer(format!("cannot read u32 at offset {offset}"))
            })?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Serialize to the binary container: magic, format version, body length
    /// and a postcard body.
    pub fn serialize_binary(&self) -> Result<Vec<u8>> {
        let body = to_allocvec(self).map_err(|e| {
            SerializationError::Encoding(format!("code postcard serialization failed: {e}"))
        })?;
        let body_len = u32::try_from(body.len())
            .map_err(|_| SerializationError::Encoding("code body too large".to_string()))?;

        let mut buffer = Vec::with_capacity(HEADER_LEN + body.len());
        buffer.extend_from_slice(&Self::MAGIC);
        buffer.extend_from_slice(&Self::SERIALIZATION_VERSION.to_le_bytes());
        buffer.extend_from_slice(&body_len.to_le_bytes());
        buffer.extend_from_slice(&body);
        Ok(buffer)
    }

    /// Deserialize from the binary container, checking magic and version.
    pub fn deserialize_binary(data: &[u8]) -> Result<Code> {
        if data.len() < HEADER_LEN {
            return Err(SerializationError::InvalidContainer(
                "data too short for header".to_string(),
            ));
        }
        if data.get(0..4) != Some(Self::MAGIC.as_slice()) {
            return Err(SerializationError::InvalidContainer(
                "magic number mismatch".to_string(),
            ));
        }

        let version = Self::read_u32(data, 4)?;
        if version == 0 || version > Self::SERIALIZATION_VERSION {
            return Err(SerializationError::UnsupportedVersion {
                version,
                max: Self::SERIALIZATION_VERSION,
            });
        }

        let body_len = usize::try_from(Self::read_u32(data, 8)?).map_err(|_| overflow())?;
        let end = HEADER_LEN.checked_add(body_len).ok_or_else(overflow)?;
        let body = data
            .get(HEADER_LEN..end)
            .ok_or_else(|| SerializationError::InvalidContainer("data truncated".to_string()))?;

        from_bytes(body).map_err(|e| {
            SerializationError::Encoding(format!("code deserialization failed: {e}"))
        })
    }
}

fn overflow() -> SerializationError {
    SerializationError::InvalidContainer("offset overflow".to_string())
}
