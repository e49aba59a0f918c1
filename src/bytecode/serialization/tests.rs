// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
#![allow(clippy::unwrap_used)]

use crate::bytecode::{Chunk, Code, Primitive, SerializationError};
use crate::types::Type;

fn block_code() -> Code {
    let mut block = Code::new();
    let element = block.add_chunk(Chunk::property("_", Type::resource("package")));
    let name = block.add_chunk(Chunk::function("name", Type::String, element, Vec::new()));
    let eq = block.add_chunk(Chunk::function(
        "==",
        Type::Bool,
        name,
        vec![Primitive::string("bash")],
    ));
    block.parameters = 1;
    block.entrypoints.push(eq);

    let mut code = Code::new();
    let packages = code.add_chunk(Chunk::function(
        "packages",
        Type::resource("packages"),
        0,
        Vec::new(),
    ));
    let list = code.add_chunk(Chunk::function(
        "list",
        Type::array(Type::resource("package")),
        packages,
        Vec::new(),
    ));
    let func = code.add_function(block);
    let filtered = code.add_chunk(Chunk::function(
        "where",
        Type::array(Type::resource("package")),
        list,
        vec![Primitive::function(func)],
    ));
    code.add_entrypoint(filtered, "packages.where");
    code.finalize();
    code
}

#[test]
fn binary_round_trip() {
    let code = block_code();
    let bytes = code.serialize_binary().unwrap();
    assert_eq!(&bytes[0..4], b"AQLC");
    let back = Code::deserialize_binary(&bytes).unwrap();
    assert_eq!(back, code);
}

#[test]
fn json_round_trip() {
    let code = block_code();
    let json = code.serialize_json().unwrap();
    assert!(json.contains("\"packages.where\""));
    assert!(json.contains("\"[]package\""));
    assert_eq!(Code::deserialize_json(&json).unwrap(), code);
}

#[test]
fn bad_magic_rejected() {
    let mut bytes = block_code().serialize_binary().unwrap();
    bytes[0] = b'X';
    assert!(matches!(
        Code::deserialize_binary(&bytes),
        Err(SerializationError::InvalidContainer(_))
    ));
}

#[test]
fn newer_version_rejected() {
    let mut bytes = block_code().serialize_binary().unwrap();
    bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
    assert_eq!(
        Code::deserialize_binary(&bytes).unwrap_err(),
        SerializationError::UnsupportedVersion { version: 99, max: 1 }
    );
}

#[test]
fn truncated_body_rejected() {
    let bytes = block_code().serialize_binary().unwrap();
    assert!(Code::deserialize_binary(&bytes[..bytes.len() - 3]).is_err());
    assert!(Code::deserialize_binary(&bytes[..6]).is_err());
}
