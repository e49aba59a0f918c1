// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use std::sync::Arc;

use anyhow::Result;
use assetql::bytecode::{generate_code_listing, RawData};
use assetql::motor::{Capability, Motor, Platform};
use assetql::unstable::{Arg, Call, Expr};
use assetql::{compile, execute, BuiltinRegistry, Code, Config, Runtime};

use crate::asset::Asset;

fn command(cmd: &str) -> Expr {
    Expr::Call(Call {
        receiver: None,
        name: "command".to_string(),
        args: vec![Arg::named("command", Expr::string(cmd))],
    })
}

fn file(path: &str) -> Expr {
    Expr::Call(Call {
        receiver: None,
        name: "file".to_string(),
        args: vec![Arg::named("path", Expr::string(path))],
    })
}

fn eval(runtime: &Runtime, query: &[Expr]) -> Result<Vec<RawData>> {
    let code = compile(query, runtime.registry(), &BuiltinRegistry::standard())?;
    let results = execute(&code, runtime);
    code.entrypoints
        .iter()
        .map(|ep| Ok(results[ep].raw_result()?.data))
        .collect()
}

#[test]
fn packages_length() -> Result<()> {
    let asset = Asset::with_packages(&["openssl", "bash", "zlib"]);
    let runtime = asset.runtime(Config::default())?;
    let values = eval(&runtime, &[Expr::path("packages.length")])?;
    assert_eq!(values, vec![RawData::int(3)]);
    Ok(())
}

#[test]
fn platform_and_commands() -> Result<()> {
    let mut asset = Asset::default();
    asset.platform = Platform {
        name: "ubuntu".to_string(),
        release: "22.04".to_string(),
        family: vec!["debian".to_string(), "linux".to_string()],
        ..Platform::default()
    };
    asset
        .commands
        .insert("hostname".to_string(), "web-01\n".to_string());
    let transport = Arc::new(asset.transport());
    let motor = Motor::new(transport.clone(), asset.platform.clone());
    let runtime = Runtime::new(Arc::new(asset.registry()?), motor, Config::default());

    let values = eval(
        &runtime,
        &[
            Expr::path("platform.name"),
            Expr::path("platform.family").field("length"),
            command("hostname").field("stdout"),
            command("hostname").field("exitcode"),
            command("missing-tool").field("exitcode"),
        ],
    )?;
    assert_eq!(values[0], RawData::string("ubuntu"));
    assert_eq!(values[1], RawData::int(2));
    assert_eq!(values[2], RawData::string("web-01\n"));
    assert_eq!(values[3], RawData::int(0));
    assert_eq!(values[4], RawData::int(127));

    // Each command instance runs once even though two fields were read.
    let mut runs = transport.commands_run();
    runs.sort();
    assert_eq!(runs, vec!["hostname", "missing-tool"]);
    Ok(())
}

#[test]
fn missing_capability_is_reported() -> Result<()> {
    let mut asset = Asset::default();
    asset
        .files
        .insert("/etc/hostname".to_string(), "web-01\n".to_string());
    let transport = asset.transport().without_capability(Capability::File);
    let motor = Motor::new(Arc::new(transport), Platform::default());
    let runtime = Runtime::new(Arc::new(asset.registry()?), motor, Config::default());

    let code = compile(
        &[file("/etc/hostname").field("content")],
        runtime.registry(),
        &BuiltinRegistry::standard(),
    )?;
    let results = execute(&code, &runtime);
    let error = results[&code.entrypoints[0]].error.clone().unwrap_or_default();
    assert!(error.contains("missing capability 'file'"), "{error}");
    Ok(())
}

#[test]
fn code_survives_serialization() -> Result<()> {
    let asset = Asset::with_packages(&["openssl", "bash"]);
    let runtime = asset.runtime(Config::default())?;
    let installed = Expr::ident("installed").call("==", vec![Arg::positional(Expr::bool(true))]);
    let query = vec![
        Expr::ident("packages")
            .call("where", vec![Arg::positional(Expr::Block(vec![installed]))])
            .field("length"),
        Expr::path("packages.length"),
    ];
    let code = compile(&query, runtime.registry(), &BuiltinRegistry::standard())?;

    let binary = Code::deserialize_binary(&code.serialize_binary()?)?;
    let json = Code::deserialize_json(&code.serialize_json()?)?;
    assert_eq!(binary, code);
    assert_eq!(json, code);

    let direct = execute(&code, &runtime);
    let restored = execute(&binary, &runtime);
    assert_eq!(direct, restored);

    let listing = generate_code_listing(&code);
    assert!(listing.contains("packages() -> packages"), "{listing}");
    Ok(())
}

#[test]
fn results_survive_the_wire() -> Result<()> {
    let asset = Asset::with_packages(&["openssl"]);
    let runtime = asset.runtime(Config::default())?;
    let code = compile(
        &[Expr::path("packages.list").call("[]", vec![Arg::positional(Expr::int(0))]).field("name")],
        runtime.registry(),
        &BuiltinRegistry::standard(),
    )?;
    for (_, result) in execute(&code, &runtime) {
        let bytes = result.to_bytes()?;
        let back = assetql::EvalResult::from_bytes(&bytes)?;
        assert_eq!(back, result);
        let json: assetql::EvalResult = serde_json::from_str(&serde_json::to_string(&result)?)?;
        assert_eq!(json, result);
        assert_eq!(back.raw_result()?.data, RawData::string("openssl"));
    }
    Ok(())
}

#[test]
fn many_entrypoints_with_small_pool() -> Result<()> {
    let names: Vec<String> = (0..20).map(|i| format!("pkg{i}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let asset = Asset::with_packages(&refs);
    let runtime = asset.runtime(Config {
        concurrency: 2,
        ..Config::default()
    })?;
    let query: Vec<Expr> = (0..20)
        .map(|i| {
            Expr::path("packages.list")
                .call("[]", vec![Arg::positional(Expr::int(i))])
                .field("name")
        })
        .collect();
    let values = eval(&runtime, &query)?;
    for (i, value) in values.iter().enumerate() {
        assert_eq!(value, &RawData::string(&format!("pkg{i}")));
    }
    Ok(())
}
