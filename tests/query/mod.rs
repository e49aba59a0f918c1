// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use std::env;

use anyhow::{bail, Result};
use assetql::unstable::Expr;
use assetql::{compile, execute, BuiltinRegistry, Config};
use serde::Deserialize;
use test_generator::test_resources;

use crate::asset::Asset;

// YAML reads `null` as a missing value, so nil is spelled "#null".
fn process_value(v: &serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::String(s) if s == "#null" => serde_json::Value::Null,
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(process_value).collect())
        }
        serde_json::Value::Object(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), process_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// A query given either as a dotted path or as a full syntax tree.
#[derive(Debug, Deserialize)]
struct Query {
    path: Option<String>,
    expr: Option<Expr>,
    want: Option<serde_json::Value>,
    error: Option<String>,
}

impl Query {
    fn expr(&self) -> Result<Expr> {
        match (&self.path, &self.expr) {
            (Some(path), None) => Ok(Expr::path(path)),
            (None, Some(expr)) => Ok(expr.clone()),
            _ => bail!("a query needs exactly one of `path` or `expr`"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TestCase {
    note: String,
    #[serde(default)]
    asset: Asset,
    queries: Vec<Query>,
    compile_error: Option<String>,
    skip: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn run_case(case: &TestCase) -> Result<()> {
    let runtime = case.asset.runtime(Config::default())?;
    let ast = case
        .queries
        .iter()
        .map(Query::expr)
        .collect::<Result<Vec<_>>>()?;

    let compiled = compile(&ast, runtime.registry(), &BuiltinRegistry::standard());
    let code = match (compiled, &case.compile_error) {
        (Ok(code), None) => code,
        (Err(actual), Some(expected)) => {
            let actual = actual.to_string();
            if !actual.contains(expected.as_str()) {
                bail!("compile error\n`{actual}`\ndoes not contain `{expected}`");
            }
            return Ok(());
        }
        (Ok(_), Some(expected)) => bail!("compilation succeeded, expected error `{expected}`"),
        (Err(actual), None) => return Err(actual.into()),
    };

    let results = execute(&code, &runtime);
    for (query, ep) in case.queries.iter().zip(&code.entrypoints) {
        let result = &results[ep];
        let label = code.labels.get(ep).cloned().unwrap_or_default();
        match (&result.error, &query.error, &query.want) {
            (Some(actual), Some(expected), _) => {
                if !actual.contains(expected.as_str()) {
                    bail!("{label}: error\n`{actual}`\ndoes not contain `{expected}`");
                }
            }
            (None, None, Some(want)) => {
                let want = process_value(want);
                let computed = result.raw_result()?.data.value.to_json();
                if computed != want {
                    bail!(
                        "{label}: mismatch\nleft  = {}\nright = {}",
                        serde_json::to_string_pretty(&computed)?,
                        serde_json::to_string_pretty(&want)?
                    );
                }
            }
            (Some(actual), None, _) => bail!("{label}: unexpected error `{actual}`"),
            (None, Some(expected), _) => bail!("{label}: succeeded, expected error `{expected}`"),
            (None, None, None) => bail!("{label}: either want or error must be specified"),
        }
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    // Through serde_json so that types parse from their labels.
    let value: serde_json::Value = serde_yaml::from_str(&yaml_str)?;
    let test: YamlTest = serde_json::from_value(value)?;

    println!("running {file}");
    for case in &test.cases {
        print!("case {} ", case.note);
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }
        run_case(case)?;
        println!("passed");
    }
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(()) => Ok(()),
        Err(e) => {
            // An Err is not always printed by cargo test.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/query/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
#[ignore = "intended for running a single case file with logging"]
fn one_yaml() -> Result<()> {
    env_logger::init();
    let Some(file) = env::args().find(|a| a.ends_with(".yaml")) else {
        bail!("missing <yaml-file>");
    };
    yaml_test(&file)
}
