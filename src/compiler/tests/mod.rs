// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::unwrap_used, clippy::panic)]

use crate::ast::{Arg, Expr};
use crate::builtins::{bool_type, BuiltinRegistry, CompileHandler};
use crate::bytecode::{chunk_type, ChunkCall, Code};
use crate::compiler::{compile, CompilerError};
use crate::resources::{Field, Registry, ResourceInfo};
use crate::types::{FunctionSignature, Type};

fn schema() -> Registry {
    let mut registry = Registry::new();
    registry
        .add_resource_info(ResourceInfo::new("packages").with_list_type(Type::resource("package")))
        .unwrap();
    registry
        .add_resource_info(
            ResourceInfo::new("package")
                .with_field(Field::new("name", Type::String).mandatory())
                .with_field(Field::new("version", Type::String))
                .with_field(Field::new("installed", Type::Bool)),
        )
        .unwrap();
    registry
        .add_resource_info(
            ResourceInfo::new("sshd.config")
                .with_field(Field::new("params", Type::map(Type::String, Type::String))),
        )
        .unwrap();
    let mut secret = ResourceInfo::new("secret").with_field(Field::new("value", Type::String));
    secret.private = true;
    registry.add_resource_info(secret).unwrap();
    registry
}

fn compile_one(expr: Expr) -> Result<Code, CompilerError> {
    compile(&[expr], &schema(), &BuiltinRegistry::standard())
}

fn entry_type(code: &Code) -> Type {
    chunk_type(code, code.entrypoints[0])
}

#[test]
fn resource_length_goes_through_list() {
    let code = compile_one(Expr::path("packages.length")).unwrap();
    let ids: Vec<&str> = code.chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["packages", "list", "length"]);
    assert_eq!(code.chunks[1].binding(), 1);
    assert_eq!(code.chunks[2].binding(), 2);
    assert_eq!(entry_type(&code), Type::Int);
    assert_eq!(code.labels.get(&3).map(String::as_str), Some("packages.length"));
}

#[test]
fn implicit_parent_fields() {
    let code = compile_one(Expr::path("sshd.config.params").field("length")).unwrap();
    let ids: Vec<&str> = code.chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["sshd", "config", "params", "length"]);
    assert_eq!(chunk_type(&code, 2), Type::resource("sshd.config"));
    assert_eq!(chunk_type(&code, 3), Type::map(Type::String, Type::String));
}

#[test]
fn missing_argument() {
    let builtins = BuiltinRegistry::standard().with_handler(
        &Type::String,
        "hasPrefix",
        CompileHandler::simple(FunctionSignature::new(1, vec![Type::String]), bool_type),
    );
    let expr = Expr::string("abc").call("hasPrefix", vec![]);
    let err = compile(&[expr], &schema(), &builtins).unwrap_err();
    assert_eq!(
        err,
        CompilerError::MissingArgument {
            function: "hasPrefix".to_string(),
            position: 1,
            expected: "string".to_string(),
        }
    );

    let expr = Expr::string("abc").call("hasPrefix", vec![Arg::positional(Expr::int(1))]);
    let err = compile(&[expr], &schema(), &builtins).unwrap_err();
    let CompilerError::TypeMismatch {
        expected, actual, ..
    } = &err
    else {
        panic!("unexpected error {err}");
    };
    assert_eq!(expected, "string");
    assert_eq!(actual, "int");
    let message = err.to_string();
    assert!(message.contains("string") && message.contains("int"));
}

#[test]
fn too_many_arguments() {
    let expr = Expr::string("abc").call("upcase", vec![Arg::positional(Expr::int(1))]);
    assert!(matches!(
        compile_one(expr),
        Err(CompilerError::TooManyArguments { max: 0, actual: 1, .. })
    ));
}

#[test]
fn unknown_function_lists_available() {
    let err = compile_one(Expr::int(3).call("upcase", vec![])).unwrap_err();
    let CompilerError::UnknownFunction { name, typ, available } = err else {
        panic!("unexpected error");
    };
    assert_eq!(name, "upcase");
    assert_eq!(typ, "int");
    assert_eq!(available, vec!["!=", "<", "<=", "==", ">", ">="]);
}

#[test]
fn unknown_resource_and_private_resource() {
    let err = compile_one(Expr::ident("nope")).unwrap_err();
    let CompilerError::UnknownResource { available, .. } = err else {
        panic!("unexpected error");
    };
    assert_eq!(available, vec!["package", "packages", "sshd", "sshd.config"]);

    assert!(matches!(
        compile_one(Expr::path("secret.value")),
        Err(CompilerError::UnknownResource { .. })
    ));
}

#[test]
fn resource_fields_and_builtins_are_available() {
    let err = compile_one(Expr::path("packages.bogus")).unwrap_err();
    let CompilerError::UnknownFunction { available, .. } = err else {
        panic!("unexpected error");
    };
    assert_eq!(available, vec!["length", "list", "where"]);
}

#[test]
fn list_builtins_only_offered_on_list_resources() {
    let err = compile_one(Expr::path("sshd.config.bogus")).unwrap_err();
    let CompilerError::UnknownFunction { available, .. } = err else {
        panic!("unexpected error");
    };
    assert_eq!(available, vec!["params"]);

    let err = compile_one(Expr::path("sshd.bogus")).unwrap_err();
    let CompilerError::UnknownFunction { available, .. } = err else {
        panic!("unexpected error");
    };
    assert_eq!(available, vec!["config"]);

    assert!(matches!(
        compile_one(Expr::path("sshd.config.length")),
        Err(CompilerError::NotListResource { .. })
    ));
}

#[test]
fn constructor_arguments() {
    let expr = Expr::Call(crate::ast::Call {
        receiver: None,
        name: "package".to_string(),
        args: vec![Arg::named("name", Expr::string("openssl"))],
    })
    .field("version");
    let code = compile_one(expr).unwrap();
    let args = code.chunks[0].args();
    assert_eq!(args.len(), 2);
    assert_eq!(args[0].as_str().unwrap(), "name");
    assert_eq!(args[1].as_str().unwrap(), "openssl");
    assert_eq!(entry_type(&code), Type::String);

    let unnamed = Expr::Call(crate::ast::Call {
        receiver: None,
        name: "package".to_string(),
        args: vec![Arg::positional(Expr::string("openssl"))],
    });
    assert!(matches!(
        compile_one(unnamed),
        Err(CompilerError::UnnamedResourceArgument { .. })
    ));

    let mistyped = Expr::Call(crate::ast::Call {
        receiver: None,
        name: "package".to_string(),
        args: vec![Arg::named("name", Expr::int(1))],
    });
    assert!(matches!(
        compile_one(mistyped),
        Err(CompilerError::TypeMismatch { .. })
    ));
}

#[test]
fn where_block_binds_list_element() {
    let filter = Expr::ident("installed").call("==", vec![Arg::positional(Expr::bool(true))]);
    let expr = Expr::ident("packages").call("where", vec![Arg::positional(Expr::Block(vec![filter]))]);
    let code = compile_one(expr).unwrap();

    assert_eq!(entry_type(&code), Type::array(Type::resource("package")));
    let where_chunk = code.chunk(code.entrypoints[0]).unwrap();
    assert_eq!(where_chunk.id, "where");
    assert_eq!(where_chunk.args()[0].typ, Type::FunctionLike);

    let block = code.function(1).unwrap();
    assert_eq!(block.parameters, 1);
    assert_eq!(block.chunks[0].call, ChunkCall::Property);
    assert_eq!(block.chunks[0].id, "_");
    assert_eq!(block.chunks[1].id, "installed");
    assert_eq!(block.chunks[1].binding(), 1);
    assert_eq!(chunk_type(block, block.entrypoints[0]), Type::Bool);
}

#[test]
fn element_outside_block() {
    assert!(matches!(
        compile_one(Expr::Element.field("length")),
        Err(CompilerError::ElementOutsideBlock)
    ));
}

#[test]
fn string_contains_variants() {
    let single = compile_one(
        Expr::string("hello").call("contains", vec![Arg::positional(Expr::string("ell"))]),
    )
    .unwrap();
    assert_eq!(single.chunk(single.entrypoints[0]).unwrap().id, "containsString");

    let list = Expr::Literal(crate::ast::Literal::Array(vec![
        crate::ast::Literal::String("a".into()),
        crate::ast::Literal::String("b".into()),
    ]));
    let many = compile_one(Expr::string("hello").call("contains", vec![Arg::positional(list)]))
        .unwrap();
    assert_eq!(many.chunk(many.entrypoints[0]).unwrap().id, "containsArrayString");

    let err = compile_one(Expr::string("hello").call("contains", vec![Arg::positional(Expr::int(1))]))
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot find #string.contains with this type int");
}

#[test]
fn checksums_stable_across_compiles() {
    let query = || vec![Expr::path("packages.length"), Expr::path("sshd.config.params")];
    let builtins = BuiltinRegistry::standard();
    let a = compile(&query(), &schema(), &builtins).unwrap();
    let b = compile(&query(), &schema(), &builtins).unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.checksums, b.checksums);

    let c = compile(&[Expr::path("packages.length")], &schema(), &builtins).unwrap();
    assert_eq!(a.checksum(3), c.checksum(3));
    assert_ne!(a.id, c.id);
}
