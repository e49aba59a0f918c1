// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::unwrap_used, clippy::panic)] // registry tests unwrap/panic to assert outcomes

use crate::resources::*;
use crate::types::Type;

fn sshd_config(private: bool) -> ResourceInfo {
    let mut info = ResourceInfo::new("sshd.config")
        .with_field(Field::new("file", Type::resource("file")))
        .with_field(Field::new("params", Type::map(Type::String, Type::String)));
    info.private = private;
    info
}

#[test]
fn dotted_names_create_parents() {
    let mut registry = Registry::new();
    registry.add_resource_info(sshd_config(false)).unwrap();

    let parent = registry.resource("sshd").unwrap();
    assert!(!parent.info.private);
    let field = parent.field("config").unwrap();
    assert!(field.is_implicit_resource);
    assert!(!field.is_private);
    assert_eq!(field.typ, Type::resource("sshd.config"));
    assert_eq!(registry.names(), vec!["sshd", "sshd.config"]);
}

#[test]
fn public_child_overrides_private_parent() {
    let mut registry = Registry::new();
    registry
        .add_resource_info(ResourceInfo {
            private: true,
            ..ResourceInfo::new("sshd.secret")
        })
        .unwrap();
    assert!(registry.resource("sshd").unwrap().info.private);
    assert!(registry.field("sshd", "secret").unwrap().is_private);

    registry.add_resource_info(sshd_config(false)).unwrap();
    assert!(!registry.resource("sshd").unwrap().info.private);
    assert!(registry.field("sshd", "secret").unwrap().is_private);
    assert!(!registry.field("sshd", "config").unwrap().is_private);
    assert_eq!(registry.public_names(), vec!["sshd", "sshd.config"]);
}

#[test]
fn public_child_overrides_declared_private_parent() {
    let mut registry = Registry::new();
    registry
        .add_resource_info(ResourceInfo {
            private: true,
            ..ResourceInfo::new("sshd")
        })
        .unwrap();
    assert!(registry.public_names().is_empty());

    registry.add_resource_info(sshd_config(false)).unwrap();
    let parent = registry.resource("sshd").unwrap();
    assert!(!parent.info.private);
    let field = parent.field("config").unwrap();
    assert!(field.is_implicit_resource);
    assert!(!field.is_private);
    assert_eq!(registry.public_names(), vec!["sshd", "sshd.config"]);
}

#[test]
fn oversized_names_rejected() {
    let mut registry = Registry::new();
    let name = "x".repeat(crate::types::MAX_RESOURCE_NAME_LEN + 1);
    assert_eq!(
        registry
            .add_resource_info(ResourceInfo::new(&name))
            .unwrap_err(),
        ResourceError::NameTooLong {
            len: name.len(),
            max: crate::types::MAX_RESOURCE_NAME_LEN
        }
    );
    assert!(registry.names().is_empty());
}

#[test]
fn deep_chains_link_every_level() {
    let mut registry = Registry::new();
    registry
        .add_resource_info(ResourceInfo::new("aws.ec2.instance"))
        .unwrap();
    assert_eq!(
        registry.field("aws", "ec2").unwrap().typ,
        Type::resource("aws.ec2")
    );
    assert_eq!(
        registry.field("aws.ec2", "instance").unwrap().typ,
        Type::resource("aws.ec2.instance")
    );
}

#[test]
fn duplicates_rejected() {
    let mut registry = Registry::new();
    registry.add_resource_info(sshd_config(false)).unwrap();
    let err = registry.add_resource_info(sshd_config(false)).unwrap_err();
    assert_eq!(
        err,
        ResourceError::DuplicateResource {
            name: "sshd.config".to_string()
        }
    );
}

#[test]
fn factories_need_declared_resources() {
    let mut registry = Registry::new();
    let factory = resource_factory(|_, _| Ok(None));
    assert_eq!(
        registry.add_factory("", factory.clone()).unwrap_err(),
        ResourceError::InvalidName {
            name: String::new()
        }
    );
    assert_eq!(
        registry.add_factory("nope", factory.clone()).unwrap_err(),
        ResourceError::UnknownResource {
            name: "nope".to_string()
        }
    );
    registry.add_resource_info(ResourceInfo::new("nope")).unwrap();
    registry.add_factory("nope", factory).unwrap();
    assert!(registry.resource("nope").unwrap().factory.is_some());
}

#[test]
fn load_json_adds_parents_first() {
    let json = r#"{
        "resources": {
            "sshd.config": { "fields": { "params": { "type": "map[string]string" } } },
            "sshd": { "fields": { "version": { "type": "string" } } },
            "packages": { "listType": "package", "fields": {} },
            "package": { "fields": { "name": { "type": "string", "isMandatory": true } } }
        }
    }"#;
    let mut registry = Registry::new();
    registry.load_json(json).unwrap();

    let fields = registry.fields("sshd").unwrap();
    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["config", "version"]);
    assert_eq!(fields["version"].name, "version");
    assert_eq!(
        registry.field("packages", "list").unwrap().typ,
        Type::array(Type::resource("package"))
    );
    assert!(registry.field("package", "name").unwrap().is_mandatory);
}

#[test]
fn invalid_json_reported() {
    let mut registry = Registry::new();
    assert!(matches!(
        registry.load_json("{ nope"),
        Err(ResourceError::InvalidSchema(_))
    ));
}

#[test]
fn clone_and_add_merge_registries() {
    let mut base = Registry::new();
    base.add_resource_info(ResourceInfo::new("file")).unwrap();
    let mut copy = base.clone();
    copy.add_resource_info(sshd_config(false)).unwrap();
    assert_eq!(base.len(), 1);
    assert_eq!(copy.len(), 3);

    base.add(&copy);
    assert_eq!(base.names(), copy.names());
    assert_eq!(base.schema(), copy.schema());
}
