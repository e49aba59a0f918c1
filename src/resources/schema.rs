// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// Declared field of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Filled from the map key when omitted in JSON.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub typ: Type,
    /// Must be supplied as a constructor argument.
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub is_private: bool,
    /// Links a parent resource to the child resource of the same name.
    #[serde(default)]
    pub is_implicit_resource: bool,
    #[serde(default)]
    pub refs: Vec<String>,
}

impl Field {
    pub fn new(name: &str, typ: Type) -> Self {
        Self {
            name: name.to_string(),
            typ,
            is_mandatory: false,
            is_private: false,
            is_implicit_resource: false,
            refs: Vec::new(),
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Field>,
    #[serde(default)]
    pub private: bool,
    /// Element type when the resource is a list (exposed via its `list` field).
    #[serde(default)]
    pub list_type: Option<Type>,
    /// Whether the resource's factory rewrites constructor arguments.
    #[serde(default)]
    pub init: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ResourceInfo {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// A list resource: adds the `list` field of type `[]elem`.
    pub fn with_list_type(mut self, elem: Type) -> Self {
        self.fields
            .insert("list".to_string(), Field::new("list", Type::array(elem.clone())));
        self.list_type = Some(elem);
        self
    }
}

/// Serialized set of resource declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub resources: BTreeMap<String, ResourceInfo>,
}
