// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Query syntax tree consumed by the compiler.
//!
//! Text parsing lives outside this crate; these nodes are built in code or
//! deserialized from fixtures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Literal>),
    Map(BTreeMap<String, Literal>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: Expr,
}

impl Arg {
    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: &str, value: Expr) -> Self {
        Self {
            name: Some(name.to_string()),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Box<Expr>>,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Literal),
    Call(Call),
    /// Body evaluated once per bound element.
    Block(Vec<Expr>),
    /// The element bound inside a block (`_`).
    Element,
}

impl Expr {
    /// A bare root identifier such as `packages`.
    pub fn ident(name: &str) -> Expr {
        Expr::Call(Call {
            receiver: None,
            name: name.to_string(),
            args: Vec::new(),
        })
    }

    /// `self.name(args)`.
    pub fn call(self, name: &str, args: Vec<Arg>) -> Expr {
        Expr::Call(Call {
            receiver: Some(Box::new(self)),
            name: name.to_string(),
            args,
        })
    }

    /// `self.name` without arguments.
    pub fn field(self, name: &str) -> Expr {
        self.call(name, Vec::new())
    }

    /// Dotted path such as `sshd.config.params`.
    pub fn path(path: &str) -> Expr {
        let mut parts = path.split('.');
        let mut expr = Expr::ident(parts.next().unwrap_or_default());
        for part in parts {
            expr = expr.field(part);
        }
        expr
    }

    pub fn string(s: &str) -> Expr {
        Expr::Literal(Literal::String(s.to_string()))
    }

    pub fn int(v: i64) -> Expr {
        Expr::Literal(Literal::Int(v))
    }

    pub fn bool(v: bool) -> Expr {
        Expr::Literal(Literal::Bool(v))
    }

    /// Dotted form of the call chain, used as an entrypoint label.
    pub fn label(&self) -> String {
        match self {
            Expr::Literal(lit) => match lit {
                Literal::Nil => "null".to_string(),
                Literal::Bool(b) => b.to_string(),
                Literal::Int(i) => i.to_string(),
                Literal::Float(f) => f.to_string(),
                Literal::String(s) => format!("{s:?}"),
                Literal::Array(_) => "[]".to_string(),
                Literal::Map(_) => "{}".to_string(),
            },
            Expr::Call(call) => match &call.receiver {
                Some(recv) => format!("{}.{}", recv.label(), call.name),
                None => call.name.clone(),
            },
            Expr::Block(_) => "{}".to_string(),
            Expr::Element => "_".to_string(),
        }
    }
}
