// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt::{self, Write as _};

use super::chunk::ChunkCall;
use super::code::Code;
use super::primitive::Primitive;
use crate::types::Type;

// Writing into a String via fmt never fails, so we intentionally ignore writeln! results.
fn push_line(buf: &mut String, args: fmt::Arguments) {
    let _ = buf.write_fmt(args);
    let _ = buf.write_char('\n');
}

/// Human-readable dump of compiled code, nested functions included.
pub fn generate_code_listing(code: &Code) -> String {
    let mut output = String::new();
    write_code(&mut output, code, 0);
    output
}

fn write_code(out: &mut String, code: &Code, depth: usize) {
    let indent = "  ".repeat(depth);
    push_line(
        out,
        format_args!(
            "{indent}; code {} - {} chunks, {} entrypoints, {} parameters",
            if code.id.is_empty() { "<unfinalized>" } else { code.id.as_str() },
            code.chunks.len(),
            code.entrypoints.len(),
            code.parameters
        ),
    );

    for (idx, chunk) in code.chunks.iter().enumerate() {
        let chunk_ref = idx + 1;
        let mut line = format!("{indent}{chunk_ref:>4}: ");
        match chunk.call {
            ChunkCall::Primitive => {
                let _ = write!(line, "{}", describe(chunk.primitive.as_ref()));
            }
            ChunkCall::Property => {
                let typ = chunk
                    .primitive
                    .as_ref()
                    .map_or_else(|| Type::Any.label(), |p| p.typ.label());
                let _ = write!(line, "property {} <{typ}>", chunk.id);
            }
            ChunkCall::Function => {
                if let Some(function) = &chunk.function {
                    if function.binding > 0 {
                        let _ = write!(line, "<{}>.", function.binding);
                    }
                    let args: Vec<String> =
                        function.args.iter().map(|a| describe(Some(a))).collect();
                    let _ = write!(
                        line,
                        "{}({}) -> {}",
                        chunk.id,
                        args.join(", "),
                        function.typ.label()
                    );
                }
            }
        }
        if let Some(label) = i32::try_from(chunk_ref)
            .ok()
            .and_then(|r| code.labels.get(&r))
        {
            let _ = write!(line, "    ; {label}");
        }
        push_line(out, format_args!("{line}"));
    }

    if !code.entrypoints.is_empty() {
        let eps: Vec<String> = code.entrypoints.iter().map(|e| format!("<{e}>")).collect();
        push_line(out, format_args!("{indent}; entrypoints: {}", eps.join(" ")));
    }

    for (idx, function) in code.functions.iter().enumerate() {
        push_line(out, format_args!("{indent}; function {}", idx + 1));
        write_code(out, function, depth + 1);
    }
}

fn describe(primitive: Option<&Primitive>) -> String {
    let Some(p) = primitive else {
        return "null".to_string();
    };
    match &p.typ {
        Type::Ref => p
            .as_reference()
            .map_or_else(|_| "<?>".to_string(), |r| format!("<{r}>")),
        Type::FunctionLike => p
            .as_reference()
            .map_or_else(|_| "fn?".to_string(), |r| format!("fn{r}")),
        Type::String => p
            .as_str()
            .map_or_else(|_| "\"?\"".to_string(), |s| format!("{s:?}")),
        Type::Int | Type::Score => p
            .as_int()
            .map_or_else(|_| "?".to_string(), |i| i.to_string()),
        Type::Float => p
            .as_float()
            .map_or_else(|_| "?".to_string(), |f| f.to_string()),
        Type::Bool => p
            .as_bool()
            .map_or_else(|_| "?".to_string(), |b| b.to_string()),
        Type::Nil => "null".to_string(),
        Type::Array(_) => {
            let items: Vec<String> = p.array.iter().map(|i| describe(Some(i))).collect();
            format!("[{}]", items.join(", "))
        }
        Type::Map(_, _) => {
            let items: Vec<String> = p
                .map
                .iter()
                .map(|(k, v)| format!("{k}: {}", describe(Some(v))))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
        other => other.label(),
    }
}
