// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bytecode execution against a resource [`Runtime`].
//!
//! Entrypoints are independent and fan out over a [`JobPool`] sized by
//! [`Config::concurrency`](crate::config::Config). Chunks are resolved on
//! demand, receivers first, and memoized per execution so shared receivers
//! are evaluated once. A failure only affects the entrypoints that depend on
//! the failing chunk.

mod error;
mod functions;

pub use error::{ExecutionError, Result};

use std::collections::BTreeMap;

use dashmap::DashMap;

use crate::bytecode::{
    Chunk, ChunkCall, Code, EvalResult, Primitive, RawData, RawValue, ResourceRef,
};
use crate::jobpool::{Job, JobPool};
use crate::resources::{Args, Runtime};
use crate::types::Type;

/// Values for the property chunks of a code, keyed by property name.
pub type Props = BTreeMap<String, RawData>;

/// Execute every entrypoint of `code`. The returned map holds one result per
/// entrypoint, keyed by chunk reference.
pub fn execute(code: &Code, runtime: &Runtime) -> BTreeMap<i32, EvalResult> {
    execute_with_props(code, runtime, &Props::new())
}

/// Execute with caller-supplied values for the code's property chunks.
pub fn execute_with_props(
    code: &Code,
    runtime: &Runtime,
    props: &Props,
) -> BTreeMap<i32, EvalResult> {
    let executor = &Executor::new(runtime);
    let frame = &Frame::new(code, props.clone());

    let jobs = code
        .entrypoints
        .iter()
        .map(|&ep| Job::new(move || Ok(executor.entrypoint(frame, ep))))
        .collect();
    let mut pool = JobPool::new(jobs, runtime.config().concurrency);
    pool.run();

    code.entrypoints
        .iter()
        .zip(pool.into_results())
        .map(|(&ep, outcome)| {
            let result = outcome.unwrap_or_else(|err| {
                EvalResult::failed(code.checksum(ep).unwrap_or_default(), err)
            });
            (ep, result)
        })
        .collect()
}

/// One code being executed, with its bound properties and chunk memo.
pub(crate) struct Frame<'c> {
    code: &'c Code,
    props: Props,
    memo: DashMap<i32, RawData>,
}

impl<'c> Frame<'c> {
    fn new(code: &'c Code, props: Props) -> Self {
        Self {
            code,
            props,
            memo: DashMap::new(),
        }
    }
}

pub(crate) struct Executor<'r> {
    runtime: &'r Runtime,
    max_depth: usize,
}

impl<'r> Executor<'r> {
    fn new(runtime: &'r Runtime) -> Self {
        Self {
            runtime,
            max_depth: runtime.config().max_depth,
        }
    }

    fn entrypoint(&self, frame: &Frame<'_>, ep: i32) -> EvalResult {
        let code_id = frame.code.checksum(ep).unwrap_or_default();
        let data = match self.resolve(frame, ep, 0) {
            Ok(data) => data,
            Err(err) => {
                log::debug!("entrypoint <{ep}> failed: {err}");
                return EvalResult::failed(code_id, err.to_string());
            }
        };
        match data.result() {
            Ok(mut result) => {
                result.code_id = code_id.to_string();
                result
            }
            Err(err) => EvalResult::failed(code_id, err.to_string()),
        }
    }

    /// Value of chunk `chunk_ref` in `frame`.
    fn resolve(&self, frame: &Frame<'_>, chunk_ref: i32, depth: usize) -> Result<RawData> {
        if depth > self.max_depth {
            return Err(ExecutionError::DepthExceeded {
                max: self.max_depth,
            });
        }
        if let Some(data) = frame.memo.get(&chunk_ref) {
            return Ok(data.value().clone());
        }
        let chunk = frame
            .code
            .chunk(chunk_ref)
            .ok_or(ExecutionError::InvalidReference { chunk_ref })?;

        let data = match chunk.call {
            ChunkCall::Primitive => match &chunk.primitive {
                Some(p) if p.typ == Type::Ref && p.as_reference().ok() == Some(chunk_ref) => {
                    return Err(ExecutionError::InvalidReference { chunk_ref });
                }
                Some(p) => self.operand(frame, p, depth + 1)?,
                None => RawData::nil(),
            },
            ChunkCall::Property => frame.props.get(&chunk.id).cloned().ok_or_else(|| {
                ExecutionError::MissingProperty {
                    name: chunk.id.clone(),
                }
            })?,
            ChunkCall::Function => self.call(frame, chunk, depth)?,
        };
        frame.memo.insert(chunk_ref, data.clone());
        Ok(data)
    }

    /// Value of an argument primitive, following chunk references.
    fn operand(&self, frame: &Frame<'_>, p: &Primitive, depth: usize) -> Result<RawData> {
        match p.typ {
            Type::Ref => self.resolve(frame, p.as_reference()?, depth + 1),
            _ => Ok(RawData::from_primitive(p)?),
        }
    }

    fn call(&self, frame: &Frame<'_>, chunk: &Chunk, depth: usize) -> Result<RawData> {
        let typ = chunk
            .function
            .as_ref()
            .map_or(Type::Any, |f| f.typ.clone());
        let binding = chunk.binding();
        if binding == 0 {
            return self.construct(frame, chunk, depth);
        }

        let receiver = self.resolve(frame, binding, depth + 1)?;
        if let Some(err) = &receiver.error {
            return Ok(RawData::error(typ, err.clone()));
        }

        // Declared fields win over builtins of the same name.
        if let Some(name) = receiver.typ.resource_name() {
            if self.runtime.registry().field(name, &chunk.id).is_some() {
                let RawValue::Resource(r) = &receiver.value else {
                    return Ok(RawData::new(RawValue::Nil, typ));
                };
                return self.field(r, &chunk.id);
            }
        }

        functions::call(self, frame, chunk, &typ, receiver, depth)
    }

    // Root resource call: arguments alternate name and value.
    fn construct(&self, frame: &Frame<'_>, chunk: &Chunk, depth: usize) -> Result<RawData> {
        let mut args = Args::new();
        for pair in chunk.args().chunks(2) {
            let [name, value] = pair else {
                return Err(ExecutionError::InvalidArgument {
                    function: chunk.id.clone(),
                    reason: "resource arguments must come in name/value pairs".to_string(),
                });
            };
            let name = name.as_str()?.to_string();
            let value = self.operand(frame, value, depth)?;
            args.insert(name, value);
        }
        let instance = self.runtime.create_resource(&chunk.id, args)?;
        Ok(RawData::resource(ResourceRef::from_instance(instance)))
    }

    fn field(&self, r: &ResourceRef, field: &str) -> Result<RawData> {
        let instance = match &r.instance {
            Some(instance) => instance.clone(),
            None => self.runtime.instance(&r.name, &r.id).ok_or_else(|| {
                ExecutionError::InvalidArgument {
                    function: field.to_string(),
                    reason: format!("resource {} id = {} is not loaded", r.name, r.id),
                }
            })?,
        };
        Ok(self.runtime.get_field(&instance, field)?)
    }

    /// Run the block function `function_ref` with `_` bound to `element` and
    /// return its entrypoint values in order, with their labels.
    fn run_block(
        &self,
        frame: &Frame<'_>,
        function_ref: i32,
        element: RawData,
        depth: usize,
    ) -> Result<Vec<(String, RawData)>> {
        let code = frame
            .code
            .function(function_ref)
            .ok_or(ExecutionError::InvalidFunction { function_ref })?;
        let mut props = Props::new();
        props.insert("_".to_string(), element);
        let block = Frame::new(code, props);

        let mut out = Vec::with_capacity(code.entrypoints.len());
        for &ep in &code.entrypoints {
            let data = self.resolve(&block, ep, depth + 1)?;
            let label = code.labels.get(&ep).cloned().unwrap_or_default();
            out.push((label, data));
        }
        Ok(out)
    }
}
