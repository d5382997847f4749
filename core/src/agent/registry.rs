use crate::error::ToolError;
use crate::traits::{
    ParamType, ParamValue, Parameter, Tool, ToolArgs, ToolCategory, ToolDefinition, ToolHandler,
};
use futures_util::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

/// Name-keyed table of tool definitions and their handlers.
///
/// Registration needs `&mut self`; once the registry is wrapped in an `Arc`
/// it is read-only and can be shared by any number of sessions.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), ToolError> {
        if self.index.contains_key(&definition.name) {
            return Err(ToolError::DuplicateTool(definition.name));
        }
        self.index.insert(definition.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            handler,
        });
        Ok(())
    }

    pub fn register_tool<T: Tool + 'static>(&mut self, tool: T) -> Result<(), ToolError> {
        let definition = tool.definition();
        self.register(definition, Arc::new(tool))
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions in registration order.
    pub fn describe(&self) -> Vec<&ToolDefinition> {
        self.tools.iter().map(|t| &t.definition).collect()
    }

    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.tools[i].definition)
    }

    pub fn category(&self, name: &str) -> Option<ToolCategory> {
        self.definition(name).map(|d| d.category)
    }

    /// Validates `raw` against the tool's parameter schema and runs the
    /// handler. The handler is never called when validation fails, and a
    /// panicking handler is reported as [`ToolError::ToolExecution`].
    pub async fn invoke(&self, name: &str, raw: &Map<String, Value>) -> Result<String, ToolError> {
        let tool = self
            .index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = coerce_args(&tool.definition, raw)?;
        debug!(tool = name, args = args.len(), "invoking tool handler");

        match AssertUnwindSafe(tool.handler.call(args)).catch_unwind().await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ToolError::ToolExecution {
                tool: name.to_string(),
                message: format!("{e:#}"),
            }),
            Err(panic) => Err(ToolError::ToolExecution {
                tool: name.to_string(),
                message: format!("handler panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }
}

fn coerce_args(definition: &ToolDefinition, raw: &Map<String, Value>) -> Result<ToolArgs, ToolError> {
    let mut values = Vec::with_capacity(definition.parameters.len());

    for param in &definition.parameters {
        let supplied = raw.get(&param.name).filter(|v| !v.is_null());
        let value = match (supplied, &param.default) {
            (Some(v), _) => Some(coerce(&definition.name, param, v)?),
            (None, _) if param.required => {
                return Err(ToolError::MissingParameter {
                    tool: definition.name.clone(),
                    parameter: param.name.clone(),
                });
            }
            (None, Some(default)) => Some(coerce(&definition.name, param, default)?),
            (None, None) => None,
        };
        values.push((param.name.clone(), value));
    }

    Ok(ToolArgs::new(values))
}

fn coerce(tool: &str, param: &Parameter, value: &Value) -> Result<ParamValue, ToolError> {
    let mismatch = |message: String| ToolError::ParameterType {
        tool: tool.to_string(),
        parameter: param.name.clone(),
        expected: param.kind.as_str(),
        message,
    };

    match param.kind {
        ParamType::String => match value {
            Value::String(s) => Ok(ParamValue::String(s.clone())),
            Value::Number(n) => Ok(ParamValue::String(n.to_string())),
            Value::Bool(b) => Ok(ParamValue::String(b.to_string())),
            other => Err(mismatch(format!("got {}", json_kind(other)))),
        },
        ParamType::Int => {
            let v = integral(value).map_err(&mismatch)?;
            i32::try_from(v)
                .map(ParamValue::Int)
                .map_err(|_| mismatch(format!("{v} is out of range")))
        }
        ParamType::Long => integral(value).map(ParamValue::Long).map_err(mismatch),
        ParamType::Double => {
            let v = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
                _ => None,
            };
            v.map(ParamValue::Double)
                .ok_or_else(|| mismatch(format!("cannot read {value} as a number")))
        }
        ParamType::Bool => match value {
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(ParamValue::Bool(true)),
                "false" | "no" | "0" => Ok(ParamValue::Bool(false)),
                _ => Err(mismatch(format!("cannot read \"{s}\" as a boolean"))),
            },
            other => Err(mismatch(format!("got {}", json_kind(other)))),
        },
    }
}

fn integral(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                return Ok(v);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(format!("{n} is not an integer in range")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("cannot read \"{s}\" as an integer")),
        other => Err(format!("got {}", json_kind(other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
