//! Tool contract, registry and the built-in tool plugins.
//!
//! Every tool declares its name, a description shown to the model and an
//! ordered parameter list. The function-calling schema handed to the model is
//! derived from that list by [`call_schema`]; tools cannot override it.

mod calculator;
mod datetime;
mod file;
pub mod plugin;
mod registry;
mod stock;
mod weather;
mod web;

pub use calculator::Calculator;
pub use datetime::DateTimeTool;
pub use file::FileOperations;
pub use plugin::{
    builtin_catalog, Catalog, CatalogSource, ManifestSource, PluginSource, PluginUnit,
    StaticSource,
};
pub use registry::{
    parse_arguments, DiscoveryReport, InvocationResult, RegistryStats, ToolRegistry,
};
pub use stock::StockQuote;
pub use weather::Weather;
pub use web::{News, WebSearch};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Arguments passed to a tool: parameter name to JSON value.
pub type Arguments = Map<String, Value>;

/// Errors produced while registering or dispatching tools.
///
/// None of these end a conversation turn: dispatch errors are rendered into
/// the tool-result content so the model can react to them.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool: {0}")]
    InvalidTool(String),

    #[error("Tool '{name}' not found. Available tools: {}", .available.join(", "))]
    NotFound { name: String, available: Vec<String> },

    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Primitive type of a tool parameter, as shown to the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }
}

/// One named input of a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolParameter {
    name: String,
    #[serde(rename = "type")]
    param_type: ParamType,
    description: String,
    required: bool,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    choices: Option<Vec<String>>,
}

impl ToolParameter {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            choices: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    /// Restrict the parameter to a closed set of string values.
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn choices(&self) -> Option<&[String]> {
        self.choices.as_deref()
    }
}

/// A capability the model can invoke.
///
/// Implementations should treat optional parameters as optional and apply
/// their own defaults. When a required argument is present but semantically
/// wrong (bad expression, unknown action) return an explanatory `Ok` string
/// so the model can correct itself; reserve `Err` for internal failures.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique, non-empty identifier used as the function name.
    fn name(&self) -> &str;

    /// Summary shown to the model to help it pick the tool.
    fn description(&self) -> &str;

    /// Ordered call signature.
    fn parameters(&self) -> Vec<ToolParameter>;

    /// Run the tool.
    async fn execute(&self, args: &Arguments) -> anyhow::Result<String>;
}

/// Function-calling parameter schema derived from a tool's parameter list.
pub fn call_schema(tool: &dyn Tool) -> Value {
    parameters_schema(&tool.parameters())
}

fn parameters_schema(parameters: &[ToolParameter]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in parameters {
        let mut property = Map::new();
        property.insert("type".into(), json!(param.param_type.as_str()));
        property.insert("description".into(), json!(param.description));
        if let Some(choices) = &param.choices {
            property.insert("enum".into(), json!(choices));
        }
        properties.insert(param.name.clone(), Value::Object(property));
        if param.required {
            required.push(json!(param.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Full model-facing entry: `{type: "function", function: {...}}`.
pub fn model_tool_schema(tool: &dyn Tool) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name(),
            "description": tool.description(),
            "parameters": call_schema(tool),
        }
    })
}

/// Descriptive snapshot of a registered tool.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolInfo {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        }
    }

    pub fn required_count(&self) -> usize {
        self.parameters.iter().filter(|p| p.is_required()).count()
    }
}

/// Read an optional string argument, accepting numbers for leniency.
pub(crate) fn str_arg(args: &Arguments, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a count argument (string or number), clamped to `1..=max`.
pub(crate) fn count_arg(args: &Arguments, key: &str, default: usize, max: usize) -> usize {
    str_arg(args, key)
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(|n| n.clamp(1, max as i64) as usize)
        .unwrap_or(default)
}
