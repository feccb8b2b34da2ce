//! Tool registry: registration, discovery, schema export and dispatch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::plugin::{PluginSource, UnitKind};
use super::{model_tool_schema, Arguments, Tool, ToolError, ToolInfo};

/// Outcome of a single tool dispatch.
#[derive(Debug)]
pub struct InvocationResult {
    pub tool: String,
    pub arguments: Arguments,
    pub outcome: Result<String, ToolError>,
}

impl InvocationResult {
    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// Text reported to the model as the tool result.
    pub fn content(&self) -> String {
        match &self.outcome {
            Ok(output) => output.clone(),
            Err(e) => format!("Error: {}", e),
        }
    }
}

/// Summary of one discovery pass.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub location: String,
    pub tools_found: usize,
    pub errors: Vec<String>,
    pub skipped: Vec<String>,
}

/// Read-only diagnostics snapshot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistryStats {
    pub tool_count: usize,
    pub names: Vec<String>,
    pub registrations: usize,
    pub error_count: usize,
    pub error_messages: Vec<String>,
}

/// Set of tools available to the model, keyed by name.
///
/// Names iterate in first-insertion order. Re-registering a name replaces the
/// tool in place and keeps its original position.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    errors: Vec<String>,
    registrations: usize,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Failures are recorded, never returned.
    ///
    /// Returns `true` when the tool was stored.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.name().to_string();
        let problem = if name.trim().is_empty() {
            Some("tool must have a non-empty name".to_string())
        } else if name.trim() != name {
            Some(format!(
                "tool name '{}' has leading or trailing whitespace",
                name
            ))
        } else {
            None
        };
        if let Some(problem) = problem {
            let err = ToolError::InvalidTool(problem);
            let msg = format!("Failed to register tool: {}", err);
            tracing::error!("{}", msg);
            self.errors.push(msg);
            return false;
        }

        match self.index.get(&name) {
            Some(&slot) => {
                tracing::warn!("Tool '{}' already registered, overwriting", name);
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name.clone(), self.tools.len());
                self.tools.push(tool);
            }
        }

        self.registrations += 1;
        tracing::info!("Registered tool: {}", name);
        true
    }

    /// Register every tool found in `source`.
    ///
    /// A unit that fails to load is recorded as one error and the scan moves
    /// on to the next unit.
    pub fn discover(&mut self, source: &dyn PluginSource) -> DiscoveryReport {
        let mut report = DiscoveryReport {
            location: source.location(),
            ..DiscoveryReport::default()
        };

        let units = match source.scan() {
            Ok(units) => units,
            Err(e) => {
                let msg = format!("Error scanning {}: {:#}", report.location, e);
                tracing::error!("{}", msg);
                self.errors.push(msg.clone());
                report.errors.push(msg);
                return report;
            }
        };

        for unit in units {
            match unit.kind {
                UnitKind::Empty => {
                    tracing::warn!("Skipping empty plugin unit: {}", unit.id);
                    report.skipped.push(unit.id);
                }
                UnitKind::Loadable(load) => match load() {
                    Ok(tools) => {
                        for tool in tools {
                            if self.register(tool) {
                                report.tools_found += 1;
                            } else if let Some(msg) = self.errors.last() {
                                report.errors.push(format!("{} (from {})", msg, unit.id));
                            }
                        }
                    }
                    Err(e) => {
                        let msg = format!("Error loading module {}: {:#}", unit.id, e);
                        tracing::error!("{}", msg);
                        self.errors.push(msg.clone());
                        report.errors.push(msg);
                    }
                },
            }
        }

        if report.tools_found == 0 {
            tracing::info!("No tools discovered in {}", report.location);
        } else {
            tracing::info!(
                "Discovered {} tool(s) in {}",
                report.tools_found,
                report.location
            );
        }
        if !report.errors.is_empty() {
            tracing::warn!("{} error(s) during tool discovery", report.errors.len());
        }

        report
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&slot| Arc::clone(&self.tools[slot]))
            .ok_or_else(|| ToolError::NotFound {
                name: name.to_string(),
                available: self.list(),
            })
    }

    /// Registered names in insertion order.
    pub fn list(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn tool_info(&self, name: &str) -> Result<ToolInfo, ToolError> {
        self.get(name).map(|tool| ToolInfo::from_tool(tool.as_ref()))
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|tool| ToolInfo::from_tool(tool.as_ref()))
            .collect()
    }

    /// Function-calling schemas for every tool whose declaration is usable.
    pub fn model_tool_schemas(&self) -> Vec<Value> {
        self.tools
            .iter()
            .filter_map(|tool| match checked_schema(tool.as_ref()) {
                Ok(schema) => Some(schema),
                Err(e) => {
                    tracing::error!(
                        "Error converting tool {} to a model schema: {}",
                        tool.name(),
                        e
                    );
                    None
                }
            })
            .collect()
    }

    /// Validate arguments and run the named tool.
    ///
    /// Never fails: lookup, validation and execution errors all land in
    /// [`InvocationResult::outcome`].
    pub async fn dispatch(&self, name: &str, arguments: Arguments) -> InvocationResult {
        let outcome = self.try_dispatch(name, &arguments).await;
        if let Err(e) = &outcome {
            tracing::warn!("Error executing tool '{}': {}", name, e);
        }
        InvocationResult {
            tool: name.to_string(),
            arguments,
            outcome,
        }
    }

    async fn try_dispatch(&self, name: &str, arguments: &Arguments) -> Result<String, ToolError> {
        let tool = self.get(name)?;

        let missing: Vec<String> = tool
            .parameters()
            .iter()
            .filter(|p| p.is_required() && !arguments.contains_key(p.name()))
            .map(|p| p.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ToolError::MissingParameters(missing));
        }

        tracing::debug!("Executing tool '{}'", name);
        tool.execute(arguments)
            .await
            .map_err(|source| ToolError::Execution {
                tool: name.to_string(),
                source,
            })
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            tool_count: self.tools.len(),
            names: self.list(),
            registrations: self.registrations,
            error_count: self.errors.len(),
            error_messages: self.errors.clone(),
        }
    }
}

/// Parse a model-issued argument payload into an arguments mapping.
///
/// A blank payload is an empty mapping.
pub fn parse_arguments(raw: &str) -> Result<Arguments, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Arguments::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ToolError::InvalidArguments(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
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

fn checked_schema(tool: &dyn Tool) -> Result<Value, ToolError> {
    let mut seen = HashSet::new();
    for param in tool.parameters() {
        if param.name().is_empty() {
            return Err(ToolError::InvalidTool("parameter with empty name".into()));
        }
        if !seen.insert(param.name().to_string()) {
            return Err(ToolError::InvalidTool(format!(
                "duplicate parameter '{}'",
                param.name()
            )));
        }
    }
    Ok(model_tool_schema(tool))
}
