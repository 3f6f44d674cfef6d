//! Tool call type definitions
//!
//! Names and arguments are validated when they are built, so a broken step
//! configuration is rejected at load time instead of in the middle of a run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Validation failures for tool names and arguments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("tool name must not be empty")]
    EmptyToolName,

    #[error("argument name must not be empty")]
    EmptyArgumentName,

    #[error("argument '{0}' is not a finite number")]
    NonFiniteNumber(String),
}

/// Name of a tool exposed by an MCP server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolName(String);

impl ToolName {
    pub fn new(name: impl Into<String>) -> Result<Self, ArgumentError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ArgumentError::EmptyToolName);
        }
        Ok(Self(name))
    }

    /// Built-in names used for configuration defaults
    pub(crate) fn builtin(name: &'static str) -> Self {
        debug_assert!(!name.trim().is_empty());
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ToolName {
    type Error = ArgumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ToolName> for String {
    fn from(name: ToolName) -> Self {
        name.0
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scalar tool argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Text(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Integer(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<&ArgValue> for Value {
    fn from(value: &ArgValue) -> Self {
        match value {
            ArgValue::Bool(b) => Value::Bool(*b),
            ArgValue::Integer(i) => Value::Number((*i).into()),
            // Non-finite floats are rejected by ToolArguments
            ArgValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            ArgValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Named arguments for one tool call, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, ArgValue>",
    into = "BTreeMap<String, ArgValue>"
)]
pub struct ToolArguments(BTreeMap<String, ArgValue>);

impl ToolArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an argument, replacing any previous value under the same name
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ArgValue>,
    ) -> Result<(), ArgumentError> {
        let name = name.into();
        let value = value.into();
        check_argument(&name, &value)?;
        self.0.insert(name, value);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(
        mut self,
        name: impl Into<String>,
        value: impl Into<ArgValue>,
    ) -> Result<Self, ArgumentError> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object sent as the `arguments` of a `tools/call` request
    pub fn to_json_object(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v)))
            .collect()
    }
}

/// JSON has no NaN or infinity, so those never reach a tool
fn check_argument(name: &str, value: &ArgValue) -> Result<(), ArgumentError> {
    if name.trim().is_empty() {
        return Err(ArgumentError::EmptyArgumentName);
    }
    if let ArgValue::Float(f) = value {
        if !f.is_finite() {
            return Err(ArgumentError::NonFiniteNumber(name.to_string()));
        }
    }
    Ok(())
}

impl TryFrom<BTreeMap<String, ArgValue>> for ToolArguments {
    type Error = ArgumentError;

    fn try_from(map: BTreeMap<String, ArgValue>) -> Result<Self, Self::Error> {
        for (name, value) in &map {
            check_argument(name, value)?;
        }
        Ok(Self(map))
    }
}

impl From<ToolArguments> for BTreeMap<String, ArgValue> {
    fn from(args: ToolArguments) -> Self {
        args.0
    }
}

/// One request to one tool on one configured server
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Server key in `.mcp.json`
    pub server: String,
    pub tool: ToolName,
    pub arguments: ToolArguments,
}

impl ToolCall {
    pub fn new(server: impl Into<String>, tool: ToolName, arguments: ToolArguments) -> Self {
        Self {
            server: server.into(),
            tool,
            arguments,
        }
    }
}
