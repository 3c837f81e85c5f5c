//! Tool Catalog
//!
//! Turns a tool-provider listing into descriptors the model-serving
//! endpoint accepts. Endpoints reject or degrade on schemas with
//! undocumented parameters, so every description is backfilled.

use serde_json::{Map, Value, json};

use crate::tool::{RawTool, ToolDescriptor};

/// Description used when a tool has none
pub const DEFAULT_TOOL_DESCRIPTION: &str = "A tool";

/// Tool descriptors offered to the model for one research call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolCatalog {
    descriptors: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Build descriptors from a raw listing. Total: never fails.
    pub fn build(raw: Vec<RawTool>) -> Self {
        let descriptors = raw.into_iter().map(describe).collect();
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn describe(tool: RawTool) -> ToolDescriptor {
    let description = tool
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TOOL_DESCRIPTION.into());

    ToolDescriptor {
        name: tool.name,
        description,
        parameters: backfill_schema(tool.input_schema),
    }
}

fn backfill_schema(schema: Value) -> Value {
    let mut schema = match schema {
        Value::Object(map) => map,
        _ => {
            let mut map = Map::new();
            map.insert("type".into(), json!("object"));
            map.insert("properties".into(), json!({}));
            map
        }
    };

    if let Some(Value::Object(properties)) = schema.get_mut("properties") {
        for (name, property) in properties.iter_mut() {
            let fallback = Value::String(format!("The {name} parameter"));
            match property {
                Value::Object(details) => {
                    let documented = details
                        .get("description")
                        .and_then(Value::as_str)
                        .is_some_and(|d| !d.trim().is_empty());
                    if !documented {
                        details.insert("description".into(), fallback);
                    }
                }
                // `true` / `{}`-style schemas: keep them permissive, add the text
                _ => *property = json!({ "description": fallback }),
            }
        }
    }

    Value::Object(schema)
}
