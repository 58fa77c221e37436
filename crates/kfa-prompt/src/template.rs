//! Task templates and the store seam they are loaded through.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from template lookup.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template store unavailable: {0}")]
    StoreUnavailable(String),
}

/// A declared `{name}` placeholder with its fallback value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TemplateVariable {
    /// Placeholder name as it appears inside braces
    pub name: String,
    /// Value used when the caller does not supply one
    #[serde(default)]
    pub default: String,
}

/// A persisted task template for one scenario category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PromptTemplate {
    /// Unique template id
    pub prompt_id: String,
    /// Human-readable name
    pub name: String,
    /// Scenario category this template belongs to
    pub category: String,
    /// Template body with `{name}` placeholders
    pub content: String,
    /// Whether this is the category's default template
    pub is_default: bool,
    /// Declared placeholders and their fallbacks
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
}

impl PromptTemplate {
    /// Substitute `{name}` placeholders.
    ///
    /// Caller-supplied values win; declared defaults fill the rest.
    /// Placeholders that are neither supplied nor declared are left as-is.
    pub fn render(&self, variables: &HashMap<String, String>) -> String {
        let mut resolved: HashMap<&str, &str> = HashMap::new();
        for var in &self.variables {
            resolved.insert(var.name.as_str(), var.default.as_str());
        }
        for (key, value) in variables {
            resolved.insert(key.as_str(), value.as_str());
        }

        let mut content = self.content.clone();
        for (name, value) in resolved {
            content = content.replace(&format!("{{{name}}}"), value);
        }
        content
    }
}

/// Lookup seam for the persisted default template of a category.
///
/// The SQLite-backed implementation lives in kfa-db; tests use an
/// in-memory map.
#[async_trait::async_trait]
pub trait TemplateStore: Send + Sync {
    /// Fetch the default template for a category, if one exists.
    async fn default_for_category(
        &self,
        category: &str,
    ) -> Result<Option<PromptTemplate>, TemplateError>;
}
