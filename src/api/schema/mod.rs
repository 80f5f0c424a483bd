//! Command schema registry. Describes every action the host application accepts,
//! grouped into display categories, with per-parameter type metadata used to drive
//! argument forms and to validate invocations before they are sent.

mod catalog;
pub mod derive;
pub mod validate;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::OnceLock;

pub use derive::{DEFAULT_ANCHORS, RawSchema, derive_categories, load_raw_schema, parse_param_type};
pub use validate::{ParamIssue, coerce_value, validate_invocation};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate command id `{0}`")]
    DuplicateCommand(String),
    #[error("duplicate category id `{0}`")]
    DuplicateCategory(String),
    #[error("failed to read raw schema: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse raw schema: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Type of a single command argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
    /// Closed set of string values, in display order.
    Enum(Vec<String>),
    Any,
}

impl ParamType {
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Enum(_) => "enum",
            ParamType::Any => "any",
        }
    }
}

/// One named argument of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "CommandParamRepr", from = "CommandParamRepr")]
pub struct CommandParam {
    pub kind: ParamType,
    pub required: bool,
}

impl CommandParam {
    pub fn required(kind: ParamType) -> Self {
        Self {
            kind,
            required: true,
        }
    }

    pub fn optional(kind: ParamType) -> Self {
        Self {
            kind,
            required: false,
        }
    }

    pub fn enum_values(&self) -> Option<&[String]> {
        match &self.kind {
            ParamType::Enum(values) => Some(values),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ParamKind {
    String,
    Number,
    Boolean,
    Enum,
    Any,
}

// Serialized shape: { "type": "enum", "required": true, "enum": ["text", "media"] }
#[derive(Serialize, Deserialize)]
struct CommandParamRepr {
    #[serde(rename = "type")]
    kind: ParamKind,
    #[serde(default)]
    required: bool,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<String>>,
}

impl From<CommandParam> for CommandParamRepr {
    fn from(param: CommandParam) -> Self {
        let (kind, values) = match param.kind {
            ParamType::String => (ParamKind::String, None),
            ParamType::Number => (ParamKind::Number, None),
            ParamType::Boolean => (ParamKind::Boolean, None),
            ParamType::Enum(values) => (ParamKind::Enum, Some(values)),
            ParamType::Any => (ParamKind::Any, None),
        };
        Self {
            kind,
            required: param.required,
            values,
        }
    }
}

impl From<CommandParamRepr> for CommandParam {
    fn from(repr: CommandParamRepr) -> Self {
        let kind = match repr.kind {
            ParamKind::String => ParamType::String,
            ParamKind::Number => ParamType::Number,
            ParamKind::Boolean => ParamType::Boolean,
            ParamKind::Enum => ParamType::Enum(repr.values.unwrap_or_default()),
            ParamKind::Any => ParamType::Any,
        };
        Self {
            kind,
            required: repr.required,
        }
    }
}

/// A single remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCommandDef {
    /// Action identifier sent on the wire; unique across the registry.
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IndexMap<String, CommandParam>>,
}

impl ApiCommandDef {
    pub fn has_params(&self) -> bool {
        self.params.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Query commands return data instead of changing host state.
    pub fn is_query(&self) -> bool {
        self.id.starts_with("get_")
    }

    pub fn param(&self, name: &str) -> Option<&CommandParam> {
        self.params.as_ref().and_then(|p| p.get(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCategoryDef {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub commands: Vec<ApiCommandDef>,
}

/// Result of a command lookup.
#[derive(Debug, Clone, Copy)]
pub struct CommandLookup<'a> {
    pub category: &'a ApiCategoryDef,
    pub command: &'a ApiCommandDef,
}

/// Immutable catalog of categories and commands with an id index.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    categories: Vec<ApiCategoryDef>,
    index: HashMap<String, (usize, usize)>,
}

static BUILTIN_REGISTRY: OnceLock<CommandRegistry> = OnceLock::new();

impl CommandRegistry {
    /// Build a registry, rejecting duplicate category or command ids.
    pub fn new(categories: Vec<ApiCategoryDef>) -> Result<Self, SchemaError> {
        let mut seen_categories = std::collections::HashSet::new();
        for category in &categories {
            if !seen_categories.insert(category.id.as_str()) {
                return Err(SchemaError::DuplicateCategory(category.id.clone()));
            }
        }

        let mut index = HashMap::new();
        for (ci, category) in categories.iter().enumerate() {
            for (mi, command) in category.commands.iter().enumerate() {
                match index.entry(command.id.clone()) {
                    Entry::Occupied(_) => {
                        return Err(SchemaError::DuplicateCommand(command.id.clone()));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert((ci, mi));
                    }
                }
            }
        }

        Ok(Self { categories, index })
    }

    /// The hand-authored catalog shipped with the client.
    pub fn builtin() -> &'static CommandRegistry {
        BUILTIN_REGISTRY.get_or_init(|| {
            let categories = catalog::builtin_categories();
            let mut index = HashMap::new();
            for (ci, category) in categories.iter().enumerate() {
                for (mi, command) in category.commands.iter().enumerate() {
                    if index.insert(command.id.clone(), (ci, mi)).is_some() {
                        tracing::warn!(
                            command = %command.id,
                            "duplicate command id in builtin catalog"
                        );
                    }
                }
            }
            CommandRegistry { categories, index }
        })
    }

    /// Build a registry from a raw action → parameter-type map.
    pub fn from_raw_schema(raw: &RawSchema, anchors: &[(&str, &str)]) -> Result<Self, SchemaError> {
        Self::new(derive_categories(raw, anchors))
    }

    pub fn list_categories(&self) -> &[ApiCategoryDef] {
        &self.categories
    }

    pub fn find_category(&self, id: &str) -> Option<&ApiCategoryDef> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn find_command_by_id(&self, id: &str) -> Option<CommandLookup<'_>> {
        let &(ci, mi) = self.index.get(id)?;
        let category = self.categories.get(ci)?;
        let command = category.commands.get(mi)?;
        Some(CommandLookup { category, command })
    }

    pub fn commands(&self) -> impl Iterator<Item = CommandLookup<'_>> {
        self.categories.iter().flat_map(|category| {
            category
                .commands
                .iter()
                .map(move |command| CommandLookup { category, command })
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(id: &str) -> ApiCommandDef {
        ApiCommandDef {
            id: id.to_string(),
            label: id.to_string(),
            params: None,
        }
    }

    fn category(id: &str, commands: &[&str]) -> ApiCategoryDef {
        ApiCategoryDef {
            id: id.to_string(),
            label: id.to_string(),
            icon: None,
            commands: commands.iter().map(|c| command(c)).collect(),
        }
    }

    #[test]
    fn test_builtin_lookup_finds_every_command() {
        let registry = CommandRegistry::builtin();
        assert_eq!(registry.list_categories().len(), 15);
        assert_eq!(registry.len(), 96);

        for category in registry.list_categories() {
            for command in &category.commands {
                let found = registry.find_command_by_id(&command.id).unwrap();
                assert_eq!(found.category.id, category.id);
                assert_eq!(found.command, command);
            }
        }

        assert!(registry.find_command_by_id("no_such_action").is_none());
        assert!(registry.find_command_by_id("").is_none());
    }

    #[test]
    fn test_builtin_catalog_has_unique_ids() {
        let categories = CommandRegistry::builtin().list_categories().to_vec();
        let total: usize = categories.iter().map(|c| c.commands.len()).sum();
        let registry = CommandRegistry::new(categories).unwrap();
        assert_eq!(registry.len(), total);
    }

    #[test]
    fn test_builtin_known_commands() {
        let registry = CommandRegistry::builtin();

        let next = registry.find_command_by_id("next_slide").unwrap();
        assert_eq!(next.category.id, "PRESENTATION");
        assert!(!next.command.has_params());
        assert!(!next.command.is_query());

        let transition = registry.find_command_by_id("change_transition").unwrap();
        let id_param = transition.command.param("id").unwrap();
        assert_eq!(
            id_param.enum_values(),
            Some(&["text".to_string(), "media".to_string()][..])
        );
        assert!(!id_param.required);

        let get_show = registry.find_command_by_id("get_show").unwrap();
        assert!(get_show.command.is_query());
        assert!(get_show.command.param("id").unwrap().required);
    }

    #[test]
    fn test_duplicate_command_rejected() {
        let result = CommandRegistry::new(vec![
            category("A", &["one", "two"]),
            category("B", &["two"]),
        ]);
        assert!(matches!(result, Err(SchemaError::DuplicateCommand(id)) if id == "two"));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let result = CommandRegistry::new(vec![category("A", &["one"]), category("A", &["two"])]);
        assert!(matches!(result, Err(SchemaError::DuplicateCategory(id)) if id == "A"));
    }

    #[test]
    fn test_commands_iterates_in_display_order() {
        let categories = vec![category("A", &["a1", "a2"]), category("B", &["b1"])];
        let registry = CommandRegistry::new(categories).unwrap();
        let ids: Vec<_> = registry
            .commands()
            .map(|l| (l.category.id.as_str(), l.command.id.as_str()))
            .collect();
        assert_eq!(ids, vec![("A", "a1"), ("A", "a2"), ("B", "b1")]);
    }

    #[test]
    fn test_param_serializes_to_schema_shape() {
        let param = CommandParam::required(ParamType::Enum(vec!["text".into(), "media".into()]));
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "enum", "required": true, "enum": ["text", "media"]})
        );

        let back: CommandParam =
            serde_json::from_value(serde_json::json!({"type": "number"})).unwrap();
        assert_eq!(back, CommandParam::optional(ParamType::Number));
    }
}
