//! Derives the command catalog from a raw action list, where each action maps
//! parameter names to type strings such as `"number"` or `"text" | "media"`.

use super::{ApiCategoryDef, ApiCommandDef, CommandParam, ParamType, SchemaError};
use indexmap::IndexMap;
use std::path::Path;

/// Ordered action → (parameter name → raw type string).
pub type RawSchema = IndexMap<String, IndexMap<String, String>>;

/// First action of each category, in catalog order.
pub const DEFAULT_ANCHORS: &[(&str, &str)] = &[
    ("id_select_project", "PROJECT"),
    ("name_select_show", "SHOWS"),
    ("next_slide", "PRESENTATION"),
    ("restore_output", "CLEAR"),
    ("start_camera", "MEDIA"),
    ("index_select_overlay", "OVERLAYS"),
    ("id_select_output_style", "VISUAL"),
    ("id_select_stage_layout", "STAGE"),
    ("change_volume", "AUDIO"),
    ("name_start_timer", "TIMERS"),
    ("change_variable", "FUNCTIONS"),
    ("sync_drive", "OTHER"),
    ("name_run_action", "ACTION"),
    ("add_to_project", "EDIT"),
    ("get_shows", "GET"),
];

const CATEGORY_ICONS: &[(&str, &str)] = &[
    ("PROJECT", "albums-outline"),
    ("SHOWS", "easel-outline"),
    ("PRESENTATION", "play-circle-outline"),
    ("CLEAR", "trash-outline"),
    ("MEDIA", "film-outline"),
    ("OVERLAYS", "layers-outline"),
    ("VISUAL", "color-palette-outline"),
    ("STAGE", "tv-outline"),
    ("AUDIO", "volume-high-outline"),
    ("TIMERS", "time-outline"),
    ("FUNCTIONS", "construct-outline"),
    ("OTHER", "ellipsis-horizontal-outline"),
    ("ACTION", "flash-outline"),
    ("EDIT", "create-outline"),
    ("GET", "download-outline"),
];

/// Parse a raw type string into a parameter type.
///
/// `string`, `number` and `boolean` map directly. A union made only of quoted
/// string literals becomes an enum of those literals in source order, with
/// duplicates dropped. Anything else is `any`.
pub fn parse_param_type(raw: &str) -> ParamType {
    match raw.trim() {
        "string" => ParamType::String,
        "number" => ParamType::Number,
        "boolean" => ParamType::Boolean,
        other => parse_literal_union(other)
            .map(ParamType::Enum)
            .unwrap_or(ParamType::Any),
    }
}

fn parse_literal_union(raw: &str) -> Option<Vec<String>> {
    let mut values: Vec<String> = Vec::new();
    for part in raw.split('|') {
        let literal = unquote(part.trim())?;
        if !values.iter().any(|v| v == literal) {
            values.push(literal.to_string());
        }
    }
    if values.is_empty() { None } else { Some(values) }
}

fn unquote(s: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|quote| {
        s.strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
}

/// Split a raw parameter name into its bare name and requiredness.
/// A trailing `?` marks the parameter optional.
pub fn parse_param_name(raw: &str) -> (String, bool) {
    let trimmed = raw.trim();
    match trimmed.strip_suffix('?') {
        Some(name) => (name.trim_end().to_string(), false),
        None => (trimmed.to_string(), true),
    }
}

pub fn parse_param(raw_name: &str, raw_type: &str) -> (String, CommandParam) {
    let (name, required) = parse_param_name(raw_name);
    let param = CommandParam {
        kind: parse_param_type(raw_type),
        required,
    };
    (name, param)
}

/// `next_slide` -> `Next Slide`
fn humanize(action: &str) -> String {
    action
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn derive_command(action: &str, raw_params: &IndexMap<String, String>) -> ApiCommandDef {
    let params = if raw_params.is_empty() {
        None
    } else {
        Some(
            raw_params
                .iter()
                .map(|(name, ty)| parse_param(name, ty))
                .collect::<IndexMap<_, _>>(),
        )
    };
    ApiCommandDef {
        id: action.to_string(),
        label: humanize(action),
        params,
    }
}

fn new_category(id: &str) -> ApiCategoryDef {
    let icon = CATEGORY_ICONS
        .iter()
        .find(|(cat, _)| *cat == id)
        .map(|(_, icon)| icon.to_string());
    ApiCategoryDef {
        id: id.to_string(),
        label: id.to_string(),
        icon,
        commands: Vec::new(),
    }
}

/// Partition an ordered action list into categories.
///
/// Every anchor action opens a new category. Actions seen before the first
/// anchor belong to no category and are dropped.
pub fn derive_categories(raw: &RawSchema, anchors: &[(&str, &str)]) -> Vec<ApiCategoryDef> {
    let mut categories: Vec<ApiCategoryDef> = Vec::new();

    for (action, raw_params) in raw {
        if let Some((_, category_id)) = anchors.iter().find(|(anchor, _)| anchor == action) {
            categories.push(new_category(category_id));
        }

        match categories.last_mut() {
            Some(current) => current.commands.push(derive_command(action, raw_params)),
            None => {
                tracing::debug!(action = %action, "skipping action before first category anchor")
            }
        }
    }

    categories
}

/// Load a raw schema from a JSON file. Actions without parameters may map to
/// `{}` or `null`.
pub fn load_raw_schema(path: &Path) -> Result<RawSchema, SchemaError> {
    let content = std::fs::read_to_string(path)?;
    parse_raw_schema(&content)
}

pub fn parse_raw_schema(content: &str) -> Result<RawSchema, SchemaError> {
    let parsed: IndexMap<String, Option<IndexMap<String, String>>> = serde_json::from_str(content)?;
    Ok(parsed
        .into_iter()
        .map(|(action, params)| (action, params.unwrap_or_default()))
        .collect())
}
