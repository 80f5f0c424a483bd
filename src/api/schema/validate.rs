//! Checks and coerces command arguments against a command's parameter schema.

use super::{ApiCommandDef, CommandParam, ParamType};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamIssue {
    Missing { name: String },
    WrongType { name: String, expected: &'static str },
    NotInEnum { name: String, allowed: Vec<String> },
}

impl fmt::Display for ParamIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamIssue::Missing { name } => write!(f, "missing required parameter `{}`", name),
            ParamIssue::WrongType { name, expected } => {
                write!(f, "parameter `{}` must be a {}", name, expected)
            }
            ParamIssue::NotInEnum { name, allowed } => {
                write!(f, "parameter `{}` must be one of: {}", name, allowed.join(" | "))
            }
        }
    }
}

fn check_value(name: &str, param: &CommandParam, value: &Value) -> Option<ParamIssue> {
    let wrong_type = |expected| {
        Some(ParamIssue::WrongType {
            name: name.to_string(),
            expected,
        })
    };

    match &param.kind {
        ParamType::String if !value.is_string() => wrong_type("string"),
        ParamType::Number if !value.is_number() => wrong_type("number"),
        ParamType::Boolean if !value.is_boolean() => wrong_type("boolean"),
        ParamType::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.iter().any(|a| a == s) => None,
            _ => Some(ParamIssue::NotInEnum {
                name: name.to_string(),
                allowed: allowed.clone(),
            }),
        },
        _ => None,
    }
}

/// Validate an argument map for `command`.
///
/// `null` counts as absent. Parameters the schema does not describe are passed
/// through untouched since the host ignores what it does not understand.
pub fn validate_invocation(
    command: &ApiCommandDef,
    data: &Map<String, Value>,
) -> Result<(), Vec<ParamIssue>> {
    let Some(params) = &command.params else {
        return Ok(());
    };

    let issues: Vec<ParamIssue> = params
        .iter()
        .filter_map(|(name, param)| match data.get(name) {
            None | Some(Value::Null) if param.required => Some(ParamIssue::Missing {
                name: name.clone(),
            }),
            None | Some(Value::Null) => None,
            Some(value) => check_value(name, param, value),
        })
        .collect();

    if issues.is_empty() { Ok(()) } else { Err(issues) }
}

/// Convert text typed into an argument field into a JSON value.
///
/// Returns `None` when the text cannot represent the parameter's type, which
/// callers treat as "leave the argument unset".
pub fn coerce_value(param: &CommandParam, text: &str) -> Option<Value> {
    match &param.kind {
        ParamType::String | ParamType::Enum(_) => Some(Value::String(text.to_string())),
        ParamType::Number => {
            let trimmed = text.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Some(Value::from(n));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
        }
        ParamType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
            _ => None,
        },
        ParamType::Any => Some(
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::schema::CommandRegistry;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parameterless_command_accepts_anything() {
        let cmd = CommandRegistry::builtin().find_command_by_id("next_slide").unwrap().command;
        assert!(validate_invocation(cmd, &Map::new()).is_ok());
        assert!(validate_invocation(cmd, &data(json!({"extra": 1}))).is_ok());
    }

    #[test]
    fn test_missing_required_reported() {
        let cmd = CommandRegistry::builtin()
            .find_command_by_id("rearrange_groups")
            .unwrap()
            .command;
        let issues =
            validate_invocation(cmd, &data(json!({"showId": "abc", "to": null}))).unwrap_err();
        assert_eq!(
            issues,
            vec![
                ParamIssue::Missing { name: "from".into() },
                ParamIssue::Missing { name: "to".into() },
            ]
        );
    }

    #[test]
    fn test_type_and_enum_checks() {
        let cmd = CommandRegistry::builtin()
            .find_command_by_id("change_transition")
            .unwrap()
            .command;

        assert!(validate_invocation(cmd, &data(json!({"id": "media", "duration": 500}))).is_ok());

        let args = data(json!({"id": "slides", "duration": "fast"}));
        let issues = validate_invocation(cmd, &args).unwrap_err();
        assert_eq!(issues.len(), 2);
        assert!(matches!(&issues[0], ParamIssue::NotInEnum { name, .. } if name == "id"));
        assert_eq!(
            issues[1],
            ParamIssue::WrongType {
                name: "duration".into(),
                expected: "number"
            }
        );
        assert_eq!(issues[1].to_string(), "parameter `duration` must be a number");
    }

    #[test]
    fn test_optional_params_may_be_omitted() {
        let cmd = CommandRegistry::builtin().find_command_by_id("lock_output").unwrap().command;
        assert!(validate_invocation(cmd, &Map::new()).is_ok());
        assert!(validate_invocation(cmd, &data(json!({"value": "yes"}))).is_err());
    }

    #[test]
    fn test_coerce_number() {
        let param = CommandParam::required(ParamType::Number);
        assert_eq!(coerce_value(&param, "42"), Some(json!(42)));
        assert_eq!(coerce_value(&param, " 1.5 "), Some(json!(1.5)));
        assert_eq!(coerce_value(&param, "abc"), None);
        assert_eq!(coerce_value(&param, "NaN"), None);
    }

    #[test]
    fn test_coerce_boolean_and_any() {
        let boolean = CommandParam::optional(ParamType::Boolean);
        assert_eq!(coerce_value(&boolean, "On"), Some(json!(true)));
        assert_eq!(coerce_value(&boolean, "0"), Some(json!(false)));
        assert_eq!(coerce_value(&boolean, "maybe"), None);

        let any = CommandParam::optional(ParamType::Any);
        assert_eq!(coerce_value(&any, r#"{"a": [1]}"#), Some(json!({"a": [1]})));
        assert_eq!(coerce_value(&any, "plain text"), Some(json!("plain text")));

        let text = CommandParam::required(ParamType::String);
        assert_eq!(coerce_value(&text, "42"), Some(json!("42")));
    }
}
