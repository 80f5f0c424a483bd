//! User-curated favorite commands. Favorites are identified by an id derived
//! from their content, so saving the same command twice replaces the earlier
//! entry instead of duplicating it.

mod repository;
mod resolver;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use repository::{FAVORITES_STORAGE_KEY, FavoritesRepository, is_action_favorited};
pub use resolver::{SendArgs, resolve_favorite};

/// A stored favorite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ApiFavorite {
    Action {
        id: String,
        #[serde(rename = "actionId")]
        action_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Map<String, Value>>,
    },
    Custom {
        id: String,
        payload: String,
    },
}

impl ApiFavorite {
    pub fn id(&self) -> &str {
        match self {
            ApiFavorite::Action { id, .. } | ApiFavorite::Custom { id, .. } => id,
        }
    }

    /// Short text for list rows.
    pub fn describe(&self) -> String {
        match self {
            ApiFavorite::Action {
                action_id,
                data: Some(data),
                ..
            } if !data.is_empty() => format!("{} {}", action_id, Value::Object(data.clone())),
            ApiFavorite::Action { action_id, .. } => action_id.clone(),
            ApiFavorite::Custom { payload, .. } => payload.clone(),
        }
    }
}

/// A favorite before its id has been assigned.
#[derive(Debug, Clone, PartialEq)]
pub enum FavoriteCandidate {
    Action {
        action_id: String,
        data: Option<Map<String, Value>>,
    },
    Custom {
        payload: String,
    },
}

impl FavoriteCandidate {
    pub fn action(action_id: impl Into<String>) -> Self {
        FavoriteCandidate::Action {
            action_id: action_id.into(),
            data: None,
        }
    }

    pub fn action_with_data(action_id: impl Into<String>, data: Map<String, Value>) -> Self {
        FavoriteCandidate::Action {
            action_id: action_id.into(),
            data: Some(data),
        }
    }

    pub fn custom(payload: impl Into<String>) -> Self {
        FavoriteCandidate::Custom {
            payload: payload.into(),
        }
    }

    /// Assign the content-derived id. An empty argument map is stored as no
    /// arguments so both spellings share one id.
    pub fn into_favorite(self) -> ApiFavorite {
        match self {
            FavoriteCandidate::Action { action_id, data } => {
                let data = data.filter(|d| !d.is_empty());
                ApiFavorite::Action {
                    id: action_favorite_id(&action_id, data.as_ref()),
                    action_id,
                    data,
                }
            }
            FavoriteCandidate::Custom { payload } => ApiFavorite::Custom {
                id: custom_favorite_id(&payload),
                payload,
            },
        }
    }
}

pub fn action_favorite_id(action_id: &str, data: Option<&Map<String, Value>>) -> String {
    match data {
        Some(data) if !data.is_empty() => {
            format!("action:{}:{}", action_id, simple_hash(&canonical_json(data)))
        }
        _ => format!("action:{}", action_id),
    }
}

pub fn custom_favorite_id(payload: &str) -> String {
    format!("custom:{}", simple_hash(payload))
}

/// Compact JSON with object keys sorted at every depth, so deep-equal maps
/// serialize identically regardless of insertion order.
pub fn canonical_json(data: &Map<String, Value>) -> String {
    fn canonicalize(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                Value::Object(
                    entries
                        .into_iter()
                        .map(|(k, v)| (k.clone(), canonicalize(v)))
                        .collect(),
                )
            }
            Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
            other => other.clone(),
        }
    }

    canonicalize(&Value::Object(data.clone())).to_string()
}

/// 32-bit polynomial rolling hash (`h * 31 + c` over UTF-16 code units),
/// rendered as the base-36 magnitude. Not collision free.
pub fn simple_hash(input: &str) -> String {
    let mut h: i32 = 0;
    for unit in input.encode_utf16() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit));
    }
    to_base36(i64::from(h).unsigned_abs())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
