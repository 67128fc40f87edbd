//! Loaders producing [`BuildtimeFlags`] from inline maps, environment-style entries and JSON text.
//!
//! Loaders do no I/O: environment entries and JSON text are handed in by the caller.
use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BuildtimeFlags, Result};
use crate::error::BuildtimeError;

/// Prefix marking an environment entry as a flag.
pub const DEFAULT_ENV_PREFIX: &str = "FF_";

/// Returns `flags` unchanged. The result shares the same map.
pub fn flags_from_inline(flags: BuildtimeFlags) -> BuildtimeFlags {
    flags
}

/// Read flags from environment-style `(key, value)` entries.
///
/// Entries whose key starts with `prefix` and that carry a value are flags. The gate name is the
/// key without the prefix, lower-cased (`FF_NEW_CHECKOUT` becomes `new_checkout`). Values must be
/// exactly `"true"` or `"false"`.
///
/// # Errors
///
/// Fails with `Invalid boolean for <KEY>` for the first entry, in iteration order, whose value is
/// not a boolean. `KEY` is the full, prefixed key.
pub fn flags_from_env<I, K, V>(entries: I, prefix: &str) -> Result<BuildtimeFlags>
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut flags = HashMap::new();

    for (key, value) in entries {
        let key = key.as_ref();
        let (Some(gate), Some(value)) = (key.strip_prefix(prefix), value) else {
            continue;
        };
        let value = match value.as_ref() {
            "true" => true,
            "false" => false,
            _ => return Err(BuildtimeError::new(format!("Invalid boolean for {key}"))),
        };
        flags.insert(gate.to_lowercase(), value);
    }

    Ok(flags.into())
}

/// Read flags from a JSON object of booleans.
///
/// # Errors
///
/// - `Invalid JSON` if `json` does not parse, with the parser error as cause.
/// - `JSON must be an object` if the root is an array, a primitive or `null`.
/// - `Invalid value for <key>` for the first key, in document order, whose value is not a boolean.
pub fn flags_from_json(json: &str) -> Result<BuildtimeFlags> {
    let parsed: Value = serde_json::from_str(json).map_err(|err| BuildtimeError {
        reason: "Invalid JSON".to_owned(),
        cause: Some(Arc::new(err)),
    })?;

    let Value::Object(object) = parsed else {
        return Err(BuildtimeError::new("JSON must be an object"));
    };

    object
        .into_iter()
        .map(|(key, value)| match value {
            Value::Bool(value) => Ok((key, value)),
            _ => Err(BuildtimeError::new(format!("Invalid value for {key}"))),
        })
        .collect::<Result<HashMap<_, _>>>()
        .map(BuildtimeFlags::from)
}

/// A build-time flag source as it appears in configuration files.
///
/// ```
/// # use flagbridge::buildtime::FlagSource;
/// let source: FlagSource = serde_json::from_str(r#"{"kind": "env"}"#).unwrap();
/// let flags = source.load([("FF_NEW_CHECKOUT", "true"), ("HOME", "/root")]).unwrap();
/// assert_eq!(flags.get("new_checkout"), Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FlagSource {
    /// Flags listed in the configuration itself.
    Inline {
        /// Gate values.
        flags: HashMap<String, bool>,
    },
    /// Flags read from environment entries, see [`flags_from_env`].
    Env {
        /// Key prefix marking an entry as a flag. Defaults to [`DEFAULT_ENV_PREFIX`].
        #[serde(default = "default_env_prefix")]
        prefix: String,
    },
    /// Flags parsed from a JSON document, see [`flags_from_json`].
    Json {
        /// The document text.
        text: String,
    },
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.to_owned()
}

impl FlagSource {
    /// Load the flags. `env` is only read by [`FlagSource::Env`]; pass `std::env::vars()` to use
    /// the process environment.
    pub fn load<I, K, V>(&self, env: I) -> Result<BuildtimeFlags>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match self {
            FlagSource::Inline { flags } => Ok(flags_from_inline(flags.clone().into())),
            FlagSource::Env { prefix } => {
                flags_from_env(env.into_iter().map(|(key, value)| (key, Some(value))), prefix)
            }
            FlagSource::Json { text } => flags_from_json(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    const NO_ENV: [(&str, &str); 0] = [];

    #[test]
    fn inline_is_identity() {
        let flags = BuildtimeFlags::from_iter([("a", true)]);
        assert!(flags_from_inline(flags.clone()).ptr_eq(&flags));
    }

    #[test]
    fn env_strips_prefix_and_lowercases() {
        let flags = flags_from_env(
            [
                ("FF_NEW_CHECKOUT", Some("true")),
                ("FF_Dark_Mode", Some("false")),
                ("FF_UNSET", None),
                ("PATH", Some("/usr/bin")),
            ],
            DEFAULT_ENV_PREFIX,
        )
        .unwrap();

        assert_eq!(flags.len(), 2);
        assert_eq!(flags.get("new_checkout"), Some(true));
        assert_eq!(flags.get("dark_mode"), Some(false));
        assert!(!flags.contains("unset"));
    }

    #[test]
    fn env_honours_custom_prefix() {
        let flags = flags_from_env(
            [("APP_FLAG_BETA", Some("true")), ("FF_BETA", Some("false"))],
            "APP_FLAG_",
        )
        .unwrap();

        assert_eq!(flags.len(), 1);
        assert_eq!(flags.get("beta"), Some(true));
    }

    #[test]
    fn env_rejects_first_non_boolean() {
        let err = flags_from_env(
            [
                ("FF_A", Some("true")),
                ("FF_B", Some("yes")),
                ("FF_C", Some("1")),
            ],
            DEFAULT_ENV_PREFIX,
        )
        .unwrap_err();

        assert_eq!(err.reason, "Invalid boolean for FF_B");
    }

    #[test]
    fn env_values_are_case_sensitive() {
        let err = flags_from_env([("FF_A", Some("TRUE"))], DEFAULT_ENV_PREFIX).unwrap_err();
        assert_eq!(err.to_string(), "Invalid boolean for FF_A");
    }

    #[test]
    fn json_object_of_booleans() {
        let flags = flags_from_json(r#"{"a": true, "b": false}"#).unwrap();

        assert_eq!(flags.get("a"), Some(true));
        assert_eq!(flags.get("b"), Some(false));
    }

    #[test]
    fn json_parse_error_keeps_cause() {
        let err = flags_from_json("{not json").unwrap_err();

        assert_eq!(err.reason, "Invalid JSON");
        assert!(err.source().is_some());
    }

    #[test]
    fn json_root_must_be_object() {
        for json in ["[true]", "true", "null", "\"a\""] {
            assert_eq!(
                flags_from_json(json).unwrap_err().reason,
                "JSON must be an object",
                "{json}"
            );
        }
    }

    #[test]
    fn json_rejects_first_non_boolean_in_document_order() {
        let err = flags_from_json(r#"{"ok": true, "zeta": "true", "alpha": 1}"#).unwrap_err();
        assert_eq!(err.reason, "Invalid value for zeta");
    }

    #[test]
    fn source_from_configuration() {
        let inline: FlagSource =
            serde_json::from_str(r#"{"kind": "inline", "flags": {"a": true}}"#).unwrap();
        assert_eq!(inline.load(NO_ENV).unwrap().get("a"), Some(true));

        let json: FlagSource =
            serde_json::from_str(r#"{"kind": "json", "text": "{\"b\": false}"}"#).unwrap();
        assert_eq!(json.load(NO_ENV).unwrap().get("b"), Some(false));

        let env: FlagSource =
            serde_json::from_str(r#"{"kind": "env", "prefix": "X_"}"#).unwrap();
        assert_eq!(
            env,
            FlagSource::Env {
                prefix: "X_".to_owned()
            }
        );
        assert_eq!(env.load([("X_C", "true")]).unwrap().get("c"), Some(true));
    }
}
