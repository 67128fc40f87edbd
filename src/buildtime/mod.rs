//! Feature flags fixed when the application is built, and their composition with a remote
//! evaluator.
//!
//! Flags come from one of the [`source`] loaders and are layered over a remote
//! [`FeatureFlagEvaluator`](crate::FeatureFlagEvaluator) with [`compose`].
use std::{collections::HashMap, sync::Arc};

use derive_more::From;

pub mod compose;
pub mod source;

pub use compose::{compose, BuildtimeFeatureFlags, ComposedFeatureFlags, Precedence};
pub use source::{flags_from_env, flags_from_inline, flags_from_json, FlagSource, DEFAULT_ENV_PREFIX};

pub use crate::error::BuildtimeError;

/// Result of a build-time loader.
pub type Result<T> = std::result::Result<T, BuildtimeError>;

/// An immutable gate name to boolean map.
///
/// Cloning is cheap: clones share the same map.
#[derive(Debug, Clone, Default, PartialEq, Eq, From)]
pub struct BuildtimeFlags(Arc<HashMap<String, bool>>);

impl BuildtimeFlags {
    /// Value of `gate`, or `None` if the map has no entry for it.
    pub fn get(&self, gate: &str) -> Option<bool> {
        self.0.get(gate).copied()
    }

    /// Whether the map has an entry for `gate`. An entry set to `false` counts as present.
    pub fn contains(&self, gate: &str) -> bool {
        self.0.contains_key(gate)
    }

    /// Number of gates in the map.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no gates.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(gate, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(gate, value)| (gate.as_str(), *value))
    }

    /// Whether both values share the same underlying map.
    pub fn ptr_eq(&self, other: &BuildtimeFlags) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<HashMap<String, bool>> for BuildtimeFlags {
    fn from(flags: HashMap<String, bool>) -> Self {
        BuildtimeFlags(Arc::new(flags))
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for BuildtimeFlags {
    fn from_iter<T: IntoIterator<Item = (K, bool)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(gate, value)| (gate.into(), value))
            .collect::<HashMap<_, _>>()
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn false_entries_are_present() {
        let flags = BuildtimeFlags::from_iter([("off", false)]);

        assert!(flags.contains("off"));
        assert_eq!(flags.get("off"), Some(false));
        assert_eq!(flags.get("missing"), None);
    }

    #[test]
    fn clones_share_the_map() {
        let flags = BuildtimeFlags::from_iter([("a", true)]);
        assert!(flags.clone().ptr_eq(&flags));
        assert!(!BuildtimeFlags::from_iter([("a", true)]).ptr_eq(&flags));
    }
}
