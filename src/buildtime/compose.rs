//! Layering build-time flags over a remote feature flag evaluator.
use std::{future::Future, str::FromStr};

use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::BuildtimeFlags;
use crate::{error::BuildtimeError, FeatureFlagError, FeatureFlagEvaluator};

/// Which side wins when both the build-time map and the remote evaluator know a gate.
///
/// Displays and parses as `buildtime-first` / `remote-first`, the same names used by serde.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precedence {
    /// Gates present in the map never reach the remote.
    #[display("buildtime-first")]
    BuildtimeFirst,
    /// The remote is always asked; the map is only a fallback for remote failures.
    #[display("remote-first")]
    RemoteFirst,
}

impl FromStr for Precedence {
    type Err = BuildtimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buildtime-first" => Ok(Precedence::BuildtimeFirst),
            "remote-first" => Ok(Precedence::RemoteFirst),
            _ => Err(BuildtimeError::new(format!("Invalid precedence {s}"))),
        }
    }
}

/// A feature flag evaluator combining a [`BuildtimeFlags`] map with a remote evaluator.
///
/// The decision is made on every call, nothing is cached. Failures are never re-wrapped: a
/// remote failure that is not covered by the map reaches the caller unchanged.
#[derive(Debug, Clone)]
pub struct ComposedFeatureFlags<R> {
    flags: BuildtimeFlags,
    remote: R,
    precedence: Precedence,
}

/// Layer `flags` over `remote` according to `precedence`.
pub fn compose<R: FeatureFlagEvaluator>(
    flags: BuildtimeFlags,
    remote: R,
    precedence: Precedence,
) -> ComposedFeatureFlags<R> {
    ComposedFeatureFlags {
        flags,
        remote,
        precedence,
    }
}

impl<R: FeatureFlagEvaluator> ComposedFeatureFlags<R> {
    /// Which side wins for gates both sides know.
    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    /// The build-time map.
    pub fn flags(&self) -> &BuildtimeFlags {
        &self.flags
    }

    /// The remote evaluator.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    async fn resolve<F, Fut>(&self, gate: &str, remote: F) -> Result<bool, FeatureFlagError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<bool, FeatureFlagError>>,
    {
        match self.precedence {
            Precedence::BuildtimeFirst => match self.flags.get(gate) {
                Some(value) => Ok(value),
                None => remote().await,
            },
            Precedence::RemoteFirst => match remote().await {
                Ok(value) => Ok(value),
                Err(err) => match self.flags.get(gate) {
                    Some(value) => {
                        log::debug!(target: "flagbridge",
                                    gate,
                                    reason:display = err.reason;
                                    "remote evaluation failed, using build-time value");
                        Ok(value)
                    }
                    None => Err(err),
                },
            },
        }
    }
}

#[async_trait]
impl<R: FeatureFlagEvaluator> FeatureFlagEvaluator for ComposedFeatureFlags<R> {
    async fn check(&self, gate: &str) -> Result<bool, FeatureFlagError> {
        self.resolve(gate, || self.remote.check(gate)).await
    }

    async fn check_with_exposure(&self, gate: &str) -> Result<bool, FeatureFlagError> {
        self.resolve(gate, || self.remote.check_with_exposure(gate)).await
    }
}

/// Evaluates a build-time map alone. Gates missing from the map are off.
#[derive(Debug, Clone, Default)]
pub struct BuildtimeFeatureFlags {
    flags: BuildtimeFlags,
}

impl BuildtimeFeatureFlags {
    /// Evaluate `flags` with no remote.
    pub fn new(flags: BuildtimeFlags) -> BuildtimeFeatureFlags {
        BuildtimeFeatureFlags { flags }
    }
}

#[async_trait]
impl FeatureFlagEvaluator for BuildtimeFeatureFlags {
    async fn check(&self, gate: &str) -> Result<bool, FeatureFlagError> {
        Ok(self.flags.get(gate).unwrap_or(false))
    }

    async fn check_with_exposure(&self, gate: &str) -> Result<bool, FeatureFlagError> {
        Ok(self.flags.get(gate).unwrap_or(false))
    }
}
