// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Miner configuration and its validation.
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec::View;
use crate::error::ConfigError;
use crate::update::Timestamp;

/// Largest snippet size the extractor enumerates.
///
/// Configurations above this are accepted and treated as this value.
pub const MAX_ENUMERATED_SIZE: usize = 3;

/// Immutable miner configuration.
///
/// `window_size` bounds which buffered singletons may combine into a larger
/// snippet. It is unrelated to the scoring interval, which always spans the
/// whole stream observed so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Maximum time distance between combinable updates.
    pub window_size: Timestamp,
    /// Maximum number of updates in a snippet.
    pub max_snippet_size: usize,
    /// Canonicalization view for snippet keys.
    pub view: View,
    /// Coverage exponent.
    pub alpha: f64,
    /// Frequency exponent.
    pub beta: f64,
    /// Regularity exponent.
    pub gamma: f64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            window_size: 1,
            max_snippet_size: 1,
            view: View::Id,
            alpha: 1.0,
            beta: 1.0,
            gamma: 1.0,
        }
    }
}

impl MinerConfig {
    /// Configuration with the given structural bounds and default scoring.
    pub fn new(window_size: Timestamp, max_snippet_size: usize) -> Self {
        Self {
            window_size,
            max_snippet_size,
            ..Self::default()
        }
    }

    /// Replaces the view.
    pub fn with_view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    /// Replaces the three score exponents.
    pub fn with_exponents(mut self, alpha: f64, beta: f64, gamma: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self.gamma = gamma;
        self
    }

    /// Checks structural bounds and exponents.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_snippet_size < 1 {
            return Err(ConfigError::MaxSnippetSize(self.max_snippet_size));
        }
        if self.window_size <= 0 {
            return Err(ConfigError::WindowSize(self.window_size));
        }
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !value.is_finite() {
                return Err(ConfigError::Exponent { name, value });
            }
        }
        Ok(())
    }

    /// Snippet size the extractor actually enumerates up to.
    pub fn effective_max_size(&self) -> usize {
        self.max_snippet_size.min(MAX_ENUMERATED_SIZE)
    }

    pub(crate) fn warn_if_capped(&self) {
        if self.max_snippet_size > MAX_ENUMERATED_SIZE {
            warn!(
                requested = self.max_snippet_size,
                cap = MAX_ENUMERATED_SIZE,
                "max snippet size capped"
            );
        }
    }
}
