// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Worker configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use wthr_core::renderer::ContextAttributes;

/// Configuration for a [`RenderContextWorker`](crate::RenderContextWorker).
///
/// Every field has a default, so a TOML document only needs the keys it changes:
///
/// ```
/// use wthr_control::WorkerConfig;
///
/// let config = WorkerConfig::from_toml_str("init_timeout_ms = 250").unwrap();
/// assert_eq!(config.init_timeout_ms, 250);
/// assert_eq!(config.thread_name, "gpu-worker");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// How long construction waits for the worker thread to become ready.
    pub init_timeout_ms: u64,
    /// Creation hints for the worker's shared context. `None` copies the
    /// primary context's version and profile, hidden.
    pub context: Option<ContextAttributes>,
    /// Artificial delay added to every CPU parse, in milliseconds.
    pub cpu_phase_delay_ms: u64,
    /// OS name of the worker thread.
    pub thread_name: String,
    /// Compare driver strings of both contexts before starting.
    pub verify_sharing: bool,
    /// Maximum number of queued jobs. `None` means unbounded; when bounded,
    /// producers block while the queue is full.
    pub queue_capacity: Option<usize>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: 5000,
            context: None,
            cpu_phase_delay_ms: 0,
            thread_name: "gpu-worker".to_string(),
            verify_sharing: true,
            queue_capacity: None,
        }
    }
}

impl WorkerConfig {
    /// Parses a configuration from TOML, filling missing keys with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// The attributes the worker context is created with, given the primary's.
    pub fn worker_context_attributes(&self, primary: &ContextAttributes) -> ContextAttributes {
        match &self.context {
            Some(attributes) => attributes.clone(),
            None => ContextAttributes {
                visible: false,
                ..primary.clone()
            },
        }
    }

    /// [`queue_capacity`](Self::queue_capacity) with a zero bound raised to one.
    pub fn effective_queue_capacity(&self) -> Option<usize> {
        self.queue_capacity.map(|capacity| capacity.max(1))
    }

    /// [`init_timeout_ms`](Self::init_timeout_ms) as a `Duration`.
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    /// [`cpu_phase_delay_ms`](Self::cpu_phase_delay_ms) as a `Duration`.
    pub fn cpu_phase_delay(&self) -> Duration {
        Duration::from_millis(self.cpu_phase_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wthr_core::renderer::GlProfile;

    #[test]
    fn defaults_match_documented_values() {
        let config = WorkerConfig::default();
        assert_eq!(config.init_timeout(), Duration::from_secs(5));
        assert_eq!(config.cpu_phase_delay(), Duration::ZERO);
        assert!(config.verify_sharing);
        assert_eq!(config.queue_capacity, None);
        assert_eq!(config.context, None);
    }

    #[test]
    fn nested_context_table_is_parsed() {
        let config = WorkerConfig::from_toml_str(
            r#"
            cpu_phase_delay_ms = 20
            queue_capacity = 8

            [context]
            major = 3
            minor = 3
            profile = "compatibility"
            "#,
        )
        .unwrap();
        assert_eq!(config.cpu_phase_delay_ms, 20);
        assert_eq!(config.queue_capacity, Some(8));
        let context = config.context.clone().unwrap();
        assert_eq!((context.major, context.minor), (3, 3));
        assert_eq!(context.profile, GlProfile::Compatibility);
        assert_eq!(config.init_timeout_ms, 5000);
    }

    #[test]
    fn worker_context_follows_primary_unless_overridden() {
        let primary = ContextAttributes {
            major: 3,
            minor: 3,
            profile: GlProfile::Compatibility,
            visible: true,
            forward_compat: false,
        };
        let derived = WorkerConfig::default().worker_context_attributes(&primary);
        assert_eq!((derived.major, derived.minor), (3, 3));
        assert_eq!(derived.profile, GlProfile::Compatibility);
        assert!(!derived.visible);

        let pinned = WorkerConfig {
            context: Some(ContextAttributes::default()),
            ..Default::default()
        };
        assert_eq!(
            pinned.worker_context_attributes(&primary),
            ContextAttributes::default()
        );
    }

    #[test]
    fn zero_queue_capacity_is_raised_to_one() {
        let config = WorkerConfig::from_toml_str("queue_capacity = 0").unwrap();
        assert_eq!(config.queue_capacity, Some(0));
        assert_eq!(config.effective_queue_capacity(), Some(1));
        assert_eq!(WorkerConfig::default().effective_queue_capacity(), None);
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(WorkerConfig::from_toml_str("init_timeout_ms = \"soon\"").is_err());
    }
}
