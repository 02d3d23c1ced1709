//! Service configuration.

use serde::Deserialize;

/// Configuration for the Natural Rights service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Register unknown clients whose signature verifies under their own id.
    pub enroll_unknown_clients: bool,

    /// Maximum number of edges walked when resolving a capability.
    pub max_delegation_depth: usize,

    /// Maximum number of actions accepted in one request.
    pub max_actions_per_request: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enroll_unknown_clients: true,
            max_delegation_depth: 4,
            max_actions_per_request: 256,
        }
    }
}

impl ServiceConfig {
    pub fn with_enroll_unknown_clients(mut self, enroll: bool) -> Self {
        self.enroll_unknown_clients = enroll;
        self
    }

    pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = depth;
        self
    }

    pub fn with_max_actions_per_request(mut self, max: usize) -> Self {
        self.max_actions_per_request = max;
        self
    }
}
