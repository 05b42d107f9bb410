//! Process configuration for a validator.

use serde::{Deserialize, Serialize};

/// Immutable configuration constructed once at process start and passed
/// into the validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// When set, rules that check cleanly also report an Info message.
    #[serde(default)]
    pub success_reporting: bool,
}
