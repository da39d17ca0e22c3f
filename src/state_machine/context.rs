//! # Extended State
//!
//! Transient variables of one workflow cycle. Cleared whenever the deploy or
//! undeploy composite is entered, written by actions and read by guards.
//! Never persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedState {
    /// Version whose bundle was found in storage during the bundle check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Application launched or reused by the finalize step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
}

impl ExtendedState {
    pub fn clear(&mut self) {
        self.app_version = None;
        self.application_id = None;
    }

    /// True when the bundle check recorded `version` as already stored
    pub fn has_bundle(&self, version: &str) -> bool {
        self.app_version.as_deref() == Some(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_resets_variables() {
        let mut state = ExtendedState {
            app_version: Some("app".to_string()),
            application_id: Some("application_1_0001".to_string()),
        };
        assert!(state.has_bundle("app"));
        assert!(!state.has_bundle("other"));

        state.clear();
        assert_eq!(state, ExtendedState::default());
    }
}
