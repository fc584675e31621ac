//! Migration protocol states and results

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LifecycleError;

/// Terminal outcome of `migrate_if_needed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationCode {
    /// Target created and the alias bound to it; there was nothing to migrate
    CreatedIndex,
    /// Data moved from the old index, alias cut over, old index deleted
    Migrated,
    /// Target version already exists
    NoChange,
    /// A step after target creation failed
    MigrationFailed,
    /// The existence check or target creation failed
    Error,
}

impl MigrationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationCode::CreatedIndex => "CREATED_INDEX",
            MigrationCode::Migrated => "MIGRATED",
            MigrationCode::NoChange => "NO_CHANGE",
            MigrationCode::MigrationFailed => "MIGRATION_FAILED",
            MigrationCode::Error => "ERROR",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            MigrationCode::CreatedIndex | MigrationCode::Migrated | MigrationCode::NoChange
        )
    }
}

impl fmt::Display for MigrationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Protocol states, in the order they can be visited
///
/// ```text
/// START ─┬─ TARGET_EXISTS                                  (NO_CHANGE)
///        └─ TARGET_MISSING ─ CREATED_TARGET ─┬─ NO_PRIOR_ALIAS   (CREATED_INDEX)
///                                            └─ PRIOR_ALIAS_FOUND ─ REINDEXED
///                                               ─ CUTOVER ─ REPLAYED ─ OLD_DELETED (MIGRATED)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationState {
    Start,
    TargetExists,
    TargetMissing,
    CreatedTarget,
    NoPriorAlias,
    PriorAliasFound,
    Reindexed,
    Cutover,
    Replayed,
    OldDeleted,
}

#[derive(Debug)]
pub struct MigrationResult {
    pub success: bool,
    pub code: MigrationCode,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
    pub took_ms: u64,
    pub error: Option<LifecycleError>,
    /// States visited, for diagnostics
    pub states: Vec<MigrationState>,
}

/// Facts collected while the protocol runs
#[derive(Debug)]
pub(crate) struct MigrationProgress {
    pub old_name: Option<String>,
    pub new_name: Option<String>,
    pub states: Vec<MigrationState>,
}

impl MigrationProgress {
    pub fn new() -> Self {
        Self {
            old_name: None,
            new_name: None,
            states: vec![MigrationState::Start],
        }
    }

    pub fn enter(&mut self, state: MigrationState) {
        tracing::debug!("migration state -> {:?}", state);
        self.states.push(state);
    }

    /// Whether the target index has been created in this run
    pub fn target_created(&self) -> bool {
        self.states.contains(&MigrationState::CreatedTarget)
    }

    pub fn finish(
        self,
        code: MigrationCode,
        took_ms: u64,
        error: Option<LifecycleError>,
    ) -> MigrationResult {
        MigrationResult {
            success: code.is_success(),
            code,
            old_name: self.old_name,
            new_name: self.new_name,
            took_ms,
            error,
            states: self.states,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_strings() {
        assert_eq!(MigrationCode::CreatedIndex.as_str(), "CREATED_INDEX");
        assert_eq!(MigrationCode::MigrationFailed.to_string(), "MIGRATION_FAILED");
        assert_eq!(
            serde_json::to_value(MigrationCode::NoChange).unwrap(),
            serde_json::json!("NO_CHANGE")
        );
    }

    #[test]
    fn test_success_codes() {
        assert!(MigrationCode::Migrated.is_success());
        assert!(MigrationCode::NoChange.is_success());
        assert!(!MigrationCode::MigrationFailed.is_success());
        assert!(!MigrationCode::Error.is_success());
    }

    #[test]
    fn test_progress_tracks_target_creation() {
        let mut progress = MigrationProgress::new();
        progress.enter(MigrationState::TargetMissing);
        assert!(!progress.target_created());

        progress.enter(MigrationState::CreatedTarget);
        progress.new_name = Some("t-en-books-v2".to_string());
        assert!(progress.target_created());

        let result = progress.finish(MigrationCode::MigrationFailed, 5, None);
        assert!(!result.success);
        assert_eq!(result.new_name.as_deref(), Some("t-en-books-v2"));
        assert_eq!(
            result.states,
            vec![
                MigrationState::Start,
                MigrationState::TargetMissing,
                MigrationState::CreatedTarget
            ]
        );
    }
}
