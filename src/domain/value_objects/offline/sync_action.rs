use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The user action a queued record replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Create,
    Update,
    Execute,
    Cancel,
    CompleteSingle,
    CompleteBulk,
    UpdateStatus,
    Delete,
    ToggleActive,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Execute => "execute",
            SyncAction::Cancel => "cancel",
            SyncAction::CompleteSingle => "complete_single",
            SyncAction::CompleteBulk => "complete_bulk",
            SyncAction::UpdateStatus => "update_status",
            SyncAction::Delete => "delete",
            SyncAction::ToggleActive => "toggle_active",
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, SyncAction::Create)
    }

    /// Actions addressed to an existing entity by id.
    pub fn targets_entity(&self) -> bool {
        !matches!(self, SyncAction::Create | SyncAction::CompleteBulk)
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(SyncAction::Create),
            "update" => Ok(SyncAction::Update),
            "execute" => Ok(SyncAction::Execute),
            "cancel" => Ok(SyncAction::Cancel),
            "complete_single" => Ok(SyncAction::CompleteSingle),
            "complete_bulk" => Ok(SyncAction::CompleteBulk),
            "update_status" => Ok(SyncAction::UpdateStatus),
            "delete" => Ok(SyncAction::Delete),
            "toggle_active" | "toggleActive" => Ok(SyncAction::ToggleActive),
            other => Err(format!("Unknown sync action: {other}")),
        }
    }
}
