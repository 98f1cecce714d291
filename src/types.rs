use std::str::FromStr;

use serde::Deserialize;

/// Behaviour when a rebuild trigger arrives while a generation run is
/// already in progress.
///
/// - `Queue`: let the current run finish, then start one follow-up run for
///   every output triggered in the meantime (default behaviour).
/// - `Cancel`: abort the current run and immediately restart with the union
///   of its outputs and the newly triggered ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// Kind of a filesystem event as delivered by a watch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsEventKind {
    Create,
    Update,
    Delete,
}

impl FsEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FsEventKind::Create => "create",
            FsEventKind::Update => "update",
            FsEventKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for FsEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
