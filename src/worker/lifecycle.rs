use std::fmt::{self, Display};

use serde::Serialize;

/// Worker 生命周期状态
///
/// ```text
/// parsed -> installing -> installed -> activating -> activated
///              |                                        |
///              +--------------> redundant <-------------+
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// 安装失败或已被新版本替换
    Redundant,
}

impl WorkerState {
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;

        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Installing, Redundant)
                | (Installed, Redundant)
                | (Activated, Redundant)
        )
    }
}

impl Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use WorkerState::*;

        let res = match self {
            Parsed => "parsed",
            Installing => "installing",
            Installed => "installed",
            Activating => "activating",
            Activated => "activated",
            Redundant => "redundant",
        };
        f.write_str(res)
    }
}
