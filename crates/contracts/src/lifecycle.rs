//! Host application lifecycle signals

use serde::{Deserialize, Serialize};

/// Foreground/background signal from the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleSignal {
    /// Application came to the foreground; flush loops run
    Active,
    /// Application went to the background; flush loops stop
    Inactive,
}
