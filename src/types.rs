// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Thread class a task body can hop onto.
///
/// - `Main`: the UI thread; work is drained by whoever owns the `MainLoop`.
/// - `Io`: a single background thread, work runs in submission order.
/// - `Core`: the shared worker pool.
/// - `Scheduled`: a pool that also supports delayed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Main,
    Io,
    Core,
    Scheduled,
}

impl Default for ExecutorKind {
    fn default() -> Self {
        ExecutorKind::Main
    }
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "main" => Ok(ExecutorKind::Main),
            "io" => Ok(ExecutorKind::Io),
            "core" => Ok(ExecutorKind::Core),
            "scheduled" => Ok(ExecutorKind::Scheduled),
            other => Err(format!(
                "invalid executor kind: {other} (expected \"main\", \"io\", \"core\" or \"scheduled\")"
            )),
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutorKind::Main => "main",
            ExecutorKind::Io => "io",
            ExecutorKind::Core => "core",
            ExecutorKind::Scheduled => "scheduled",
        };
        f.write_str(s)
    }
}
