use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Task;

/// Start and finish offsets of a scheduled task, in hours from the project epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub finish: f64,
}

impl TimeWindow {
    pub fn new(start: f64, finish: f64) -> Self {
        Self { start, finish }
    }
}

/// How a predecessor's timing constrains its successor
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyKind {
    /// Successor starts after predecessor finishes
    #[default]
    FinishToStart,
    /// Successor starts after predecessor starts
    StartToStart,
    /// Successor finishes after predecessor finishes
    FinishToFinish,
    /// Successor finishes after predecessor starts
    StartToFinish,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::FinishToStart,
        DependencyKind::StartToStart,
        DependencyKind::FinishToFinish,
        DependencyKind::StartToFinish,
    ];

    /// Lower bound this edge puts on the successor's earliest start
    pub fn earliest_successor_start(
        self,
        predecessor: TimeWindow,
        lag_hours: f64,
        successor_duration: f64,
    ) -> f64 {
        match self {
            Self::FinishToStart => predecessor.finish + lag_hours,
            Self::StartToStart => predecessor.start + lag_hours,
            Self::FinishToFinish => predecessor.finish + lag_hours - successor_duration,
            Self::StartToFinish => predecessor.start + lag_hours - successor_duration,
        }
    }

    /// Upper bound this edge puts on the predecessor's latest finish
    pub fn latest_predecessor_finish(
        self,
        successor: TimeWindow,
        lag_hours: f64,
        predecessor_duration: f64,
    ) -> f64 {
        match self {
            Self::FinishToStart => successor.start - lag_hours,
            Self::StartToStart => successor.start - lag_hours + predecessor_duration,
            Self::FinishToFinish => successor.finish - lag_hours,
            Self::StartToFinish => successor.finish - lag_hours + predecessor_duration,
        }
    }

    /// Whether the predecessor's current state releases the successor
    pub fn is_satisfied_by(self, predecessor: &Task) -> bool {
        match self {
            Self::FinishToStart | Self::FinishToFinish => predecessor.is_completed(),
            Self::StartToStart | Self::StartToFinish => predecessor.is_started(),
        }
    }

    /// What the predecessor must have done, for user-facing messages
    pub fn requirement(self) -> &'static str {
        match self {
            Self::FinishToStart | Self::FinishToFinish => "completed",
            Self::StartToStart | Self::StartToFinish => "started",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FinishToStart => "FINISH_TO_START",
            Self::StartToStart => "START_TO_START",
            Self::FinishToFinish => "FINISH_TO_FINISH",
            Self::StartToFinish => "START_TO_FINISH",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "FS" | "FINISH_TO_START" => Ok(Self::FinishToStart),
            "SS" | "START_TO_START" => Ok(Self::StartToStart),
            "FF" | "FINISH_TO_FINISH" => Ok(Self::FinishToFinish),
            "SF" | "START_TO_FINISH" => Ok(Self::StartToFinish),
            other => Err(format!("unknown dependency kind: {}", other)),
        }
    }
}
