use planner_core::{Edge, EdgeId};
use serde::{Deserialize, Serialize};

use super::DependencyKind;
use crate::{FieldUpdate, ProjectId, TaskId};

/// Payload carried by every dependency edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyLink {
    pub project_id: ProjectId,
    pub kind: DependencyKind,
    /// Offset applied after the kind's base constraint; negative means overlap
    #[serde(default)]
    pub lag_hours: f64,
    #[serde(default)]
    pub notes: Option<String>,
    /// Set by the critical path calculator, never by callers
    #[serde(default)]
    pub on_critical_path: bool,
}

impl DependencyLink {
    pub fn new(project_id: ProjectId, kind: DependencyKind) -> Self {
        Self {
            project_id,
            kind,
            lag_hours: 0.0,
            notes: None,
            on_critical_path: false,
        }
    }
}

/// A dependency edge: `source` is the predecessor, `target` the successor
pub type DependencyEdge = Edge<DependencyLink>;

/// Request to create a dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub successor_id: TaskId,
    pub predecessor_id: TaskId,
    #[serde(default)]
    pub kind: DependencyKind,
    #[serde(default)]
    pub lag_hours: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DependencySpec {
    pub fn new(successor_id: TaskId, predecessor_id: TaskId, kind: DependencyKind) -> Self {
        Self {
            successor_id,
            predecessor_id,
            kind,
            lag_hours: None,
            notes: None,
        }
    }

    pub fn with_lag(mut self, lag_hours: f64) -> Self {
        self.lag_hours = Some(lag_hours);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Materialize the edge this spec describes
    pub fn to_edge(&self, edge_id: EdgeId, project_id: ProjectId) -> DependencyEdge {
        let mut link = DependencyLink::new(project_id, self.kind);
        link.lag_hours = self.lag_hours.unwrap_or(0.0);
        link.notes = self.notes.clone();
        Edge::with_id(edge_id, self.predecessor_id, self.successor_id, link)
    }
}

/// Partial update of a dependency; endpoints are immutable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyUpdate {
    pub kind: Option<DependencyKind>,
    pub lag_hours: Option<f64>,
    pub notes: FieldUpdate<String>,
}

impl DependencyUpdate {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.lag_hours.is_none() && !self.notes.is_change()
    }

    pub fn apply_to(self, link: &mut DependencyLink) {
        if let Some(kind) = self.kind {
            link.kind = kind;
        }
        if let Some(lag_hours) = self.lag_hours {
            link.lag_hours = lag_hours;
        }
        self.notes.apply_to(&mut link.notes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_spec_to_edge_orients_predecessor_as_source() {
        let project = Uuid::new_v4();
        let successor = Uuid::new_v4();
        let predecessor = Uuid::new_v4();
        let spec = DependencySpec::new(successor, predecessor, DependencyKind::StartToStart)
            .with_lag(-2.0)
            .with_notes("overlap allowed");

        let edge_id = Uuid::new_v4();
        let edge = spec.to_edge(edge_id, project);

        assert_eq!(edge.id, edge_id);
        assert_eq!(edge.source, predecessor);
        assert_eq!(edge.target, successor);
        assert_eq!(edge.attrs.lag_hours, -2.0);
        assert_eq!(edge.attrs.notes.as_deref(), Some("overlap allowed"));
        assert!(!edge.attrs.on_critical_path);
        assert!(edge.is_active());
    }

    #[test]
    fn test_update_applies_only_given_fields() {
        let mut link = DependencyLink::new(Uuid::new_v4(), DependencyKind::FinishToStart);
        link.notes = Some("keep me".to_string());

        let update = DependencyUpdate {
            lag_hours: Some(4.0),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut link);

        assert_eq!(link.kind, DependencyKind::FinishToStart);
        assert_eq!(link.lag_hours, 4.0);
        assert_eq!(link.notes.as_deref(), Some("keep me"));

        DependencyUpdate {
            notes: FieldUpdate::Clear,
            ..Default::default()
        }
        .apply_to(&mut link);
        assert_eq!(link.notes, None);
    }

    #[test]
    fn test_spec_deserializes_with_defaults() {
        let json = format!(
            r#"{{"successor_id":"{}","predecessor_id":"{}"}}"#,
            Uuid::from_u128(2),
            Uuid::from_u128(1)
        );
        let spec: DependencySpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec.kind, DependencyKind::FinishToStart);
        assert_eq!(spec.lag_hours, None);
    }
}
