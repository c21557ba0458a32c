use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type EdgeId = Uuid;

/// A directed, attributed edge between two nodes
///
/// Generic over the payload `E` so that callers can attach relationship
/// details (e.g. dependency kind and lag) without the graph knowing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<E> {
    /// Edge identifier
    pub id: EdgeId,
    /// Source node identifier (the predecessor)
    pub source: Uuid,
    /// Target node identifier (the successor)
    pub target: Uuid,
    /// Relationship payload
    pub attrs: E,
    /// When this edge was created
    pub created_at: DateTime<Utc>,
    /// When this edge was last modified
    pub updated_at: DateTime<Utc>,
    /// When this edge was archived (None = active)
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

impl<E> Edge<E> {
    /// Create a new active edge with a fresh identifier
    pub fn new(source: Uuid, target: Uuid, attrs: E) -> Self {
        Self::with_id(Uuid::new_v4(), source, target, attrs)
    }

    pub fn with_id(id: EdgeId, source: Uuid, target: Uuid, attrs: E) -> Self {
        let now = Utc::now();
        Self {
            id,
            source,
            target,
            attrs,
            created_at: now,
            updated_at: now,
            archived_at: None,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.archived_at.is_none()
    }

    /// Soft-delete; a second call keeps the first timestamp
    pub fn archive(&mut self) {
        if self.archived_at.is_none() {
            let now = Utc::now();
            self.archived_at = Some(now);
            self.updated_at = now;
        }
    }

    pub fn unarchive(&mut self) {
        if self.archived_at.is_some() {
            self.archived_at = None;
            self.updated_at = Utc::now();
        }
    }

    /// Mark the payload as modified
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
