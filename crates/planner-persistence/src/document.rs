use chrono::{DateTime, Utc};
use planner_core::{PlannerError, PlannerResult};
use planner_domain::{DependencyEdge, Task};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Everything a planner file holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceMetadata {
    /// Instance that performed the save
    pub instance_id: Uuid,
    pub saved_at: DateTime<Utc>,
}

impl PersistenceMetadata {
    pub fn new(instance_id: Uuid) -> Self {
        Self {
            instance_id,
            saved_at: Utc::now(),
        }
    }
}

/// Versioned wrapper written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonEnvelope {
    pub version: u32,
    pub metadata: PersistenceMetadata,
    pub data: ProjectDocument,
}

impl JsonEnvelope {
    pub fn new(data: ProjectDocument, instance_id: Uuid) -> Self {
        Self {
            version: FORMAT_VERSION,
            metadata: PersistenceMetadata::new(instance_id),
            data,
        }
    }

    pub fn to_bytes(&self) -> PlannerResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| PlannerError::Serialization(e.to_string()))
    }

    /// Parse an envelope, rejecting versions this build cannot read
    pub fn from_bytes(bytes: &[u8]) -> PlannerResult<Self> {
        let envelope: Self =
            serde_json::from_slice(bytes).map_err(|e| PlannerError::Serialization(e.to_string()))?;
        if envelope.version != FORMAT_VERSION {
            return Err(PlannerError::Serialization(format!(
                "Unsupported format version: {}",
                envelope.version
            )));
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_version_is_rejected() {
        let raw = json!({
            "version": 7,
            "metadata": { "instance_id": Uuid::nil(), "saved_at": Utc::now() },
            "data": { "tasks": [], "dependencies": [] }
        });
        let err = JsonEnvelope::from_bytes(raw.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Unsupported format version: 7"));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let raw = json!({
            "version": FORMAT_VERSION,
            "metadata": { "instance_id": Uuid::nil(), "saved_at": Utc::now() },
            "data": {}
        });
        let envelope = JsonEnvelope::from_bytes(raw.to_string().as_bytes()).unwrap();
        assert_eq!(envelope.data, ProjectDocument::default());
    }

    #[test]
    fn test_garbage_is_a_serialization_error() {
        let err = JsonEnvelope::from_bytes(b"not json").unwrap_err();
        assert!(matches!(err, PlannerError::Serialization(_)));
    }
}
