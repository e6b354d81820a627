use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type TaskId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    /// Free text classification of the step, e.g. "Image downloading".
    #[serde(rename = "type")]
    pub kind: String,

    /// Percentage as sent by the backend. Use [`Task::percent`] for display.
    pub progress: i64,

    #[serde(default)]
    pub metadata: TaskMetadata,
}

impl Task {
    pub fn percent(&self) -> u8 {
        self.progress.clamp(0, 100) as u8
    }

    pub fn is_done(&self) -> bool {
        self.progress >= 100
    }
}

/// Auxiliary fields whose shape depends on the task type. Kept as an opaque
/// map so whatever the backend sends survives a round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskMetadata(pub Map<String, Value>);

impl TaskMetadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names listed under `images: [{ "name": .. }]`, skipping malformed entries.
    pub fn images(&self) -> Vec<&str> {
        self.0
            .get("images")
            .and_then(Value::as_array)
            .map(|images| {
                images
                    .iter()
                    .filter_map(|img| img.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}
