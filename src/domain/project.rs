use serde::{Deserialize, Deserializer, Serialize};

/// Repository-assigned identifier. `0` marks an entity that was never saved.
pub type ProjectId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_percent")]
    pub complete_percent: u8,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            complete_percent: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_percent(mut self, percent: u8) -> Self {
        self.complete_percent = clamp_percent(percent);
        self
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    pub fn is_complete(&self) -> bool {
        self.complete_percent == 100
    }
}

pub fn clamp_percent(percent: u8) -> u8 {
    percent.min(100)
}

fn deserialize_percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(0, 100) as u8)
}

/// Aggregate counts over every project in a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatistics {
    pub total_projects: usize,
    pub completed_projects: usize,
    pub in_progress_projects: usize,
    pub not_started_projects: usize,
    pub average_completion: f64,
}
