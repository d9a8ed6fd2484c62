use crate::domain::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(String);

impl ScenarioId {
    pub fn from_millis(millis: i64) -> Self {
        Self(format!("SCN-{}", millis))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ScenarioId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ScenarioId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated test case. Only id, title and priority are interpreted;
/// everything else the generator returns is carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub test_case_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub priority: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl TestCase {
    pub fn new(test_case_id: &str, title: &str, priority: &str) -> Self {
        Self {
            test_case_id: test_case_id.to_string(),
            title: title.to_string(),
            priority: priority.to_string(),
            details: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementProvenance {
    pub requirement_id: String,
    pub requirement_type: String,
    pub requirement_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub test_cases: Vec<TestCase>,
    pub are_tests_generating: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<RequirementProvenance>,
}

impl Scenario {
    pub fn new(id: ScenarioId, draft: ScenarioDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            test_cases: Vec::new(),
            are_tests_generating: false,
            provenance: None,
        }
    }

    pub fn apply(&mut self, draft: ScenarioDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.priority = draft.priority;
    }

    pub fn draft(&self) -> ScenarioDraft {
        ScenarioDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
        }
    }
}

/// User-entered scenario fields, used for both add and edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ScenarioDraft {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 8192))]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
}

impl ScenarioDraft {
    pub fn new(title: &str, description: &str, priority: Priority) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            priority,
        }
    }

    /// Trims both text fields and checks them.
    pub fn normalized(self) -> Result<Self> {
        let draft = Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            priority: self.priority,
        };
        draft.validate()?;
        Ok(draft)
    }
}
