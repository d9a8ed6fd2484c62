use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
}

impl ProjectDetails {
    /// Returns false when the value is blank or already listed.
    pub fn add_feature(&mut self, feature: &str) -> bool {
        push_unique(&mut self.features, feature)
    }

    pub fn add_tech(&mut self, tech: &str) -> bool {
        push_unique(&mut self.tech_stack, tech)
    }

    /// Trimmed copy with blank and repeated list entries dropped.
    pub fn normalized(self) -> Self {
        let mut details = ProjectDetails {
            app_name: self.app_name.trim().to_string(),
            objective: self.objective.trim().to_string(),
            ..ProjectDetails::default()
        };
        for feature in &self.features {
            details.add_feature(feature);
        }
        for tech in &self.tech_stack {
            details.add_tech(tech);
        }
        details
    }
}

fn push_unique(items: &mut Vec<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || items.iter().any(|item| item == value) {
        return false;
    }
    items.push(value.to_string());
    true
}
