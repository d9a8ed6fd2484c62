//! The AI collaborators behind requirement analysis and test design.
//!
//! Everything above this module talks to [`RequirementFlows`] only; the
//! LLM-backed implementation lives in [`llm`].

pub mod llm;
mod llm_output;
#[cfg(test)]
pub(crate) mod mock;
mod prompts;

use crate::domain::analysis::{ComplianceOutcome, ImpactAnalysis, ValidationOutcome};
use crate::domain::error::Result;
use crate::domain::project::ProjectDetails;
use crate::domain::scenario::{Priority, TestCase};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use llm::LlmRequirementFlows;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseRequest {
    pub scenario: String,
    pub compliance_standards: Vec<String>,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTestCases {
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

#[async_trait]
pub trait RequirementFlows {
    async fn validate_requirements(&self, requirements: &str) -> Result<ValidationOutcome>;

    /// `compliance_standards` is the comma-joined list of standard ids.
    async fn compliance_check(
        &self,
        requirements: &str,
        compliance_standards: &str,
    ) -> Result<ComplianceOutcome>;

    async fn generate_test_cases(&self, request: &TestCaseRequest) -> Result<GeneratedTestCases>;

    /// `existing_test_cases` is the formatted summary, one case per line.
    async fn analyze_impact_on_change(
        &self,
        requirement_changes: &str,
        existing_test_cases: &str,
    ) -> Result<ImpactAnalysis>;

    async fn parse_project_details(&self, requirements: &str) -> Result<ProjectDetails>;
}
