use super::llm_output::{extract_json_payload, preview_text};
use super::prompts::{
    build_compliance_user_prompt, build_impact_user_prompt, build_requirements_user_prompt,
    build_test_case_user_prompt, COMPLIANCE_SYSTEM_PROMPT, IMPACT_SYSTEM_PROMPT,
    PROJECT_DETAILS_SYSTEM_PROMPT, TEST_CASE_SYSTEM_PROMPT, VALIDATION_SYSTEM_PROMPT,
};
use super::{GeneratedTestCases, RequirementFlows, TestCaseRequest};
use crate::domain::analysis::{ComplianceOutcome, ImpactAnalysis, ValidationOutcome};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::project::ProjectDetails;
use crate::infrastructure::llm_clients::LLMClient;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

const OUTPUT_SNIPPET_CHARS: usize = 600;

/// Runs every flow as a single JSON-returning LLM call.
pub struct LlmRequirementFlows {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
}

impl LlmRequirementFlows {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>, config: LLMConfig) -> Self {
        Self { llm_client, config }
    }

    async fn run_flow<T: DeserializeOwned>(
        &self,
        flow: &'static str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<T> {
        let started = Instant::now();
        let raw_output = self
            .llm_client
            .generate(&self.config, system_prompt, user_prompt)
            .await
            .map_err(|e| {
                error!(error = %e, flow, model = %self.config.model, "LLM call failed");
                e
            })?;
        debug!(
            flow,
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "LLM call finished"
        );

        let payload = extract_json_payload(&raw_output);
        serde_json::from_str::<T>(&payload).map_err(|err| {
            AppError::ParseError(format!(
                "Failed to parse {} output: {} | output_snippet={}",
                flow,
                err,
                preview_text(&payload, OUTPUT_SNIPPET_CHARS)
            ))
        })
    }
}

#[async_trait]
impl RequirementFlows for LlmRequirementFlows {
    async fn validate_requirements(&self, requirements: &str) -> Result<ValidationOutcome> {
        let user_prompt = build_requirements_user_prompt(requirements);
        self.run_flow("validate_requirements", VALIDATION_SYSTEM_PROMPT, &user_prompt)
            .await
    }

    async fn compliance_check(
        &self,
        requirements: &str,
        compliance_standards: &str,
    ) -> Result<ComplianceOutcome> {
        let user_prompt = build_compliance_user_prompt(requirements, compliance_standards);
        self.run_flow("compliance_check", COMPLIANCE_SYSTEM_PROMPT, &user_prompt)
            .await
    }

    async fn generate_test_cases(&self, request: &TestCaseRequest) -> Result<GeneratedTestCases> {
        let user_prompt = build_test_case_user_prompt(request);
        self.run_flow("generate_test_cases", TEST_CASE_SYSTEM_PROMPT, &user_prompt)
            .await
    }

    async fn analyze_impact_on_change(
        &self,
        requirement_changes: &str,
        existing_test_cases: &str,
    ) -> Result<ImpactAnalysis> {
        let user_prompt = build_impact_user_prompt(requirement_changes, existing_test_cases);
        self.run_flow("analyze_impact_on_change", IMPACT_SYSTEM_PROMPT, &user_prompt)
            .await
    }

    async fn parse_project_details(&self, requirements: &str) -> Result<ProjectDetails> {
        let user_prompt = build_requirements_user_prompt(requirements);
        self.run_flow(
            "parse_project_details",
            PROJECT_DETAILS_SYSTEM_PROMPT,
            &user_prompt,
        )
        .await
    }
}
