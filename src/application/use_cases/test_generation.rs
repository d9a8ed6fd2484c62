use crate::application::use_cases::flows::{RequirementFlows, TestCaseRequest};
use crate::domain::analysis::DEFAULT_GENERATION_STANDARDS;
use crate::domain::error::Result;
use crate::domain::scenario::{Scenario, TestCase};
use std::sync::Arc;
use tracing::debug;

/// Stateless bridge between a scenario and the test-case generator.
#[derive(Clone)]
pub struct TestCaseGenerator {
    flows: Arc<dyn RequirementFlows + Send + Sync>,
}

impl TestCaseGenerator {
    pub fn new(flows: Arc<dyn RequirementFlows + Send + Sync>) -> Self {
        Self { flows }
    }

    pub async fn generate(&self, scenario: &Scenario) -> Result<Vec<TestCase>> {
        let request = build_request(scenario);
        let generated = self.flows.generate_test_cases(&request).await?;
        debug!(
            scenario_id = %scenario.id,
            count = generated.test_cases.len(),
            "Test cases generated"
        );
        Ok(normalize_test_cases(generated.test_cases))
    }
}

pub fn build_request(scenario: &Scenario) -> TestCaseRequest {
    TestCaseRequest {
        scenario: scenario.description.clone(),
        compliance_standards: DEFAULT_GENERATION_STANDARDS
            .iter()
            .map(|standard| standard.id().to_string())
            .collect(),
        priority: scenario.priority,
    }
}

/// Fills blank ids with `TC-<position>`; everything else is kept as returned.
fn normalize_test_cases(cases: Vec<TestCase>) -> Vec<TestCase> {
    cases
        .into_iter()
        .enumerate()
        .map(|(index, mut case)| {
            if case.test_case_id.trim().is_empty() {
                case.test_case_id = format!("TC-{}", index + 1);
            }
            case
        })
        .collect()
}
