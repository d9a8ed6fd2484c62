use super::{GeneratedTestCases, RequirementFlows, TestCaseRequest};
use crate::domain::analysis::{
    CompletenessValidation, ComplianceOutcome, ImpactAnalysis, MissingElement, ValidationOutcome,
};
use crate::domain::error::{AppError, Result};
use crate::domain::project::ProjectDetails;
use crate::domain::scenario::TestCase;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Scripted collaborator for tests: records every call and fails or blocks
/// on demand.
#[derive(Default)]
pub(crate) struct ScriptedFlows {
    pub(crate) fail_validation: AtomicBool,
    pub(crate) fail_compliance: AtomicBool,
    pub(crate) fail_generation: AtomicBool,
    pub(crate) fail_impact: AtomicBool,
    pub(crate) test_cases: Mutex<Vec<TestCase>>,
    calls: Mutex<Vec<String>>,
    generation_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedFlows {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn with_test_cases(cases: Vec<TestCase>) -> Arc<Self> {
        let flows = Self::default();
        *flows.test_cases.lock().unwrap() = cases;
        Arc::new(flows)
    }

    /// Makes every generation call wait for a permit on the returned gate.
    pub(crate) fn hold_generation(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.generation_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn failure(flag: &AtomicBool, flow: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(AppError::LLMError(format!("{} unavailable", flow)));
        }
        Ok(())
    }
}

pub(crate) fn incomplete_validation() -> ValidationOutcome {
    ValidationOutcome {
        completeness_validation: CompletenessValidation {
            is_valid: false,
            missing_elements: vec![MissingElement {
                element: "Error handling".to_string(),
                reason: "No behaviour defined for failed logins".to_string(),
            }],
        },
    }
}

#[async_trait]
impl RequirementFlows for ScriptedFlows {
    async fn validate_requirements(&self, requirements: &str) -> Result<ValidationOutcome> {
        self.record(format!("validate:{}", requirements));
        Self::failure(&self.fail_validation, "validation")?;
        Ok(incomplete_validation())
    }

    async fn compliance_check(
        &self,
        requirements: &str,
        compliance_standards: &str,
    ) -> Result<ComplianceOutcome> {
        self.record(format!("compliance:{}|{}", compliance_standards, requirements));
        Self::failure(&self.fail_compliance, "compliance")?;
        Ok(ComplianceOutcome {
            compliance_report: format!("Reviewed against {}", compliance_standards),
            suggestions: "Add an audit trail".to_string(),
        })
    }

    async fn generate_test_cases(&self, request: &TestCaseRequest) -> Result<GeneratedTestCases> {
        self.record(format!(
            "generate:{}|{}|{}",
            request.scenario,
            request.compliance_standards.join(","),
            request.priority
        ));
        let gate = self.generation_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire()
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?
                .forget();
        }
        Self::failure(&self.fail_generation, "generation")?;
        Ok(GeneratedTestCases {
            test_cases: self.test_cases.lock().unwrap().clone(),
        })
    }

    async fn analyze_impact_on_change(
        &self,
        requirement_changes: &str,
        existing_test_cases: &str,
    ) -> Result<ImpactAnalysis> {
        self.record(format!("impact:{}|{}", requirement_changes, existing_test_cases));
        Self::failure(&self.fail_impact, "impact analysis")?;
        Ok(ImpactAnalysis {
            impact_analysis: "Existing test cases no longer match the scenario.".to_string(),
        })
    }

    async fn parse_project_details(&self, requirements: &str) -> Result<ProjectDetails> {
        self.record(format!("project:{}", requirements));
        Ok(ProjectDetails {
            app_name: "Patient Portal".to_string(),
            objective: "Let patients book visits".to_string(),
            features: vec!["Booking".to_string()],
            tech_stack: vec!["Rust".to_string()],
        })
    }
}
