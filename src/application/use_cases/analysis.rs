use crate::application::use_cases::flows::RequirementFlows;
use crate::domain::analysis::{join_standards, AnalysisResult, ComplianceStandard};
use crate::domain::error::{AppError, Result};
use crate::domain::project::ProjectDetails;
use crate::shared::notifications::Notifications;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Clears the pending flag on every exit path, including cancellation.
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AnalysisRequestor {
    flows: Arc<dyn RequirementFlows + Send + Sync>,
    notifications: Notifications,
    pending: AtomicBool,
    last_result: Mutex<Option<AnalysisResult>>,
}

impl AnalysisRequestor {
    pub fn new(flows: Arc<dyn RequirementFlows + Send + Sync>, notifications: Notifications) -> Self {
        Self {
            flows,
            notifications,
            pending: AtomicBool::new(false),
            last_result: Mutex::new(None),
        }
    }

    /// Runs completeness validation and the compliance check side by side.
    /// Either both outcomes come back or neither does.
    pub async fn analyze(
        &self,
        requirements: &str,
        standards: &[ComplianceStandard],
    ) -> Result<AnalysisResult> {
        if requirements.trim().is_empty() {
            self.notifications.error(
                "Input Required",
                Some("Please provide some requirements to analyze."),
            );
            return Err(AppError::ValidationError(
                "Requirements text is empty".to_string(),
            ));
        }
        if standards.is_empty() {
            self.notifications.error(
                "Selection Required",
                Some("Please select at least one compliance standard."),
            );
            return Err(AppError::ValidationError(
                "No compliance standard selected".to_string(),
            ));
        }

        if self
            .pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::Conflict(
                "An analysis is already running".to_string(),
            ));
        }
        let _pending = PendingGuard(&self.pending);
        self.set_last_result(None);

        let joined = join_standards(standards);
        info!(standards = %joined, chars = requirements.len(), "Starting requirements analysis");

        let outcome = tokio::try_join!(
            self.flows.validate_requirements(requirements),
            self.flows.compliance_check(requirements, &joined),
        );

        match outcome {
            Ok((validation, compliance)) => {
                let result = AnalysisResult {
                    validation,
                    compliance,
                };
                self.set_last_result(Some(result.clone()));
                self.notifications.success(
                    "Analysis Complete",
                    Some("Requirements have been successfully analyzed."),
                );
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "Requirements analysis failed");
                self.notifications.error(
                    "Analysis Failed",
                    Some("An error occurred during the analysis."),
                );
                Err(e)
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn last_result(&self) -> Option<AnalysisResult> {
        self.last_result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub async fn parse_project_details(&self, requirements: &str) -> Result<ProjectDetails> {
        if requirements.trim().is_empty() {
            self.notifications.error(
                "Input Required",
                Some("Please provide some requirements to analyze."),
            );
            return Err(AppError::ValidationError(
                "Requirements text is empty".to_string(),
            ));
        }

        self.flows.parse_project_details(requirements).await.map_err(|e| {
            error!(error = %e, "Project detail extraction failed");
            self.notifications
                .error("Project Details Failed", Some(e.to_string().as_str()));
            e
        })
    }

    fn set_last_result(&self, result: Option<AnalysisResult>) {
        *self
            .last_result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = result;
    }
}
