use crate::application::use_cases::analysis::AnalysisRequestor;
use crate::application::use_cases::flows::RequirementFlows;
use crate::application::use_cases::ingestion::IngestionCollector;
use crate::application::use_cases::scenario_store::ScenarioStore;
use crate::domain::analysis::{AnalysisHandoff, ComplianceStandard};
use crate::domain::error::{AppError, Result};
use crate::domain::project::ProjectDetails;
use crate::domain::scenario::Scenario;
use crate::shared::notifications::Notifications;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Single owner of the ingestion, analysis and scenario state for one
/// user session. The analysis hand-off travels through here.
pub struct Workspace {
    pub ingestion: IngestionCollector,
    pub analysis: AnalysisRequestor,
    pub scenarios: ScenarioStore,
    pub notifications: Notifications,
    handoff: Mutex<Option<AnalysisHandoff>>,
    project: Mutex<Option<ProjectDetails>>,
}

impl Workspace {
    pub fn new(flows: Arc<dyn RequirementFlows + Send + Sync>, chunk_size: usize) -> Self {
        let notifications = Notifications::new();
        Self {
            ingestion: IngestionCollector::new(chunk_size),
            analysis: AnalysisRequestor::new(flows.clone(), notifications.clone()),
            scenarios: ScenarioStore::new(flows, notifications.clone()),
            notifications,
            handoff: Mutex::new(None),
            project: Mutex::new(None),
        }
    }

    /// Analyzes the combined text of all loaded sources.
    pub async fn analyze(&self, standards: &[ComplianceStandard]) -> Result<AnalysisHandoff> {
        if !self.ingestion.is_ready() {
            self.notifications.error(
                "Sources Loading",
                Some("Some sources are still loading."),
            );
            return Err(AppError::ValidationError(
                "Some sources are still loading.".to_string(),
            ));
        }

        // The previous hand-off never outlives the start of a new analysis.
        *self.lock_handoff() = None;
        let requirements = self.ingestion.combined_text();
        let result = self.analysis.analyze(&requirements, standards).await?;
        let handoff = AnalysisHandoff::new(result, requirements);
        *self.lock_handoff() = Some(handoff.clone());
        info!("Analysis hand-off stored");
        Ok(handoff)
    }

    pub async fn parse_project_details(&self) -> Result<ProjectDetails> {
        let requirements = self.ingestion.combined_text();
        self.analysis.parse_project_details(&requirements).await
    }

    /// Stores the details the user reviewed, replacing earlier ones.
    pub fn confirm_project_details(&self, details: ProjectDetails) -> Result<ProjectDetails> {
        let details = details.normalized();
        if details.app_name.is_empty() {
            return Err(AppError::ValidationError(
                "Application name is required".to_string(),
            ));
        }
        *self
            .project
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(details.clone());
        info!(app_name = %details.app_name, features = details.features.len(), "Project details confirmed");
        self.notifications.success("Project Details Saved", None);
        Ok(details)
    }

    pub fn project_details(&self) -> Option<ProjectDetails> {
        self.project
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn handoff(&self) -> Option<AnalysisHandoff> {
        self.lock_handoff().clone()
    }

    pub fn take_handoff(&self) -> Option<AnalysisHandoff> {
        self.lock_handoff().take()
    }

    /// Turns the stored hand-off into scenarios. The hand-off is kept, so a
    /// failed import can be retried.
    pub fn import_handoff(&self) -> Result<Vec<Scenario>> {
        let handoff = self.handoff().ok_or_else(|| {
            AppError::NotFound("No analysis result to import".to_string())
        })?;
        self.scenarios.import_requirements(&handoff)
    }

    fn lock_handoff(&self) -> MutexGuard<'_, Option<AnalysisHandoff>> {
        self.handoff
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
