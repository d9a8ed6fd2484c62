//! Scenario list with test-case generation and impact-checked edits.
//!
//! Collaborator calls are awaited with no lock held; when they resolve the
//! target scenario is looked up again by id, so deletes and edits that
//! happened in the meantime are respected.

use crate::application::use_cases::flows::RequirementFlows;
use crate::application::use_cases::requirement_parser::parse_requirements;
use crate::application::use_cases::test_generation::TestCaseGenerator;
use crate::domain::analysis::AnalysisHandoff;
use crate::domain::error::{AppError, Result};
use crate::domain::scenario::{Scenario, ScenarioDraft, ScenarioId, TestCase};
use crate::shared::notifications::Notifications;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EditOutcome {
    /// No test cases were at stake, the edit is in place.
    Applied { scenario: Scenario },
    /// Held until `confirm_edit` or `cancel_edit`.
    #[serde(rename_all = "camelCase")]
    PendingImpact {
        scenario_id: ScenarioId,
        analysis: String,
    },
    /// Impact analysis failed; the edit went in with test cases kept.
    AppliedWithoutAnalysis { scenario: Scenario },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum GenerationOutcome {
    Generated { scenario: Scenario },
    AlreadyRunning,
    /// The scenario was edited while generating; the result was dropped.
    Discarded { scenario: Scenario },
}

#[derive(Debug, Clone)]
struct PendingEdit {
    draft: ScenarioDraft,
    analysis: String,
}

#[derive(Default)]
struct StoreState {
    scenarios: Vec<Scenario>,
    pending_edits: HashMap<ScenarioId, PendingEdit>,
    last_id_millis: i64,
}

impl StoreState {
    fn find_mut(&mut self, id: &ScenarioId) -> Result<&mut Scenario> {
        self.scenarios
            .iter_mut()
            .find(|scenario| &scenario.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn next_id(&mut self) -> ScenarioId {
        let millis = Utc::now().timestamp_millis().max(self.last_id_millis + 1);
        self.last_id_millis = millis;
        ScenarioId::from_millis(millis)
    }
}

fn not_found(id: &ScenarioId) -> AppError {
    AppError::NotFound(format!("Scenario {}", id))
}

/// Clears the generating flag if generation ends without reaching the
/// final bookkeeping, e.g. when the caller's future is dropped.
struct GeneratingGuard<'a> {
    state: &'a Mutex<StoreState>,
    id: ScenarioId,
    armed: bool,
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Ok(scenario) = state.find_mut(&self.id) {
            scenario.are_tests_generating = false;
        }
    }
}

pub struct ScenarioStore {
    state: Mutex<StoreState>,
    flows: Arc<dyn RequirementFlows + Send + Sync>,
    generator: TestCaseGenerator,
    notifications: Notifications,
}

impl ScenarioStore {
    pub fn new(flows: Arc<dyn RequirementFlows + Send + Sync>, notifications: Notifications) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            generator: TestCaseGenerator::new(flows.clone()),
            flows,
            notifications,
        }
    }

    pub fn list(&self) -> Vec<Scenario> {
        self.lock().scenarios.clone()
    }

    pub fn get(&self, id: &ScenarioId) -> Result<Scenario> {
        self.lock().find_mut(id).map(|scenario| scenario.clone())
    }

    pub fn pending_analysis(&self, id: &ScenarioId) -> Option<String> {
        self.lock()
            .pending_edits
            .get(id)
            .map(|pending| pending.analysis.clone())
    }

    pub fn add(&self, draft: ScenarioDraft) -> Result<Scenario> {
        let draft = draft.normalized()?;
        let scenario = {
            let mut state = self.lock();
            let scenario = Scenario::new(state.next_id(), draft);
            state.scenarios.push(scenario.clone());
            scenario
        };

        info!(scenario_id = %scenario.id, "Scenario added");
        let message = format!("Scenario \"{}\" has been created.", scenario.title);
        self.notifications.success("Scenario Added", Some(message.as_str()));
        Ok(scenario)
    }

    pub async fn edit(&self, id: &ScenarioId, draft: ScenarioDraft) -> Result<EditOutcome> {
        let draft = draft.normalized()?;

        let (previous, test_cases) = {
            let mut state = self.lock();
            let scenario = state.find_mut(id)?;
            if scenario.test_cases.is_empty() {
                scenario.apply(draft);
                let scenario = scenario.clone();
                drop(state);
                self.notifications.success("Scenario Updated", None);
                return Ok(EditOutcome::Applied { scenario });
            }
            (scenario.draft(), scenario.test_cases.clone())
        };

        let changes = describe_change(&previous, &draft);
        let existing = summarize_test_cases(&test_cases);
        let impact = self.flows.analyze_impact_on_change(&changes, &existing).await;

        let mut state = self.lock();
        match impact {
            Ok(impact) => {
                state.find_mut(id)?;
                state.pending_edits.insert(
                    id.clone(),
                    PendingEdit {
                        draft,
                        analysis: impact.impact_analysis.clone(),
                    },
                );
                debug!(scenario_id = %id, "Edit held for impact confirmation");
                Ok(EditOutcome::PendingImpact {
                    scenario_id: id.clone(),
                    analysis: impact.impact_analysis,
                })
            }
            Err(e) => {
                error!(error = %e, scenario_id = %id, "Impact analysis failed, applying edit");
                let scenario = state.find_mut(id)?;
                scenario.apply(draft);
                let scenario = scenario.clone();
                drop(state);
                self.notifications
                    .error("Impact Analysis Failed", Some(e.to_string().as_str()));
                Ok(EditOutcome::AppliedWithoutAnalysis { scenario })
            }
        }
    }

    /// Applies the held edit and drops the invalidated test cases.
    pub fn confirm_edit(&self, id: &ScenarioId) -> Result<Scenario> {
        let scenario = {
            let mut state = self.lock();
            state.find_mut(id)?;
            let pending = state
                .pending_edits
                .remove(id)
                .ok_or_else(|| AppError::NotFound(format!("Pending edit for {}", id)))?;
            let scenario = state.find_mut(id)?;
            scenario.apply(pending.draft);
            scenario.test_cases.clear();
            scenario.clone()
        };

        info!(scenario_id = %id, "Edit confirmed, test cases cleared");
        self.notifications.success(
            "Scenario Updated",
            Some("Test cases have been cleared due to changes."),
        );
        Ok(scenario)
    }

    pub fn cancel_edit(&self, id: &ScenarioId) -> Result<Scenario> {
        let mut state = self.lock();
        let scenario = state.find_mut(id)?.clone();
        state
            .pending_edits
            .remove(id)
            .ok_or_else(|| AppError::NotFound(format!("Pending edit for {}", id)))?;
        debug!(scenario_id = %id, "Pending edit discarded");
        Ok(scenario)
    }

    pub fn delete(&self, id: &ScenarioId) -> Result<Scenario> {
        let removed = {
            let mut state = self.lock();
            let index = state
                .scenarios
                .iter()
                .position(|scenario| &scenario.id == id)
                .ok_or_else(|| not_found(id))?;
            state.pending_edits.remove(id);
            state.scenarios.remove(index)
        };

        info!(scenario_id = %id, test_cases = removed.test_cases.len(), "Scenario deleted");
        self.notifications.success("Scenario Deleted", None);
        Ok(removed)
    }

    /// Replaces the scenario's test cases with freshly generated ones. A
    /// call for a scenario that is already generating does nothing.
    pub async fn generate_test_cases(&self, id: &ScenarioId) -> Result<GenerationOutcome> {
        let scenario = {
            let mut state = self.lock();
            let scenario = state.find_mut(id)?;
            if scenario.are_tests_generating {
                debug!(scenario_id = %id, "Generation already running");
                return Ok(GenerationOutcome::AlreadyRunning);
            }
            scenario.are_tests_generating = true;
            scenario.clone()
        };
        let mut guard = GeneratingGuard {
            state: &self.state,
            id: id.clone(),
            armed: true,
        };

        let generated = self.generator.generate(&scenario).await;

        let mut state = self.lock();
        guard.armed = false;
        let Ok(target) = state.find_mut(id) else {
            debug!(scenario_id = %id, "Scenario deleted during generation, dropping result");
            return Err(not_found(id));
        };
        target.are_tests_generating = false;

        if target.draft() != scenario.draft() {
            let current = target.clone();
            drop(state);
            info!(scenario_id = %id, "Scenario edited during generation, dropping result");
            self.notifications.info(
                "Test Cases Discarded",
                Some("Scenario changed while tests were generating."),
            );
            return Ok(GenerationOutcome::Discarded { scenario: current });
        }

        match generated {
            Ok(test_cases) => {
                target.test_cases = test_cases;
                let scenario = target.clone();
                drop(state);
                info!(scenario_id = %id, count = scenario.test_cases.len(), "Test cases stored");
                Ok(GenerationOutcome::Generated { scenario })
            }
            Err(e) => {
                drop(state);
                error!(error = %e, scenario_id = %id, "Test case generation failed");
                self.notifications
                    .error("Test Case Generation Failed", Some(e.to_string().as_str()));
                Err(e)
            }
        }
    }

    /// Creates one scenario per requirement line of the hand-off. Requirement
    /// ids that were imported before are skipped.
    pub fn import_requirements(&self, handoff: &AnalysisHandoff) -> Result<Vec<Scenario>> {
        let requirements = parse_requirements(&handoff.requirements);
        if requirements.is_empty() {
            return Err(AppError::ValidationError(
                "No requirement lines found in the analyzed text".to_string(),
            ));
        }

        let created = {
            let mut state = self.lock();
            let mut created = Vec::new();
            for requirement in requirements {
                let already_imported = state.scenarios.iter().any(|scenario| {
                    scenario
                        .provenance
                        .as_ref()
                        .map(|provenance| provenance.requirement_id == requirement.id)
                        .unwrap_or(false)
                });
                if already_imported {
                    continue;
                }
                let draft = match requirement.draft().normalized() {
                    Ok(draft) => draft,
                    Err(e) => {
                        debug!(requirement_id = %requirement.id, error = %e, "Skipping requirement");
                        continue;
                    }
                };
                let mut scenario = Scenario::new(state.next_id(), draft);
                scenario.provenance = Some(requirement.provenance());
                state.scenarios.push(scenario.clone());
                created.push(scenario);
            }
            created
        };

        info!(count = created.len(), "Requirements imported");
        let message = format!("{} scenarios created.", created.len());
        self.notifications
            .success("Requirements Imported", Some(message.as_str()));
        Ok(created)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn describe_change(previous: &ScenarioDraft, next: &ScenarioDraft) -> String {
    format!(
        "Title changed from \"{}\" to \"{}\". Description changed from \"{}\" to \"{}\".",
        previous.title, next.title, previous.description, next.description
    )
}

pub fn summarize_test_cases(test_cases: &[TestCase]) -> String {
    test_cases
        .iter()
        .map(|case| format!("ID: {}, Title: {}", case.test_case_id, case.title))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::flows::mock::ScriptedFlows;
    use crate::domain::analysis::{AnalysisResult, ComplianceOutcome};
    use crate::domain::notification::NotificationLevel;
    use crate::domain::scenario::Priority;
    use std::sync::atomic::Ordering;

    fn two_cases() -> Vec<TestCase> {
        vec![
            TestCase::new("TC-1", "Valid credentials", "High"),
            TestCase::new("TC-2", "Wrong password", "Medium"),
        ]
    }

    fn store(flows: Arc<ScriptedFlows>) -> (Arc<ScenarioStore>, Notifications) {
        let notifications = Notifications::new();
        (
            Arc::new(ScenarioStore::new(flows, notifications.clone())),
            notifications,
        )
    }

    fn login() -> ScenarioDraft {
        ScenarioDraft::new("Login", "desc", Priority::High)
    }

    async fn with_generated_cases(store: &ScenarioStore) -> ScenarioId {
        let id = store.add(login()).unwrap().id;
        store.generate_test_cases(&id).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_login_scenario_gets_generated_cases() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let (store, _) = store(flows.clone());

        let added = store.add(login()).unwrap();
        let listed = store.list();
        assert_eq!(listed.len(), 1);
        assert!(added.id.as_str().starts_with("SCN-"));
        assert!(listed[0].test_cases.is_empty());
        assert!(!listed[0].are_tests_generating);

        let outcome = store.generate_test_cases(&added.id).await.unwrap();
        let GenerationOutcome::Generated { scenario } = outcome else {
            panic!("expected generated outcome");
        };
        assert_eq!(scenario.test_cases, two_cases());
        assert!(!scenario.are_tests_generating);
        assert_eq!(store.get(&added.id).unwrap().test_cases, two_cases());
        assert_eq!(flows.calls(), vec!["generate:desc|FDA,GDPR|High".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_title_is_rejected() {
        let (store, _) = store(ScriptedFlows::new());
        let err = store
            .add(ScenarioDraft::new(" ", "desc", Priority::Low))
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(store.list().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_increasing() {
        let (store, _) = store(ScriptedFlows::new());
        let ids: Vec<i64> = (0..20)
            .map(|_| {
                let id = store.add(login()).unwrap().id;
                id.as_str().trim_start_matches("SCN-").parse().unwrap()
            })
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_second_generation_while_pending_is_noop() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let gate = flows.hold_generation();
        let (store, _) = store(flows.clone());
        let id = store.add(login()).unwrap().id;

        let first = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.generate_test_cases(&id).await })
        };
        while flows.count("generate:") == 0 {
            tokio::task::yield_now().await;
        }
        assert!(store.get(&id).unwrap().are_tests_generating);

        let second = store.generate_test_cases(&id).await.unwrap();
        assert_eq!(second, GenerationOutcome::AlreadyRunning);
        assert!(store.get(&id).unwrap().are_tests_generating);
        assert_eq!(flows.count("generate:"), 1);

        gate.add_permits(1);
        first.await.unwrap().unwrap();
        assert!(!store.get(&id).unwrap().are_tests_generating);
        assert_eq!(flows.count("generate:"), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_cases_and_resets_flag() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let (store, notifications) = store(flows.clone());
        let id = with_generated_cases(&store).await;

        flows.fail_generation.store(true, Ordering::SeqCst);
        let err = store.generate_test_cases(&id).await.unwrap_err();

        assert!(matches!(err, AppError::LLMError(_)));
        let scenario = store.get(&id).unwrap();
        assert_eq!(scenario.test_cases, two_cases());
        assert!(!scenario.are_tests_generating);
        let last = notifications.last().unwrap();
        assert_eq!(last.level, NotificationLevel::Error);
        assert_eq!(last.title, "Test Case Generation Failed");
    }

    #[tokio::test]
    async fn test_different_scenarios_generate_concurrently() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let gate = flows.hold_generation();
        let (store, _) = store(flows.clone());
        let first = store.add(login()).unwrap().id;
        let second = store
            .add(ScenarioDraft::new("Logout", "bye", Priority::Low))
            .unwrap()
            .id;

        let tasks: Vec<_> = [first.clone(), second.clone()]
            .into_iter()
            .map(|id| {
                let store = store.clone();
                tokio::spawn(async move { store.generate_test_cases(&id).await })
            })
            .collect();
        while flows.count("generate:") < 2 {
            tokio::task::yield_now().await;
        }
        assert!(store.get(&first).unwrap().are_tests_generating);
        assert!(store.get(&second).unwrap().are_tests_generating);

        gate.add_permits(2);
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert!(store.list().iter().all(|s| s.test_cases.len() == 2));
    }

    #[tokio::test]
    async fn test_result_dropped_when_scenario_deleted_mid_generation() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let gate = flows.hold_generation();
        let (store, _) = store(flows.clone());
        let id = store.add(login()).unwrap().id;

        let pending = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.generate_test_cases(&id).await })
        };
        while flows.count("generate:") == 0 {
            tokio::task::yield_now().await;
        }
        store.delete(&id).unwrap();
        gate.add_permits(1);

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.list().is_empty());
    }

    #[tokio::test]
    async fn test_result_discarded_when_scenario_edited_mid_generation() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let (store, notifications) = store(flows.clone());
        let id = with_generated_cases(&store).await;
        let gate = flows.hold_generation();

        let pending = {
            let store = store.clone();
            let id = id.clone();
            tokio::spawn(async move { store.generate_test_cases(&id).await })
        };
        while flows.count("generate:") < 2 {
            tokio::task::yield_now().await;
        }
        let outcome = store
            .edit(&id, ScenarioDraft::new("Sign in", "new desc", Priority::Low))
            .await
            .unwrap();
        assert!(matches!(outcome, EditOutcome::PendingImpact { .. }));
        store.confirm_edit(&id).unwrap();
        gate.add_permits(1);

        let outcome = pending.await.unwrap().unwrap();
        let GenerationOutcome::Discarded { scenario } = outcome else {
            panic!("expected discarded outcome");
        };
        assert_eq!(scenario.title, "Sign in");
        assert!(scenario.test_cases.is_empty());
        assert!(!scenario.are_tests_generating);
        assert_eq!(store.get(&id).unwrap(), scenario);
        let last = notifications.last().unwrap();
        assert_eq!(last.level, NotificationLevel::Info);
        assert_eq!(last.title, "Test Cases Discarded");
    }

    #[tokio::test]
    async fn test_edit_without_cases_skips_impact_analysis() {
        let flows = ScriptedFlows::new();
        let (store, _) = store(flows.clone());
        let id = store.add(login()).unwrap().id;

        let outcome = store
            .edit(&id, ScenarioDraft::new("Sign in", "new desc", Priority::Low))
            .await
            .unwrap();

        let EditOutcome::Applied { scenario } = outcome else {
            panic!("expected applied outcome");
        };
        assert_eq!(scenario.title, "Sign in");
        assert_eq!(scenario.priority, Priority::Low);
        assert_eq!(flows.count("impact:"), 0);
    }

    #[tokio::test]
    async fn test_confirmed_edit_applies_and_clears_cases() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let (store, notifications) = store(flows.clone());
        let id = with_generated_cases(&store).await;

        let outcome = store
            .edit(&id, ScenarioDraft::new("Sign in", "new desc", Priority::Low))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            EditOutcome::PendingImpact {
                scenario_id: id.clone(),
                analysis: "Existing test cases no longer match the scenario.".to_string(),
            }
        );
        assert_eq!(store.get(&id).unwrap().title, "Login");
        assert_eq!(
            flows.calls().last().unwrap(),
            "impact:Title changed from \"Login\" to \"Sign in\". Description changed from \"desc\" to \"new desc\".|ID: TC-1, Title: Valid credentials\nID: TC-2, Title: Wrong password"
        );

        let scenario = store.confirm_edit(&id).unwrap();
        assert_eq!(scenario.title, "Sign in");
        assert_eq!(scenario.description, "new desc");
        assert_eq!(scenario.priority, Priority::Low);
        assert!(scenario.test_cases.is_empty());
        assert_eq!(
            notifications.last().unwrap().description.as_deref(),
            Some("Test cases have been cleared due to changes.")
        );
        assert!(store.pending_analysis(&id).is_none());
    }

    #[tokio::test]
    async fn test_cancelled_edit_leaves_scenario_untouched() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let (store, _) = store(flows.clone());
        let id = with_generated_cases(&store).await;
        let before = store.get(&id).unwrap();

        store
            .edit(&id, ScenarioDraft::new("Sign in", "new desc", Priority::Low))
            .await
            .unwrap();
        assert!(store.pending_analysis(&id).is_some());

        let after = store.cancel_edit(&id).unwrap();
        assert_eq!(after, before);
        assert_eq!(store.get(&id).unwrap(), before);
        assert!(matches!(store.confirm_edit(&id), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_impact_failure_applies_edit_and_keeps_cases() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let (store, notifications) = store(flows.clone());
        let id = with_generated_cases(&store).await;
        flows.fail_impact.store(true, Ordering::SeqCst);

        let outcome = store
            .edit(&id, ScenarioDraft::new("Sign in", "desc", Priority::High))
            .await
            .unwrap();

        let EditOutcome::AppliedWithoutAnalysis { scenario } = outcome else {
            panic!("expected fallback outcome");
        };
        assert_eq!(scenario.title, "Sign in");
        assert_eq!(scenario.test_cases, two_cases());
        assert_eq!(notifications.last().unwrap().title, "Impact Analysis Failed");
    }

    #[tokio::test]
    async fn test_deleted_scenario_cannot_be_targeted() {
        let flows = ScriptedFlows::with_test_cases(two_cases());
        let (store, _) = store(flows.clone());
        let id = with_generated_cases(&store).await;

        let removed = store.delete(&id).unwrap();
        assert_eq!(removed.test_cases.len(), 2);
        assert!(store.list().is_empty());

        assert!(matches!(store.delete(&id), Err(AppError::NotFound(_))));
        assert!(matches!(
            store.edit(&id, login()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.generate_test_cases(&id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(store.cancel_edit(&id), Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_import_creates_scenarios_once() {
        let (store, _) = store(ScriptedFlows::new());
        let handoff = AnalysisHandoff::new(
            AnalysisResult {
                validation: crate::application::use_cases::flows::mock::incomplete_validation(),
                compliance: ComplianceOutcome {
                    compliance_report: "ok".to_string(),
                    suggestions: String::new(),
                },
            },
            "FR-1: Users can log in\nSEC-2: Lock after 5 failures".to_string(),
        );

        let created = store.import_requirements(&handoff).unwrap();
        assert_eq!(created.len(), 2);
        let provenance = created[1].provenance.as_ref().unwrap();
        assert_eq!(provenance.requirement_id, "SEC-2");
        assert_eq!(provenance.requirement_type, "security");

        assert!(store.import_requirements(&handoff).unwrap().is_empty());
        assert_eq!(store.list().len(), 2);
    }
}
