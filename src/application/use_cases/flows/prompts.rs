use super::TestCaseRequest;

pub(crate) const VALIDATION_SYSTEM_PROMPT: &str = "You are a senior requirements analyst. Check the software requirements for completeness: functional behaviour, user roles, data handling, error handling, security, performance and acceptance criteria. Return JSON: {\"completenessValidation\": {\"isValid\": boolean, \"missingElements\": [{\"element\": string, \"reason\": string}]}}. missingElements must be empty when isValid is true. Return only JSON.";

pub(crate) const COMPLIANCE_SYSTEM_PROMPT: &str = "You are a regulatory compliance auditor for healthcare and life-science software. Assess the requirements against the listed compliance standards. Return JSON: {\"complianceReport\": string, \"suggestions\": string}. complianceReport states which obligations are met or violated; suggestions lists concrete improvements. Return only JSON.";

pub(crate) const TEST_CASE_SYSTEM_PROMPT: &str = "You are a QA engineer for regulated software. Generate test cases for the scenario, covering positive, negative and compliance-driven checks. Return JSON: {\"testCases\": [{\"testCaseId\": string, \"title\": string, \"priority\": \"High\"|\"Medium\"|\"Low\", \"description\": string, \"steps\": [string], \"expectedResult\": string, \"complianceStandards\": [string]}]}. Return only JSON.";

pub(crate) const IMPACT_SYSTEM_PROMPT: &str = "You are a QA lead. Given a change to a test scenario and its existing test cases, explain which test cases are invalidated, which need updates and which remain valid. Return JSON: {\"impactAnalysis\": string}. Return only JSON.";

pub(crate) const PROJECT_DETAILS_SYSTEM_PROMPT: &str = "You extract project facts from software requirements. Return JSON: {\"appName\": string, \"objective\": string, \"features\": [string], \"techStack\": [string]}. Use empty strings or lists when a fact is not stated. Return only JSON.";

pub(crate) fn build_requirements_user_prompt(requirements: &str) -> String {
    format!("Requirements:\n{}\n", requirements.trim())
}

pub(crate) fn build_compliance_user_prompt(requirements: &str, standards: &str) -> String {
    let mut body = String::new();
    body.push_str(&format!("Compliance standards: {}\n", standards));
    body.push_str("\nRequirements:\n");
    body.push_str(requirements.trim());
    body.push('\n');
    body
}

pub(crate) fn build_test_case_user_prompt(request: &TestCaseRequest) -> String {
    let mut body = String::new();
    body.push_str(&format!("Scenario priority: {}\n", request.priority));
    if !request.compliance_standards.is_empty() {
        body.push_str(&format!(
            "Compliance standards: {}\n",
            request.compliance_standards.join(", ")
        ));
    }
    body.push_str("\nScenario:\n");
    body.push_str(request.scenario.trim());
    body.push('\n');
    body
}

pub(crate) fn build_impact_user_prompt(changes: &str, existing_test_cases: &str) -> String {
    let mut body = String::new();
    body.push_str("Requirement changes:\n");
    body.push_str(changes.trim());
    body.push_str("\n\nExisting test cases:\n");
    if existing_test_cases.trim().is_empty() {
        body.push_str("(none)\n");
    } else {
        body.push_str(existing_test_cases.trim());
        body.push('\n');
    }
    body
}
