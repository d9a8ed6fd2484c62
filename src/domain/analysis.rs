use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceStandard {
    #[serde(rename = "FDA")]
    Fda,
    #[serde(rename = "GDPR")]
    Gdpr,
    #[serde(rename = "ISO")]
    Iso13485,
    #[serde(rename = "HIPAA")]
    Hipaa,
}

impl ComplianceStandard {
    pub const ALL: [ComplianceStandard; 4] = [
        ComplianceStandard::Fda,
        ComplianceStandard::Gdpr,
        ComplianceStandard::Iso13485,
        ComplianceStandard::Hipaa,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ComplianceStandard::Fda => "FDA",
            ComplianceStandard::Gdpr => "GDPR",
            ComplianceStandard::Iso13485 => "ISO",
            ComplianceStandard::Hipaa => "HIPAA",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComplianceStandard::Iso13485 => "ISO 13485",
            other => other.id(),
        }
    }
}

/// Standards applied when generating test cases for a scenario.
pub const DEFAULT_GENERATION_STANDARDS: [ComplianceStandard; 2] =
    [ComplianceStandard::Fda, ComplianceStandard::Gdpr];

pub fn join_standards(standards: &[ComplianceStandard]) -> String {
    standards
        .iter()
        .map(|standard| standard.id())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingElement {
    pub element: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessValidation {
    pub is_valid: bool,
    #[serde(default)]
    pub missing_elements: Vec<MissingElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub completeness_validation: CompletenessValidation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceOutcome {
    pub compliance_report: String,
    pub suggestions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactAnalysis {
    pub impact_analysis: String,
}

/// Both analysis outcomes; never constructed with only one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub validation: ValidationOutcome,
    pub compliance: ComplianceOutcome,
}

/// What the requirements flow hands to the scenario flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisHandoff {
    pub validation: ValidationOutcome,
    pub compliance: ComplianceOutcome,
    pub requirements: String,
}

impl AnalysisHandoff {
    pub fn new(result: AnalysisResult, requirements: String) -> Self {
        Self {
            validation: result.validation,
            compliance: result.compliance,
            requirements,
        }
    }
}
