use crate::domain::scenario::{Priority, RequirementProvenance, ScenarioDraft};
use once_cell::sync::Lazy;
use regex::Regex;

pub const HANDOFF_SOURCE: &str = "analysis-handoff";
const MAX_TITLE_CHARS: usize = 80;

static REQUIREMENT_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*][ \t]+)?([A-Za-z]{1,8})-(\d{1,6})[ \t]*:[ \t]*(\S.*?)[ \t]*$")
        .expect("requirement line pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementType {
    Functional,
    NonFunctional,
    Security,
    Interface,
    General,
}

impl RequirementType {
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix.to_ascii_uppercase().as_str() {
            "FR" | "REQ" => RequirementType::Functional,
            "NFR" => RequirementType::NonFunctional,
            "SEC" => RequirementType::Security,
            "UI" => RequirementType::Interface,
            _ => RequirementType::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::Functional => "functional",
            RequirementType::NonFunctional => "non-functional",
            RequirementType::Security => "security",
            RequirementType::Interface => "interface",
            RequirementType::General => "general",
        }
    }

    fn priority(&self) -> Priority {
        match self {
            RequirementType::Security => Priority::High,
            _ => Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequirement {
    pub id: String,
    pub kind: RequirementType,
    pub text: String,
}

impl ParsedRequirement {
    pub fn provenance(&self) -> RequirementProvenance {
        RequirementProvenance {
            requirement_id: self.id.clone(),
            requirement_type: self.kind.as_str().to_string(),
            requirement_source: HANDOFF_SOURCE.to_string(),
        }
    }

    pub fn draft(&self) -> ScenarioDraft {
        ScenarioDraft::new(
            &format!("{}: {}", self.id, title_from(&self.text)),
            &self.text,
            self.kind.priority(),
        )
    }
}

/// Finds `PREFIX-n: text` lines, first occurrence of each id wins.
pub fn parse_requirements(text: &str) -> Vec<ParsedRequirement> {
    let mut parsed: Vec<ParsedRequirement> = Vec::new();
    for captures in REQUIREMENT_LINE_PATTERN.captures_iter(text) {
        let prefix = captures[1].to_ascii_uppercase();
        let id = format!("{}-{}", prefix, &captures[2]);
        if parsed.iter().any(|requirement| requirement.id == id) {
            continue;
        }
        parsed.push(ParsedRequirement {
            kind: RequirementType::from_prefix(&prefix),
            text: captures[3].to_string(),
            id,
        });
    }
    parsed
}

fn title_from(text: &str) -> String {
    let sentence = text
        .split_terminator(['.', ';'])
        .next()
        .unwrap_or(text)
        .trim();
    if sentence.chars().count() <= MAX_TITLE_CHARS {
        return sentence.to_string();
    }
    let mut title: String = sentence.chars().take(MAX_TITLE_CHARS).collect();
    title.push_str("...");
    title
}
