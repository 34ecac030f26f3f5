// System prompts for resume analysis, one per seniority profile.
// Each full prompt is a persona fragment followed by the shared output contract.

use std::str::FromStr;

/// Fragment that enforces JSON-only output.
const JSON_ONLY: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Output contract shared by every analysis profile.
const OUTPUT_SHAPE: &str = "Return an object with the keys \
    \"experience\" (array of {company, position, period, responsibilities}), \
    \"skills\" (array of strings), \
    \"assessment\" (short free-text summary) and \
    \"recommendations\" (array of strings). \
    Use only facts present in the resume. If something is missing, leave the field empty; \
    never invent employers, dates or skills.";

const BASE_ANALYSIS: &str = concat!(
    "You are an experienced HR specialist reviewing a candidate resume. ",
    "Summarise the candidate's work experience and skills. "
);

const JUNIOR_ANALYSIS: &str = concat!(
    "You are an HR specialist screening candidates for a junior position. ",
    "Focus on education, internships, pet projects and learning ability; ",
    "do not penalise a short work history. "
);

const MIDDLE_ANALYSIS: &str = concat!(
    "You are an HR specialist screening candidates for a middle-level position. ",
    "Focus on hands-on commercial experience, the technology stack used in practice ",
    "and evidence of independent delivery. "
);

const SENIOR_ANALYSIS: &str = concat!(
    "You are an HR specialist screening candidates for a senior position. ",
    "Focus on ownership of architecture decisions, mentoring, leadership, ",
    "measurable impact and depth of expertise. "
);

/// Which analysis profile to run a resume through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptType {
    #[default]
    BaseAnalysis,
    JuniorAnalysis,
    MiddleAnalysis,
    SeniorAnalysis,
}

impl PromptType {
    /// Full system prompt for this profile.
    pub fn system_prompt(self) -> String {
        let persona = match self {
            PromptType::BaseAnalysis => BASE_ANALYSIS,
            PromptType::JuniorAnalysis => JUNIOR_ANALYSIS,
            PromptType::MiddleAnalysis => MIDDLE_ANALYSIS,
            PromptType::SeniorAnalysis => SENIOR_ANALYSIS,
        };
        format!("{persona}{OUTPUT_SHAPE} {JSON_ONLY}")
    }
}

impl FromStr for PromptType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BASE_ANALYSIS" => Ok(PromptType::BaseAnalysis),
            "JUNIOR_ANALYSIS" => Ok(PromptType::JuniorAnalysis),
            "MIDDLE_ANALYSIS" => Ok(PromptType::MiddleAnalysis),
            "SENIOR_ANALYSIS" => Ok(PromptType::SeniorAnalysis),
            other => Err(format!("Unsupported prompt type: {other}")),
        }
    }
}
