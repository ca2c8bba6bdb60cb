//! The fixed questionnaire asked of every downloaded document.

use indexmap::IndexMap;

/// The eleven questions, in the order their answer columns appear in the
/// result store.
pub const QUESTIONS: [&str; 11] = [
    "Who are the authors?",
    "What is the title of the page?",
    "What is the link to the page?",
    "How many mentions are relevant to keyword?",
    "What is the name of the pollutant shipwreck(s)?",
    "What are the coordinates of the sites?",
    "What is the type of pollution (oil, chemicals, UXO, corrosion)?",
    "Which World War period does it belong to (WWI, WWII, Unknown)?",
    "What is the date of publishing of the article?",
    "Are there mentions of sinking dates?",
    "Are coordinate locations mentioned (Yes or No)?",
];

/// Answer recorded for every question when extraction could not complete.
pub const LIMIT_SENTINEL: &str =
    "The operation exceeded its iteration or time limit. Consider increasing the limit.";

/// Substring the answering capability embeds in its reply when it stops
/// because it ran out of its own iteration or time budget.
pub const BUDGET_MARKER: &str = "Agent stopped";

/// A full answer set mapping every question to [`LIMIT_SENTINEL`].
#[must_use]
pub fn fallback_answers() -> IndexMap<String, String> {
    QUESTIONS
        .iter()
        .map(|question| ((*question).to_string(), LIMIT_SENTINEL.to_string()))
        .collect()
}

/// Reshapes a parsed answer set onto the canonical questionnaire.
///
/// Every question appears exactly once, in [`QUESTIONS`] order; questions
/// the capability skipped map to an empty string, and keys it invented are
/// dropped.
#[must_use]
pub fn normalize_answers(raw: &IndexMap<String, String>) -> IndexMap<String, String> {
    QUESTIONS
        .iter()
        .map(|question| {
            let answer = raw.get(*question).cloned().unwrap_or_default();
            ((*question).to_string(), answer)
        })
        .collect()
}
