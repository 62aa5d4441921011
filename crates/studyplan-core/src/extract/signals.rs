//! Best-effort keyword heuristics over completion text.
//!
//! These only look for words and simple numeric patterns. Callers treat a
//! miss as "no signal", never as an error.

use std::sync::LazyLock;

use regex::Regex;

static RE_SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)/10|score[:\s]+(\d+)").expect("valid score regex")
});

const GAP_LINE_KEYWORDS: [&str; 3] = ["gap", "lack", "missing"];
const CRITICAL_MARKERS: [&str; 2] = ["critical", "major issue"];
const PROBLEM_MARKERS: [&str; 3] = ["critical", "major issue", "low quality"];

/// Lines of an analysis that describe knowledge gaps.
///
/// Only consulted when the text mentions "gap" at all; then every trimmed
/// line containing "gap", "lack" or "missing" is returned.
pub fn gap_lines(text: &str) -> Vec<String> {
    if !text.to_lowercase().contains("gap") {
        return Vec::new();
    }
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            GAP_LINE_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|line| line.trim().to_string())
        .collect()
}

/// The first `N/10` or `score: N` value in a validation response.
pub fn validation_score(text: &str) -> Option<u32> {
    let caps = RE_SCORE.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether a validation response reports a critical or major issue.
pub fn reports_critical_issue(text: &str) -> bool {
    contains_any(text, &CRITICAL_MARKERS)
}

/// Whether any feedback entry flags a critical issue, a major issue or low
/// quality.
pub fn feedback_flags_problem<S: AsRef<str>>(entries: &[S]) -> bool {
    entries
        .iter()
        .any(|entry| contains_any(entry.as_ref(), &PROBLEM_MARKERS))
}

/// Whether a gap asks for more material on `stage`: it names the stage or
/// contains the word "need".
pub fn gap_targets_stage(gap: &str, stage: &str) -> bool {
    let lower = gap.to_lowercase();
    lower.contains(&stage.to_lowercase()) || lower.contains("need")
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    let lower = text.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}
