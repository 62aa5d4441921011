//! Plan-stage extraction.
//!
//! A stage starts at a line anchored as `Stage N: name` or `Phase N: name`
//! with `N` in 1..=7. The lines that follow, up to the next header, fill in
//! the stage's descriptor.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{PlanStructure, StageDescriptor};

static RE_STAGE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:Stage|Phase)\s+([1-7]):\s*(.+)").expect("valid stage header regex")
});

const BULLET_CHARS: &str = "-•* 0123456789.";

/// Parse stages out of `text`, in the order their headers appear.
///
/// Returns an empty plan when no header matches. A repeated stage name
/// replaces the earlier descriptor without moving it.
pub fn parse_stages(text: &str) -> PlanStructure {
    let mut plan = PlanStructure::new();
    let mut current: Option<(String, StageDescriptor)> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = RE_STAGE_HEADER.captures(line) {
            if let Some((name, descriptor)) = current.take() {
                plan.insert(name, descriptor);
            }
            let number = caps.get(1).map_or("", |m| m.as_str());
            let name = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
            tracing::debug!(stage = %name, number, "parsed stage header");
            current = Some((name, StageDescriptor::empty()));
            continue;
        }

        if let Some((_, descriptor)) = current.as_mut() {
            classify_line(line, descriptor);
        }
    }
    if let Some((name, descriptor)) = current {
        plan.insert(name, descriptor);
    }
    plan
}

/// Apply one body line to `descriptor`. The first matching rule wins.
fn classify_line(line: &str, descriptor: &mut StageDescriptor) {
    let lower = line.to_lowercase();

    if lower.contains("duration") || lower.contains("time") {
        if let Some((_, value)) = line.split_once(':') {
            descriptor.duration = value.trim().to_string();
        }
    } else if lower.contains("prerequisite") {
        if let Some((_, value)) = line.split_once(':') {
            descriptor.prerequisites = value.split(',').map(|p| p.trim().to_string()).collect();
        }
    } else if lower.contains("objective") || lower.contains("goal") {
        // Section label; the objectives follow as bullets.
    } else if line.starts_with(['-', '•', '*']) || line.starts_with(|c: char| c.is_ascii_digit()) {
        let objective = line.trim_start_matches(|c| BULLET_CHARS.contains(c));
        if !objective.is_empty() {
            descriptor.objectives.push(objective.to_string());
        }
    } else if lower.contains("description") {
        if let Some((_, value)) = line.split_once(':') {
            descriptor.description = value.trim().to_string();
        }
    } else if descriptor.description.is_empty() {
        descriptor.description = line.to_string();
    }
}
