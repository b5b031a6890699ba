//! Template narration over computed metrics.

use serde::{Deserialize, Serialize};

use crate::drivers::Driver;
use crate::result::Direction;
use crate::timeline::{Severity, TimelineEvent};
use crate::viability::{RiskLevel, Viability};

/// Critical events quoted in a warning.
const QUOTED_EVENTS: usize = 2;
/// Drivers named in the summary.
const QUOTED_DRIVERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Warning,
    Success,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub headline: String,
    pub text: String,
}

pub fn narrate(viability: &Viability, drivers: &[Driver], timeline: &[TimelineEvent]) -> Insight {
    let criticals: Vec<&TimelineEvent> = timeline
        .iter()
        .filter(|e| e.severity == Severity::Critical)
        .collect();
    let score = viability.score;

    let kind = if !criticals.is_empty()
        || matches!(viability.risk_level, RiskLevel::High | RiskLevel::Critical)
    {
        InsightKind::Warning
    } else if score >= 70.0 {
        InsightKind::Success
    } else {
        InsightKind::Info
    };

    let headline = match kind {
        InsightKind::Warning => format!("Attention needed: viability {score:.0}/100"),
        InsightKind::Success => format!("System is healthy: viability {score:.0}/100"),
        InsightKind::Info => format!("Viability {score:.0}/100"),
    };

    let mut sentences = Vec::new();
    if !drivers.is_empty() {
        let named: Vec<String> = drivers
            .iter()
            .take(QUOTED_DRIVERS)
            .map(|d| {
                let arrow = if d.direction == Direction::Positive { "raising" } else { "lowering" };
                format!("{} ({arrow}, {:.0}%)", d.display_name, d.percentage.abs())
            })
            .collect();
        sentences.push(format!("Main drivers: {}.", named.join(", ")));
    }
    if kind == InsightKind::Warning {
        for event in criticals.iter().take(QUOTED_EVENTS) {
            sentences.push(format!("At t={:.2}, {}.", event.time, event.description));
        }
        if criticals.len() > QUOTED_EVENTS {
            sentences.push(format!(
                "{} more critical events follow.",
                criticals.len() - QUOTED_EVENTS
            ));
        }
    }
    sentences.push(format!(
        "Risk is {}, stability is {}.",
        viability.risk_level.label(),
        viability.stability.label()
    ));

    Insight {
        kind,
        headline,
        text: sentences.join(" "),
    }
}
