//! Notable events in each variable's series.

use cl_core::{Real, is_negligible, signum0};
use cl_graph::{CausalGraph, VarNode};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;
use crate::series::SeriesTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Peak,
    Trough,
    ThresholdCross,
    Inflection,
    Stability,
    Divergence,
}

impl EventKind {
    pub fn label(self) -> &'static str {
        match self {
            EventKind::Peak => "peak",
            EventKind::Trough => "trough",
            EventKind::ThresholdCross => "threshold_cross",
            EventKind::Inflection => "inflection",
            EventKind::Stability => "stability",
            EventKind::Divergence => "divergence",
        }
    }
}

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: Real,
    /// Index into the trace.
    pub index: usize,
    pub variable: String,
    pub display_name: String,
    pub event: EventKind,
    pub severity: Severity,
    pub value: Real,
    pub description: String,
}

/// Scan every variable and return the merged, deduplicated timeline sorted
/// by time, then severity (most severe first), variable and kind.
pub fn detect_events(
    graph: &CausalGraph,
    table: &SeriesTable,
    cfg: &TimelineConfig,
) -> Vec<TimelineEvent> {
    let window = cfg.dedup_window_fraction * table.duration();
    let mut events: Vec<TimelineEvent> = graph
        .nodes()
        .par_iter()
        .flat_map_iter(|node| {
            let raw = scan_variable(node, table.series(node.id), table.times(), cfg);
            dedup(raw, window)
        })
        .collect();
    sort_timeline(&mut events);
    events
}

pub fn sort_timeline(events: &mut [TimelineEvent]) {
    events.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then_with(|| b.severity.cmp(&a.severity))
            .then_with(|| a.variable.cmp(&b.variable))
            .then_with(|| a.event.cmp(&b.event))
    });
}

/// Observed `(min, max)` over the finite values.
fn observed_bounds(values: &[Real]) -> Option<(Real, Real)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn std_dev(values: &[Real]) -> Real {
    let n = values.len() as Real;
    let mean = values.iter().sum::<Real>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<Real>() / n).sqrt()
}

/// Points in the trailing stability/divergence window.
pub fn window_len(n: usize, fraction: Real) -> usize {
    ((n as Real * fraction).round() as usize).max(2).min(n)
}

struct Scan<'a> {
    node: &'a VarNode,
    values: &'a [Real],
    times: &'a [Real],
    cfg: &'a TimelineConfig,
    out: Vec<TimelineEvent>,
}

impl Scan<'_> {
    fn push(&mut self, index: usize, event: EventKind, critical: bool, description: String) {
        let value = self.values[index];
        let severity = if critical {
            Severity::Critical
        } else if self.near_bound(value) {
            Severity::Warning
        } else {
            Severity::Info
        };
        self.out.push(TimelineEvent {
            time: self.times[index],
            index,
            variable: self.node.name.clone(),
            display_name: self.node.display_name(),
            event,
            severity,
            value,
            description,
        });
    }

    fn near_bound(&self, value: Real) -> bool {
        let Some((lo, hi)) = self.node.bounds() else {
            return false;
        };
        let margin = self.cfg.bound_margin_fraction * (hi - lo);
        hi > lo && ((value - lo).abs() <= margin || (hi - value).abs() <= margin)
    }
}

fn scan_variable(
    node: &VarNode,
    values: &[Real],
    times: &[Real],
    cfg: &TimelineConfig,
) -> Vec<TimelineEvent> {
    let n = values.len().min(times.len());
    let mut scan = Scan {
        node,
        values: &values[..n],
        times: &times[..n],
        cfg,
        out: Vec::new(),
    };
    let Some((obs_lo, obs_hi)) = observed_bounds(scan.values) else {
        return scan.out;
    };
    let range = obs_hi - obs_lo;
    let name = node.display_name();
    let v = scan.values;

    if range > 0.0 {
        let prominence = cfg.prominence_fraction * range;
        for i in 1..n.saturating_sub(1) {
            let (left, right) = (v[i] - v[i - 1], v[i] - v[i + 1]);
            if left > prominence && right > prominence {
                scan.push(i, EventKind::Peak, false, format!("{name} peaks at {:.3}", v[i]));
            } else if -left > prominence && -right > prominence {
                scan.push(i, EventKind::Trough, false, format!("{name} bottoms out at {:.3}", v[i]));
            }
        }

        // Flat stretches keep the last curved sample, so a flip through an
        // exact zero lands on the flat point.
        let swing = cfg.inflection_fraction * range;
        let mut last: Option<(usize, Real)> = None;
        for i in 1..n.saturating_sub(1) {
            let here = v[i + 1] - 2.0 * v[i] + v[i - 1];
            if is_negligible(here) {
                continue;
            }
            if let Some((j, before)) = last
                && signum0(before) * signum0(here) < 0
                && (here - before).abs() > swing
            {
                let at = (j + i + 1) / 2;
                scan.push(
                    at,
                    EventKind::Inflection,
                    false,
                    format!("{name} changes curvature at {:.3}", v[at]),
                );
            }
            last = Some((i, here));
        }
    }

    for i in 1..n {
        let (prev, cur) = (v[i - 1], v[i]);
        if let Some(lo) = node.min
            && ((prev > lo && cur <= lo) || (prev < lo && cur >= lo))
        {
            let what = if cur <= lo { "falls to" } else { "recovers above" };
            scan.push(
                i,
                EventKind::ThresholdCross,
                true,
                format!("{name} {what} its minimum {lo:.3}"),
            );
        }
        if let Some(hi) = node.max
            && ((prev < hi && cur >= hi) || (prev > hi && cur <= hi))
        {
            let what = if cur >= hi { "reaches" } else { "drops back below" };
            scan.push(
                i,
                EventKind::ThresholdCross,
                true,
                format!("{name} {what} its maximum {hi:.3}"),
            );
        }
        if prev * cur < 0.0 {
            let what = if cur > 0.0 { "turns positive" } else { "turns negative" };
            scan.push(i, EventKind::ThresholdCross, false, format!("{name} {what}"));
        }
    }

    if n >= 2 {
        let w = window_len(n, cfg.stability_window_fraction);
        let bound_range = node.bound_range().filter(|r| *r > 0.0);

        let scale = bound_range.or((range > 0.0).then_some(range)).unwrap_or_else(|| {
            let mean = v.iter().sum::<Real>() / n as Real;
            mean.abs().max(1.0)
        });
        let limit = cfg.stability_epsilon * scale;
        let mut was_stable = false;
        for end in (w - 1)..n {
            let window = &v[end + 1 - w..=end];
            let stable = std_dev(window) <= limit;
            if stable && !was_stable {
                scan.push(
                    end,
                    EventKind::Stability,
                    false,
                    format!("{name} settles near {:.3}", v[end]),
                );
            }
            was_stable = stable;
        }

        let div_scale = bound_range.unwrap_or_else(|| v[0].abs().max(1.0));
        let threshold = cfg.divergence_multiple * div_scale;
        let run = v.iter().rev().take_while(|x| x.abs() > threshold).count();
        if run >= w {
            let start = n - run;
            scan.push(
                start,
                EventKind::Divergence,
                true,
                format!("{name} diverges past {threshold:.3} and does not return"),
            );
        }
    }

    scan.out
}

/// Within each event kind, keep the most severe event of any cluster closer
/// than `window` in time. Kept events are pairwise more than `window` apart.
fn dedup(mut events: Vec<TimelineEvent>, window: Real) -> Vec<TimelineEvent> {
    events.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.time.total_cmp(&b.time))
    });
    let mut kept: Vec<TimelineEvent> = Vec::with_capacity(events.len());
    for event in events {
        let clash = kept
            .iter()
            .any(|k| k.event == event.event && (k.time - event.time).abs() <= window);
        if !clash {
            kept.push(event);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use cl_model::ComponentKind;

    fn node(min: Option<Real>, max: Option<Real>) -> VarNode {
        VarNode {
            id: cl_core::VarId::from_index(0),
            name: "A.x".into(),
            entity: "A".into(),
            component: "x".into(),
            kind: ComponentKind::State,
            initial: 0.0,
            min,
            max,
        }
    }

    fn times(n: usize) -> Vec<Real> {
        (0..n).map(|i| i as Real).collect()
    }

    fn kinds(events: &[TimelineEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.event).collect()
    }

    #[test]
    fn peak_and_trough_need_prominence() {
        let cfg = TimelineConfig::default();
        let v = [0.0, 1.0, 0.0, -1.0, 0.0, 0.001, 0.0];
        let events = scan_variable(&node(None, None), &v, &times(v.len()), &cfg);
        let peaks: Vec<_> = events.iter().filter(|e| e.event == EventKind::Peak).collect();
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 1);
        assert!(events.iter().any(|e| e.event == EventKind::Trough && e.index == 3));
    }

    #[test]
    fn bound_crossing_is_critical() {
        let cfg = TimelineConfig::default();
        let v = [0.5, 0.8, 1.0, 1.0];
        let events = scan_variable(&node(Some(0.0), Some(1.0)), &v, &times(4), &cfg);
        let cross = events
            .iter()
            .find(|e| e.event == EventKind::ThresholdCross)
            .unwrap();
        assert_eq!(cross.index, 2);
        assert_eq!(cross.severity, Severity::Critical);
    }

    #[test]
    fn zero_crossing_is_info() {
        let cfg = TimelineConfig::default();
        let v = [-1.0, 1.0];
        let events = scan_variable(&node(None, None), &v, &times(2), &cfg);
        assert_eq!(kinds(&events), vec![EventKind::ThresholdCross]);
        assert_eq!(events[0].severity, Severity::Info);
    }

    #[test]
    fn stability_reported_once_per_region() {
        let cfg = TimelineConfig::default();
        let mut v = vec![0.0; 10];
        v.extend((1..=10).map(|i| i as Real));
        v.extend(vec![10.0; 10]);
        let events = scan_variable(&node(None, None), &v, &times(v.len()), &cfg);
        let stable: Vec<_> = events
            .iter()
            .filter(|e| e.event == EventKind::Stability)
            .map(|e| e.index)
            .collect();
        // Window of 3 points: flat start, then flat tail.
        assert_eq!(stable, vec![2, 21]);
    }

    #[test]
    fn divergence_needs_a_sustained_tail() {
        let cfg = TimelineConfig::default();
        let v: Vec<Real> = (0..20).map(|i| (i as Real * 0.3).exp()).collect();
        let events = scan_variable(&node(None, None), &v, &times(20), &cfg);
        let div: Vec<_> = events
            .iter()
            .filter(|e| e.event == EventKind::Divergence)
            .collect();
        assert_eq!(div.len(), 1);
        assert_eq!(div[0].severity, Severity::Critical);
        // exp(0.3 * 4) = 3.32 is the first value above 3.
        assert_eq!(div[0].index, 4);

        let back = [1.0, 5.0, 6.0, 7.0, 1.0];
        let events = scan_variable(&node(None, None), &back, &times(5), &cfg);
        assert!(!kinds(&events).contains(&EventKind::Divergence));
    }

    #[test]
    fn s_curve_inflects_at_its_midpoint() {
        let cfg = TimelineConfig::default();
        let v: Vec<Real> = (0..21)
            .map(|i| 1.0 / (1.0 + (-(i as Real - 10.0) / 2.0).exp()))
            .collect();
        let events = scan_variable(&node(None, None), &v, &times(21), &cfg);
        let inflections: Vec<_> = events
            .iter()
            .filter(|e| e.event == EventKind::Inflection)
            .map(|e| e.index)
            .collect();
        assert_eq!(inflections, vec![10]);
    }

    #[test]
    fn adjacent_curvature_flip_inflects() {
        let cfg = TimelineConfig::default();
        // Curvature +1, +1, -1, -1.
        let v = [0.0, 0.0, 1.0, 3.0, 4.0, 4.0];
        let events = scan_variable(&node(None, None), &v, &times(6), &cfg);
        let inflections: Vec<_> = events
            .iter()
            .filter(|e| e.event == EventKind::Inflection)
            .map(|e| e.index)
            .collect();
        assert_eq!(inflections, vec![3]);
    }

    #[test]
    fn near_bound_warns() {
        let cfg = TimelineConfig::default();
        let v = [0.5, 0.98, 0.5];
        let events = scan_variable(&node(Some(0.0), Some(1.0)), &v, &times(3), &cfg);
        let peak = events.iter().find(|e| e.event == EventKind::Peak).unwrap();
        assert_eq!(peak.severity, Severity::Warning);
    }

    #[test]
    fn dedup_keeps_most_severe() {
        let mk = |time: Real, severity| TimelineEvent {
            time,
            index: 0,
            variable: "A.x".into(),
            display_name: "A x".into(),
            event: EventKind::ThresholdCross,
            severity,
            value: 0.0,
            description: String::new(),
        };
        let kept = dedup(
            vec![
                mk(1.0, Severity::Info),
                mk(1.2, Severity::Critical),
                mk(5.0, Severity::Info),
            ],
            0.5,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].severity, Severity::Critical);
        assert_eq!(kept[1].time, 5.0);
    }
}
