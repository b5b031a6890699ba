//! Invariants that hold for arbitrary graphs and traces.

use cl_explain::{ExplainConfig, ExplainRequest, Explainer};
use cl_graph::{CausalGraph, GraphBuilder};
use cl_model::{ComponentKind, InfluenceSign, ResponseFunction};
use cl_trace::{Snapshot, Trace};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Case {
    bounded: Vec<bool>,
    edges: Vec<(usize, usize, usize, i32)>,
    rows: Vec<Vec<i32>>,
}

fn case() -> impl Strategy<Value = Case> {
    (2usize..6).prop_flat_map(|n| {
        (
            prop::collection::vec(any::<bool>(), n),
            prop::collection::vec((0..n, 0..n, 0usize..4, -20i32..20), 0..10),
            prop::collection::vec(prop::collection::vec(-300i32..300, n), 1..25),
        )
            .prop_map(|(bounded, edges, rows)| Case {
                bounded,
                edges,
                rows,
            })
    })
}

fn build(case: &Case) -> (CausalGraph, Trace) {
    let mut b = GraphBuilder::new();
    let ids: Vec<_> = case
        .bounded
        .iter()
        .enumerate()
        .map(|(i, bounded)| {
            let (min, max) = if *bounded { (Some(-1.0), Some(1.0)) } else { (None, None) };
            b.add_variable("E", format!("v{i}"), ComponentKind::State, 0.0, min, max)
        })
        .collect();
    for (source, target, sign, coef) in &case.edges {
        b.add_influence(
            ids[*source],
            ids[*target],
            InfluenceSign::ALL[*sign],
            *coef as f64 / 10.0,
            ResponseFunction::Linear,
        );
    }
    let graph = b.build().unwrap();

    // Values on a 0.01 grid keep net changes either zero or well resolved.
    let history: Vec<Snapshot> = case
        .rows
        .iter()
        .map(|row| {
            graph
                .nodes()
                .iter()
                .zip(row)
                .map(|(node, v)| (node.name.clone(), *v as f64 / 100.0))
                .collect()
        })
        .collect();
    let times = (0..history.len()).map(|i| i as f64 * 0.5).collect();
    (graph, Trace::new(times, history).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn result_invariants(case in case()) {
        let (graph, trace) = build(&case);
        let names: Vec<String> = graph.nodes().iter().map(|n| n.name.clone()).collect();
        let request = ExplainRequest {
            extra_targets: names,
            ..ExplainRequest::default()
        };
        let cfg = ExplainConfig::default();
        let explainer = Explainer::new(cfg.clone());
        let result = explainer.explain(&graph, &trace, &request, 7).unwrap();

        // Ranks are 1..N, impact never increases.
        for (i, d) in result.main_drivers.iter().enumerate() {
            prop_assert_eq!(d.rank, i + 1);
            prop_assert!((0.0..=100.0).contains(&d.impact));
        }
        for w in result.main_drivers.windows(2) {
            prop_assert!(w[0].impact >= w[1].impact);
        }

        for c in &result.contributions {
            if !c.inconclusive {
                let sum = c.percentage_sum();
                prop_assert!((sum - 100.0).abs() <= 1e-6 * 100.0, "sum {} for {}", sum, c.target);
            }
        }

        let score = result.viability.score;
        prop_assert!((0.0..=100.0).contains(&score));

        let window = cfg.timeline.dedup_window_fraction * (trace.duration());
        for w in result.timeline.windows(2) {
            prop_assert!(w[0].time <= w[1].time);
        }
        for (i, a) in result.timeline.iter().enumerate() {
            for b in &result.timeline[i + 1..] {
                if a.variable == b.variable && a.event == b.event {
                    prop_assert!((a.time - b.time).abs() > window);
                }
            }
        }

        prop_assert!(result.critical_paths.len() <= cfg.paths.top_n);
        for p in &result.critical_paths {
            prop_assert!(p.len() <= cfg.paths.max_depth);
        }

        let again = explainer.explain(&graph, &trace, &request, 7).unwrap();
        prop_assert_eq!(result.content_json().unwrap(), again.content_json().unwrap());
    }

    #[test]
    fn single_edge_elasticity_matches_driver_direction(
        coef in 1i32..20,
        negative in any::<bool>(),
        start in 10i32..100,
        step in -150i32..50,
        outcome in -100i32..100,
    ) {
        prop_assume!(step != 0);
        let mut b = GraphBuilder::new();
        let lever = b.add_variable("A", "lever", ComponentKind::State, 0.0, Some(0.0), Some(10.0));
        let out = b.add_variable("B", "out", ComponentKind::Computed, 0.0, None, None);
        let sign = if negative { InfluenceSign::Negative } else { InfluenceSign::Positive };
        b.add_influence(lever, out, sign, coef as f64 / 10.0, ResponseFunction::Linear);
        let graph = b.build().unwrap();

        let l0 = start as f64 / 20.0;
        let l1 = l0 + step as f64 / 20.0;
        let k = if negative { -1.0 } else { 1.0 } * coef as f64 / 10.0;
        let o0 = outcome as f64 / 10.0;
        let o1 = o0 + k * (l1 - l0);
        prop_assume!(l1.abs() > 1e-3 && o1.abs() > 1e-3);
        let snap = |l: f64, o: f64| -> Snapshot {
            [("A.lever".to_string(), l), ("B.out".to_string(), o)].into_iter().collect()
        };
        let trace = Trace::new(vec![0.0, 1.0], vec![snap(l0, o0), snap(l1, o1)]).unwrap();

        let result = Explainer::default()
            .explain(&graph, &trace, &ExplainRequest::default(), 0)
            .unwrap();
        let elasticity = result.sensitivity_for("A.lever").unwrap().elasticity;
        let driver = &result.main_drivers[0];
        prop_assert_eq!(driver.variable.as_str(), "A.lever");
        prop_assert_eq!(
            elasticity > 0.0,
            driver.direction == cl_explain::Direction::Positive
        );
    }
}
