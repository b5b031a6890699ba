//! Integration tests for cl-graph.

use cl_graph::{GraphBuilder, GraphError, PathLimits, simple_paths};
use cl_model::{ComponentKind, InfluenceSign, Model, ResponseFunction};
use proptest::prelude::*;

fn model(yaml: &str) -> Model {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn builds_graph_from_model() {
    let m = model(
        r#"
entities:
  Funding:
    components:
      level: { type: state, initial: 0.6, min: 0.3, max: 1.0 }
  Teachers:
    components:
      retention:
        type: state
        initial: 0.8
        influences:
          - { from: Funding.level, coef: 0.5, kind: positive }
          - { from: self, coef: -0.05, kind: decay }
          - { from: morale, coef: 0.2, kind: positive, enabled: false }
      morale: { type: computed, initial: 0.5 }
"#,
    );
    let graph = GraphBuilder::from_model(&m).unwrap();

    assert_eq!(graph.nodes().len(), 3);
    // The disabled influence is absent.
    assert_eq!(graph.edges().len(), 2);

    let funding = graph.find("Funding.level").unwrap();
    let retention = graph.find("Teachers.retention").unwrap();
    let morale = graph.find("Teachers.morale").unwrap();

    assert!(graph.is_root(funding));
    assert!(graph.is_root(morale));
    assert_eq!(graph.in_degree(retention), 2);

    let edge = graph.edge(graph.incoming(retention)[0]).unwrap();
    assert_eq!(edge.source, funding);
    assert_eq!(edge.sign, InfluenceSign::Positive);
    assert_eq!(edge.coefficient, 0.5);

    let self_loop = graph.edge(graph.incoming(retention)[1]).unwrap();
    assert!(self_loop.is_self_loop());

    assert_eq!(graph.node(funding).unwrap().display_name(), "Funding level");
}

#[test]
fn unknown_source_is_invalid_model() {
    let m = model(
        r#"
entities:
  A:
    components:
      x:
        type: state
        initial: 0.0
        influences: [ { from: Nowhere.y, coef: 1.0, kind: positive } ]
"#,
    );
    let err = GraphBuilder::from_model(&m).unwrap_err();
    assert!(matches!(err, GraphError::UnknownVariable { ref name, .. } if name == "Nowhere.y"));
    assert!(err.to_string().contains("Nowhere.y"));
}

#[test]
fn feedback_loop_paths_are_finite() {
    let m = model(
        r#"
entities:
  Loop:
    components:
      a:
        type: state
        initial: 1.0
        influences: [ { from: b, coef: -0.3, kind: decay } ]
      b:
        type: state
        initial: 1.0
        influences: [ { from: a, coef: 0.7, kind: positive } ]
"#,
    );
    let graph = GraphBuilder::from_model(&m).unwrap();
    let a = graph.find("Loop.a").unwrap();
    let b = graph.find("Loop.b").unwrap();
    let paths = simple_paths(&graph, a, b, PathLimits::default());
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].len(), 1);
}

proptest! {
    #[test]
    fn simple_paths_are_simple_and_bounded(
        n in 2usize..7,
        raw_edges in prop::collection::vec((0usize..7, 0usize..7), 0..20),
        max_depth in 1usize..6,
        max_paths in 1usize..50,
    ) {
        let mut b = GraphBuilder::new();
        let ids: Vec<_> = (0..n)
            .map(|i| b.add_variable("N", format!("v{i}"), ComponentKind::State, 0.0, None, None))
            .collect();
        for (s, t) in raw_edges {
            b.add_influence(ids[s % n], ids[t % n], InfluenceSign::Positive, 1.0, ResponseFunction::Linear);
        }
        let g = b.build().unwrap();
        let limits = PathLimits { max_depth, max_paths };

        let paths = simple_paths(&g, ids[0], ids[n - 1], limits);
        prop_assert!(paths.len() <= max_paths);
        for path in &paths {
            prop_assert!(!path.is_empty() && path.len() <= max_depth);
            let edges: Vec<_> = path.iter().map(|e| g.edge(*e).unwrap()).collect();
            prop_assert_eq!(edges[0].source, ids[0]);
            prop_assert_eq!(edges[edges.len() - 1].target, ids[n - 1]);
            let mut visited = vec![edges[0].source];
            for w in edges.windows(2) {
                prop_assert_eq!(w[0].target, w[1].source);
            }
            for e in &edges {
                prop_assert!(!visited.contains(&e.target));
                visited.push(e.target);
            }
        }
    }
}
