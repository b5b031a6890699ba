use cl_model::Model;
use cl_sim::{InfluenceChange, RunInputs, SimError, SimOptions, run_sim};
use std::collections::BTreeMap;

fn model() -> Model {
    serde_yaml::from_str(
        r#"
entities:
  Funding:
    components:
      level: { type: state, initial: 0.6, min: 0.3, max: 1.0 }
  Teachers:
    components:
      retention:
        type: state
        initial: 0.5
        min: 0.0
        max: 1.0
        influences:
          - { from: Funding.level, coef: 0.5, kind: positive }
          - { from: self, coef: -0.1, kind: decay }
simulation: { dt: 0.1, steps: 50 }
"#,
    )
    .unwrap()
}

#[test]
fn retention_rises_with_funding() {
    let m = model();
    let trace = run_sim(&m, &SimOptions::from(&m.simulation), &RunInputs::default()).unwrap();
    assert_eq!(trace.len(), 51);
    let retention = trace.series("Teachers.retention").unwrap();
    assert!(retention.last().unwrap() > &retention[0]);
    // First step: 0.5 + 0.1 * (0.5 * 0.6 - 0.1 * 0.5)
    assert!((retention[1] - 0.525).abs() < 1e-12);
    assert!(retention.iter().all(|v| (0.0..=1.0).contains(v)));
    let funding = trace.series("Funding.level").unwrap();
    assert!(funding.iter().all(|v| *v == 0.6));
}

#[test]
fn parameter_override_is_clamped() {
    let m = model();
    let inputs = RunInputs::with_parameters(BTreeMap::from([("Funding.level".to_string(), 5.0)]));
    let trace = run_sim(&m, &SimOptions { dt: 0.1, steps: 2 }, &inputs).unwrap();
    assert_eq!(trace.series("Funding.level").unwrap()[0], 1.0);
}

#[test]
fn more_funding_means_more_retention() {
    let m = model();
    let opts = SimOptions::from(&m.simulation);
    let low = run_sim(
        &m,
        &opts,
        &RunInputs::with_parameters(BTreeMap::from([("Funding.level".to_string(), 0.4)])),
    )
    .unwrap();
    let high = run_sim(
        &m,
        &opts,
        &RunInputs::with_parameters(BTreeMap::from([("Funding.level".to_string(), 0.9)])),
    )
    .unwrap();
    let last = |t: &cl_trace::Trace| *t.series("Teachers.retention").unwrap().last().unwrap();
    assert!(last(&high) > last(&low));
}

#[test]
fn influence_changes_apply_by_resolved_source() {
    let m = model();
    let inputs = RunInputs {
        parameter_changes: BTreeMap::new(),
        influence_changes: vec![InfluenceChange {
            target: "Teachers.retention".into(),
            source: "Funding.level".into(),
            coefficient: None,
            enabled: Some(false),
        }],
    };
    let trace = run_sim(&m, &SimOptions { dt: 0.1, steps: 10 }, &inputs).unwrap();
    let retention = trace.series("Teachers.retention").unwrap();
    assert!(retention[10] < retention[0]);

    let missing = RunInputs {
        parameter_changes: BTreeMap::new(),
        influence_changes: vec![InfluenceChange {
            target: "Teachers.retention".into(),
            source: "Nowhere.x".into(),
            coefficient: Some(1.0),
            enabled: None,
        }],
    };
    assert!(matches!(
        run_sim(&m, &SimOptions::default(), &missing),
        Err(SimError::UnknownInfluence { .. })
    ));
}
