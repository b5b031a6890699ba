//! Trace values aligned with graph node ids.

use cl_core::{Real, VarId};
use cl_graph::CausalGraph;
use cl_trace::Trace;

use crate::error::{ExplainError, ExplainResult};

/// Per-variable series indexed by node slot, sharing one time axis.
#[derive(Debug, Clone)]
pub struct SeriesTable {
    times: Vec<Real>,
    series: Vec<Vec<Real>>,
}

impl SeriesTable {
    /// Align a trace with a graph. Every graph variable must be present in
    /// the trace; extra trace variables are ignored.
    pub fn new(graph: &CausalGraph, trace: &Trace) -> ExplainResult<Self> {
        trace.validate()?;
        let series = graph
            .nodes()
            .iter()
            .map(|node| {
                trace
                    .series(&node.name)
                    .map_err(|_| ExplainError::TraceMismatch {
                        reason: format!("variable {} is missing from the trace", node.name),
                    })
            })
            .collect::<ExplainResult<Vec<_>>>()?;
        Ok(Self {
            times: trace.time_points.clone(),
            series,
        })
    }

    pub fn times(&self) -> &[Real] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn duration(&self) -> Real {
        match (self.times.first(), self.times.last()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        }
    }

    pub fn series(&self, id: VarId) -> &[Real] {
        self.series.get(id.slot()).map_or(&[], Vec::as_slice)
    }

    pub fn initial(&self, id: VarId) -> Real {
        self.series(id).first().copied().unwrap_or(0.0)
    }

    pub fn final_value(&self, id: VarId) -> Real {
        self.series(id).last().copied().unwrap_or(0.0)
    }

    /// Net change over the trace.
    pub fn delta(&self, id: VarId) -> Real {
        self.final_value(id) - self.initial(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cl_graph::GraphBuilder;
    use cl_model::ComponentKind;
    use cl_trace::Snapshot;

    #[test]
    fn missing_variable_is_a_mismatch() {
        let mut b = GraphBuilder::new();
        b.add_variable("A", "x", ComponentKind::State, 1.0, None, None);
        b.add_variable("A", "y", ComponentKind::State, 1.0, None, None);
        let g = b.build().unwrap();
        let snap: Snapshot = [("A.x".to_string(), 1.0)].into_iter().collect();
        let trace = Trace::new(vec![0.0], vec![snap]).unwrap();
        assert!(matches!(
            SeriesTable::new(&g, &trace),
            Err(ExplainError::TraceMismatch { .. })
        ));
    }

    #[test]
    fn aligned_series() {
        let mut b = GraphBuilder::new();
        let x = b.add_variable("A", "x", ComponentKind::State, 1.0, None, None);
        let g = b.build().unwrap();
        let snaps: Vec<Snapshot> = [1.0, 3.0]
            .iter()
            .map(|v| [("A.x".to_string(), *v), ("B.extra".to_string(), 0.0)].into_iter().collect())
            .collect();
        let trace = Trace::new(vec![0.0, 2.0], snaps).unwrap();
        let table = SeriesTable::new(&g, &trace).unwrap();
        assert_eq!(table.series(x), &[1.0, 3.0]);
        assert_eq!(table.delta(x), 2.0);
        assert_eq!(table.duration(), 2.0);
    }
}
