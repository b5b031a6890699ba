//! Query helpers for loaded traces.

use cl_trace::Trace;
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

/// Summary of a trace's time range and size.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub time_range: (f64, f64),
    pub point_count: usize,
    pub variable_count: usize,
}

pub fn get_run_summary(trace: &Trace) -> AppResult<RunSummary> {
    if trace.is_empty() {
        return Err(AppError::InvalidInput("Trace has no points".to_string()));
    }
    let t_min = trace.time_points.first().copied().unwrap_or(0.0);
    let t_max = trace.time_points.last().copied().unwrap_or(0.0);
    Ok(RunSummary {
        time_range: (t_min, t_max),
        point_count: trace.len(),
        variable_count: trace.variables().len(),
    })
}

pub fn list_variable_ids(trace: &Trace) -> Vec<String> {
    trace.variables().into_iter().map(str::to_string).collect()
}

/// `(time, value)` pairs of one variable.
pub fn extract_variable_series(trace: &Trace, variable: &str) -> AppResult<Vec<(f64, f64)>> {
    Ok(trace.series_with_time(variable)?)
}

/// Every component series of one entity.
pub fn extract_entity_series(trace: &Trace, entity: &str) -> AppResult<BTreeMap<String, Vec<f64>>> {
    let series = trace.entity_series(entity);
    if series.is_empty() {
        return Err(AppError::InvalidInput(format!("No variables for entity {entity}")));
    }
    Ok(series)
}

/// `time,value` CSV of one variable.
pub fn export_series_csv(trace: &Trace, variable: &str) -> AppResult<String> {
    Ok(cl_trace::series_csv(trace, variable)?)
}

/// Wide CSV of the whole trace, or of the listed variables.
pub fn export_trace_csv(trace: &Trace, variables: Option<&[String]>) -> AppResult<String> {
    Ok(cl_trace::trace_csv(trace, variables)?)
}
