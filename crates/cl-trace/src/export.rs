//! CSV export of traces.

use crate::TraceResult;
use crate::types::Trace;

/// Wide CSV: `time` column followed by one column per variable.
///
/// `variables = None` exports every variable in sorted order.
pub fn trace_csv(trace: &Trace, variables: Option<&[String]>) -> TraceResult<String> {
    let columns: Vec<String> = match variables {
        Some(v) => v.to_vec(),
        None => trace.variables().into_iter().map(String::from).collect(),
    };
    let series = columns
        .iter()
        .map(|c| trace.series(c))
        .collect::<TraceResult<Vec<_>>>()?;

    let mut csv = String::from("time");
    for c in &columns {
        csv.push(',');
        csv.push_str(c);
    }
    csv.push('\n');

    for (i, t) in trace.time_points.iter().enumerate() {
        csv.push_str(&t.to_string());
        for s in &series {
            csv.push(',');
            csv.push_str(&s[i].to_string());
        }
        csv.push('\n');
    }
    Ok(csv)
}

/// Two-column `time,value` CSV for one variable.
pub fn series_csv(trace: &Trace, variable: &str) -> TraceResult<String> {
    let mut csv = String::from("time,value\n");
    for (t, val) in trace.series_with_time(variable)? {
        csv.push_str(&format!("{},{}\n", t, val));
    }
    Ok(csv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Snapshot;

    fn trace() -> Trace {
        let s = |x: f64, y: f64| -> Snapshot {
            [("A.x".to_string(), x), ("A.y".to_string(), y)]
                .into_iter()
                .collect()
        };
        Trace::new(vec![0.0, 0.5], vec![s(1.0, 2.0), s(1.5, 2.5)]).unwrap()
    }

    #[test]
    fn wide_csv_has_all_columns() {
        let csv = trace_csv(&trace(), None).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("time,A.x,A.y"));
        assert_eq!(lines.next(), Some("0,1,2"));
        assert_eq!(lines.next(), Some("0.5,1.5,2.5"));
    }

    #[test]
    fn series_csv_unknown_variable_fails() {
        assert!(series_csv(&trace(), "A.q").is_err());
        assert!(series_csv(&trace(), "A.y").unwrap().starts_with("time,value\n0,2\n"));
    }
}
