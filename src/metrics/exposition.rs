//! Prometheus text rendering of a metric set.
//!
//! Values are written exactly as stored. The prometheus crate's own
//! collectors hold `f64`, which would reformat balances, so account
//! samples are rendered here instead of going through a registry.

use super::Metric;
use std::fmt::Write;

/// Renders metrics in the Prometheus text exposition format.
///
/// A `# TYPE` line is emitted before the first sample of each series.
/// Samples of a series need not be adjacent in the input; they are
/// grouped under their series in order of first appearance.
pub fn render(metrics: &[Metric]) -> String {
    let mut series: Vec<(&str, Vec<&Metric>)> = Vec::new();
    for metric in metrics {
        match series.iter_mut().find(|(name, _)| *name == metric.name) {
            Some((_, samples)) => samples.push(metric),
            None => series.push((metric.name.as_str(), vec![metric])),
        }
    }

    let mut out = String::new();
    for (name, samples) in series {
        let _ = writeln!(out, "# TYPE {} {}", name, samples[0].metric_type);
        for sample in samples {
            render_sample(&mut out, sample);
        }
    }
    out
}

fn render_sample(out: &mut String, metric: &Metric) {
    out.push_str(&metric.name);
    if !metric.tags.is_empty() {
        out.push('{');
        for (i, (key, value)) in metric.tags.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{}=\"{}\"", key, escape_label_value(value));
        }
        out.push('}');
    }
    out.push(' ');
    out.push_str(&metric.value);
    out.push('\n');
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}
