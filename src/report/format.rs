//! Formatted terminal output for a finished run.
//!
//! Formatting stays in one place so the fitting code remains clean and
//! output changes are localized.

use crate::domain::RunSummary;

/// Format the per-round comparison table for one template run.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== cascade - staged likelihood fit ({}) ===\n",
        summary.template.display_name()
    ));
    out.push_str(&format!(
        "Rounds: {} | elapsed: {:.2}s\n\n",
        summary.records.len(),
        summary.elapsed_secs
    ));

    let full = summary.records.first().map(|r| r.log_likelihood);

    out.push_str(&format!(
        "{:<6} {:<22} {:>14} {:>12}  {}\n",
        "round", "label", "log(like)", "d(full)", "diffuse sources"
    ));
    for record in &summary.records {
        let delta = match full {
            Some(f) => format!("{:+.4}", record.log_likelihood - f),
            None => String::new(),
        };
        out.push_str(&format!(
            "{:<6} {:<22} {:>14.4} {:>12}  {}\n",
            record.round,
            record.label,
            record.log_likelihood,
            delta,
            record.diffuse_sources.join(", ")
        ));
    }

    out
}
