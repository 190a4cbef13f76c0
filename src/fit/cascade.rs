//! Source-removal comparison cascade.
//!
//! Evaluates the marginal contribution of candidate diffuse sources: run the
//! full schedule on the complete model, then repeatedly delete one candidate
//! (from the model *and* the diffuse set), reconverge, and record the
//! resulting log-likelihood. One round per removal, plus the full-model
//! round.

use chrono::Utc;

use crate::backend::LikelihoodModel;
use crate::domain::{RoundRecord, SourceSet};
use crate::error::Result;
use crate::fit::converge;
use crate::report::ResultSink;

/// Run the cascade and return one record per round.
///
/// Produces exactly `1 + removal_order.len()` records on success. Source
/// deletion is irreversible for the rest of the run; a removal name absent
/// from the model or the diffuse set fails the round with `NotFound` (a
/// caller/config mismatch, not a numerical failure) and no further rounds
/// execute. Records already handed to the sink stand regardless.
pub fn run_cascade(
    model: &mut dyn LikelihoodModel,
    point_sources: &SourceSet,
    diffuse_sources: SourceSet,
    removal_order: &[String],
    sink: &mut dyn ResultSink,
) -> Result<Vec<RoundRecord>> {
    let mut diffuse = diffuse_sources;
    let mut removed: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(1 + removal_order.len());

    records.push(run_round(model, point_sources, &diffuse, &removed, 0, sink)?);

    for (i, name) in removal_order.iter().enumerate() {
        tracing::info!(source = %name, round = i + 1, "removing source from model");
        sink.journal(&format!("removing {name}"))?;
        model.delete_source(name)?;
        diffuse.remove(name)?;
        removed.push(name.clone());

        records.push(run_round(
            model,
            point_sources,
            &diffuse,
            &removed,
            i + 1,
            sink,
        )?);
    }

    Ok(records)
}

fn run_round(
    model: &mut dyn LikelihoodModel,
    point_sources: &SourceSet,
    diffuse: &SourceSet,
    removed: &[String],
    round: usize,
    sink: &mut dyn ResultSink,
) -> Result<RoundRecord> {
    let label = round_label(removed);
    tracing::info!(round, label = %label, diffuse = ?diffuse.names(), "starting cascade round");

    let trace = converge(model, point_sources, diffuse)?;
    let log_likelihood = trace.final_log_likelihood();

    sink.record_log_likelihood(&label, log_likelihood)?;
    let model_artifact = sink.persist_model(&label, model)?;

    Ok(RoundRecord {
        round,
        label,
        diffuse_sources: diffuse.names().to_vec(),
        log_likelihood,
        trace,
        model_artifact,
        recorded_at: Utc::now(),
    })
}

/// Label for a round from its cumulative removal list: `all`, `no_bubble`,
/// `no_bubble_no_HI`, ...
fn round_label(removed: &[String]) -> String {
    if removed.is_empty() {
        return "all".to_string();
    }
    removed
        .iter()
        .map(|name| format!("no_{}", sanitize(name)))
        .collect::<Vec<_>>()
        .join("_")
}

/// Source names feed file names; keep them path-safe.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::backend::scripted::ScriptedModel;
    use crate::error::CascadeError;

    /// In-memory sink mirroring what `FileSink` persists.
    #[derive(Default)]
    struct RecordingSink {
        log_likes: Vec<(String, f64)>,
        persisted: Vec<String>,
        journal: Vec<String>,
    }

    impl ResultSink for RecordingSink {
        fn record_log_likelihood(&mut self, label: &str, log_likelihood: f64) -> Result<()> {
            self.log_likes.push((label.to_string(), log_likelihood));
            Ok(())
        }

        fn persist_model(&mut self, label: &str, _model: &dyn LikelihoodModel) -> Result<PathBuf> {
            self.persisted.push(label.to_string());
            Ok(PathBuf::from(format!("mdl_{label}.json")))
        }

        fn journal(&mut self, line: &str) -> Result<()> {
            self.journal.push(line.to_string());
            Ok(())
        }
    }

    fn scripted() -> ScriptedModel {
        ScriptedModel::new([("p1", 2), ("p2", 2), ("a", 2), ("b", 2), ("c", 2)])
    }

    #[test]
    fn produces_one_record_per_round_with_shrinking_diffuse_sets() {
        let mut m = scripted();
        // Three rounds of five stages each; finals are 5, 10, 15.
        m.script_fits((1..=15).map(|v| Ok(v as f64)));

        let point = SourceSet::new(["p1", "p2"]);
        let diffuse = SourceSet::new(["a", "b", "c"]);
        let removal = vec!["a".to_string(), "b".to_string()];

        let mut sink = RecordingSink::default();
        let records = run_cascade(&mut m, &point, diffuse, &removal, &mut sink).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].diffuse_sources, vec!["a", "b", "c"]);
        assert_eq!(records[1].diffuse_sources, vec!["b", "c"]);
        assert_eq!(records[2].diffuse_sources, vec!["c"]);
        assert_eq!(records[0].label, "all");
        assert_eq!(records[1].label, "no_a");
        assert_eq!(records[2].label, "no_a_no_b");
        assert_eq!(records[0].log_likelihood, 5.0);
        assert_eq!(records[1].log_likelihood, 10.0);
        assert_eq!(records[2].log_likelihood, 15.0);

        assert_eq!(
            sink.log_likes,
            vec![
                ("all".to_string(), 5.0),
                ("no_a".to_string(), 10.0),
                ("no_a_no_b".to_string(), 15.0),
            ]
        );
        assert_eq!(sink.persisted, vec!["all", "no_a", "no_a_no_b"]);
    }

    #[test]
    fn missing_removal_source_aborts_after_the_full_model_round() {
        let mut m = scripted();
        m.script_fits((1..=5).map(|v| Ok(v as f64)));

        let point = SourceSet::new(["p1"]);
        let diffuse = SourceSet::new(["a", "b"]);
        let removal = vec!["galprop".to_string()];

        let mut sink = RecordingSink::default();
        let err = run_cascade(&mut m, &point, diffuse, &removal, &mut sink).unwrap_err();

        assert!(matches!(err, CascadeError::NotFound(name) if name == "galprop"));
        // Round 0 was recorded; nothing after it.
        assert_eq!(sink.log_likes.len(), 1);
        assert_eq!(sink.persisted, vec!["all"]);
    }

    #[test]
    fn removing_every_diffuse_source_surfaces_the_empty_set_failure() {
        // Model {p1, p2, HI, bubble}, diffuse {HI, bubble}, removal
        // [bubble, HI]: round 3 has an empty diffuse set and must fail at
        // its diffuse-activation stage rather than silently succeed.
        let mut m = ScriptedModel::new([("p1", 2), ("p2", 2), ("HI", 2), ("bubble", 2)]);
        // Rounds 1 and 2 complete (10 fits); round 3 fits its point stage
        // (11th) and then dies activating the empty diffuse set.
        m.script_fits((1..=11).map(|v| Ok(v as f64)));

        let point = SourceSet::new(["p1", "p2"]);
        let diffuse = SourceSet::new(["HI", "bubble"]);
        let removal = vec!["bubble".to_string(), "HI".to_string()];

        let mut sink = RecordingSink::default();
        let err = run_cascade(&mut m, &point, diffuse, &removal, &mut sink).unwrap_err();

        assert!(matches!(err, CascadeError::InvalidArgument(_)));
        assert_eq!(
            sink.log_likes,
            vec![("all".to_string(), 5.0), ("no_bubble".to_string(), 10.0)]
        );
        assert_eq!(m.fit_calls().len(), 11);
        assert_eq!(sink.journal, vec!["removing bubble", "removing HI"]);
    }

    #[test]
    fn labels_stay_path_safe_for_spaced_source_names() {
        assert_eq!(
            round_label(&["Dobashi DSS".to_string()]),
            "no_Dobashi_DSS"
        );
    }
}
