//! Trigger quality scoring.
//!
//! Triggers, anti-triggers and the description are reduced to expanded stem
//! sets and compared with Jaccard overlap. Scores rank phrases for human
//! review; a zero score never proves a phrase will not activate the skill
//! and a high score never proves it will.

use crate::config::TriggerThresholds;
use crate::diagnostics::{Component, Diagnostic, Location};
use crate::skillpacks::spec::{TriggerPhrase, SPEC_FILE};
use crate::text::{overlap, StemSet, SynonymExpander, TokenEngine};
use serde::Serialize;
use std::fmt::Write;

/// Description stems shorter than this are not suggested as missing terms
const MIN_UNCOVERED_TERM_LEN: usize = 5;

const DISCLAIMER: &str =
    "Scores are a lexical heuristic for review only; they do not predict activation.";

/// Overlap of one phrase with the description
#[derive(Debug, Clone, Serialize)]
pub struct PhraseScore {
    pub phrase: String,
    pub score: f64,
    /// Stems shared with the description, sorted
    pub shared: Vec<String>,
}

/// A trigger pair scoring above the similarity threshold
#[derive(Debug, Clone, Serialize)]
pub struct PairScore {
    pub first: String,
    pub second: String,
    pub score: f64,
}

/// Score table attached to trigger reports
#[derive(Debug, Clone, Serialize)]
pub struct TriggerAnalysis {
    pub description_stems: Vec<String>,
    pub triggers: Vec<PhraseScore>,
    pub anti_triggers: Vec<PhraseScore>,
    pub similar_pairs: Vec<PairScore>,
    pub distinct_triggers: usize,
    pub uncovered_terms: Vec<String>,
    pub similarity_threshold: f64,
    pub collision_threshold: f64,
}

impl TriggerAnalysis {
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Trigger analysis");
        let _ = writeln!(out, "  {}", DISCLAIMER);
        let _ = writeln!(
            out,
            "  Description stems: {}",
            join_or_dash(&self.description_stems)
        );

        let _ = writeln!(out, "  Triggers (overlap with description):");
        if self.triggers.is_empty() {
            let _ = writeln!(out, "    -");
        }
        for t in &self.triggers {
            let _ = writeln!(
                out,
                "    {:.2}  {}  [{}]",
                t.score,
                t.phrase,
                t.shared.join(", ")
            );
        }

        let _ = writeln!(
            out,
            "  Anti-triggers (collision above {:.2} is flagged):",
            self.collision_threshold
        );
        if self.anti_triggers.is_empty() {
            let _ = writeln!(out, "    -");
        }
        for t in &self.anti_triggers {
            let _ = writeln!(
                out,
                "    {:.2}  {}  [{}]",
                t.score,
                t.phrase,
                t.shared.join(", ")
            );
        }

        if !self.similar_pairs.is_empty() {
            let _ = writeln!(
                out,
                "  Similar trigger pairs (above {:.2}):",
                self.similarity_threshold
            );
            for p in &self.similar_pairs {
                let _ = writeln!(out, "    {:.2}  \"{}\" ~ \"{}\"", p.score, p.first, p.second);
            }
        }
        let _ = writeln!(out, "  Distinct triggers: {}", self.distinct_triggers);
        if !self.uncovered_terms.is_empty() {
            let _ = writeln!(
                out,
                "  Description terms no trigger uses: {}",
                self.uncovered_terms.join(", ")
            );
        }
        out
    }
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn warning(code: &'static str, message: String) -> Diagnostic {
    Diagnostic::warning(Component::Triggers, code, message).at(Location::file(SPEC_FILE))
}

fn score_against(stems: &StemSet, description: &StemSet, phrase: &str) -> PhraseScore {
    PhraseScore {
        phrase: phrase.to_string(),
        score: overlap(stems, description),
        shared: stems.intersection(description).cloned().collect(),
    }
}

/// Score triggers and anti-triggers. Never emits errors.
pub fn analyze(
    description: Option<&str>,
    triggers: &[TriggerPhrase],
    anti_triggers: &[TriggerPhrase],
    engine: &TokenEngine<'_>,
    expander: &SynonymExpander,
    thresholds: &TriggerThresholds,
) -> (TriggerAnalysis, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let base_description = description
        .map(|d| engine.normalize(d))
        .unwrap_or_default();
    let description_stems = expander.expand(&base_description);

    if triggers.is_empty() {
        diagnostics.push(warning("trigger.none", "No triggers declared".to_string()));
    }

    let mut trigger_scores = Vec::with_capacity(triggers.len());
    for trigger in triggers {
        let stems = trigger.stems(engine, expander);
        let score = score_against(stems, &description_stems, trigger.text());
        if stems.is_empty() {
            diagnostics.push(warning(
                "trigger.empty-phrase",
                format!("Trigger '{}' has no meaningful words", trigger.text()),
            ));
        } else if description.is_some() && score.score == 0.0 {
            diagnostics.push(warning(
                "trigger.no-description-overlap",
                format!(
                    "Trigger '{}' shares no terms with the description",
                    trigger.text()
                ),
            ));
        }
        trigger_scores.push(score);
    }

    let mut similar_pairs = Vec::new();
    for (i, a) in triggers.iter().enumerate() {
        for b in &triggers[i + 1..] {
            let score = overlap(a.stems(engine, expander), b.stems(engine, expander));
            if score > thresholds.similarity {
                diagnostics.push(warning(
                    "trigger.too-similar",
                    format!(
                        "Triggers '{}' and '{}' are near-duplicates (overlap {:.2})",
                        a.text(),
                        b.text(),
                        score
                    ),
                ));
                similar_pairs.push(PairScore {
                    first: a.text().to_string(),
                    second: b.text().to_string(),
                    score,
                });
            }
        }
    }

    let distinct_triggers = count_distinct(triggers, engine, expander, thresholds.similarity);
    if !triggers.is_empty() && distinct_triggers < thresholds.min_triggers {
        diagnostics.push(warning(
            "trigger.low-diversity",
            format!(
                "Only {} distinct trigger(s) out of {}; at least {} recommended",
                distinct_triggers,
                triggers.len(),
                thresholds.min_triggers
            ),
        ));
    }

    let mut anti_scores = Vec::with_capacity(anti_triggers.len());
    for anti in anti_triggers {
        let stems = anti.stems(engine, expander);
        let score = score_against(stems, &description_stems, anti.text());
        if stems.is_empty() {
            diagnostics.push(warning(
                "trigger.empty-phrase",
                format!("Anti-trigger '{}' has no meaningful words", anti.text()),
            ));
        } else if score.score > thresholds.collision {
            diagnostics.push(warning(
                "anti-trigger.collision",
                format!(
                    "Anti-trigger '{}' overlaps the description ({:.2}); it may activate the skill",
                    anti.text(),
                    score.score
                ),
            ));
        }
        anti_scores.push(score);
    }

    let mut uncovered_terms = Vec::new();
    if !triggers.is_empty() {
        let used: StemSet = triggers
            .iter()
            .flat_map(|t| t.stems(engine, expander).iter().cloned())
            .collect();
        uncovered_terms = base_description
            .iter()
            .filter(|s| s.chars().count() >= MIN_UNCOVERED_TERM_LEN && !used.contains(*s))
            .cloned()
            .collect();
        if !uncovered_terms.is_empty() {
            diagnostics.push(
                Diagnostic::info(
                    Component::Triggers,
                    "trigger.uncovered-terms",
                    format!(
                        "Description terms no trigger uses: {}",
                        uncovered_terms.join(", ")
                    ),
                )
                .at(Location::file(SPEC_FILE)),
            );
        }
    }

    let analysis = TriggerAnalysis {
        description_stems: description_stems.into_iter().collect(),
        triggers: trigger_scores,
        anti_triggers: anti_scores,
        similar_pairs,
        distinct_triggers,
        uncovered_terms,
        similarity_threshold: thresholds.similarity,
        collision_threshold: thresholds.collision,
    };
    (analysis, diagnostics)
}

/// Greedy count: a trigger is distinct when its overlap with every earlier
/// distinct trigger is at most `threshold`. Empty phrases never count.
fn count_distinct(
    triggers: &[TriggerPhrase],
    engine: &TokenEngine<'_>,
    expander: &SynonymExpander,
    threshold: f64,
) -> usize {
    let mut distinct: Vec<&StemSet> = Vec::new();
    for trigger in triggers {
        let stems = trigger.stems(engine, expander);
        if stems.is_empty() {
            continue;
        }
        if distinct.iter().all(|d| overlap(d, stems) <= threshold) {
            distinct.push(stems);
        }
    }
    distinct.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::text::Lexicon;

    fn phrases(items: &[&str]) -> Vec<TriggerPhrase> {
        items.iter().map(|s| TriggerPhrase::new(*s)).collect()
    }

    fn run(
        description: Option<&str>,
        triggers: &[&str],
        anti: &[&str],
    ) -> (TriggerAnalysis, Vec<Diagnostic>) {
        let lexicon = Lexicon::builtin();
        let engine = TokenEngine::new(&lexicon);
        let expander = SynonymExpander::new(&lexicon);
        analyze(
            description,
            &phrases(triggers),
            &phrases(anti),
            &engine,
            &expander,
            &TriggerThresholds::default(),
        )
    }

    const COMMIT_DESCRIPTION: &str =
        "Generate concise commit messages from staged diffs. Use when writing commits.";

    #[test]
    fn test_commit_trigger_matches_description() {
        let (analysis, diagnostics) = run(
            Some(COMMIT_DESCRIPTION),
            &["Write a commit message for my staged changes."],
            &["Rewrite git history and force push to main."],
        );
        assert!(analysis.triggers[0].score >= 0.3, "{}", analysis.triggers[0].score);
        assert!(analysis.triggers[0].shared.contains(&"commit".to_string()));
        assert!(analysis.anti_triggers[0].score < 0.05);
        assert!(diagnostics
            .iter()
            .all(|d| d.code != "anti-trigger.collision" && d.code != "trigger.no-description-overlap"));
    }

    #[test]
    fn test_near_identical_review_triggers() {
        let triggers = [
            "Review my PR",
            "Review this PR",
            "Review the pull request",
            "Please review my PR",
            "Review my pull requests",
        ];
        let (analysis, diagnostics) = run(
            Some("Review pull requests. Use when the user asks for a PR review."),
            &triggers,
            &[],
        );
        let similar = diagnostics
            .iter()
            .filter(|d| d.code == "trigger.too-similar")
            .count();
        assert!(similar >= 4, "{}", similar);
        assert_eq!(analysis.similar_pairs.len(), similar);
        assert!(analysis.distinct_triggers < 5);
        assert!(diagnostics.iter().any(|d| d.code == "trigger.low-diversity"));
    }

    #[test]
    fn test_review_pr_rephrasings_collapse() {
        let triggers = [
            "Review this PR",
            "Review my PR",
            "Review the PR",
            "Can you review this PR?",
            "Please review my PR",
        ];
        let (analysis, diagnostics) = run(None, &triggers, &[]);
        assert_eq!(analysis.similar_pairs.len(), 10);
        assert_eq!(analysis.distinct_triggers, 1);
        let too_similar = diagnostics
            .iter()
            .filter(|d| d.code == "trigger.too-similar")
            .count();
        assert_eq!(too_similar, 10);
        assert_eq!(
            diagnostics
                .iter()
                .filter(|d| d.code == "trigger.low-diversity")
                .count(),
            1
        );
    }

    #[test]
    fn test_never_emits_errors() {
        let (_, diagnostics) = run(None, &["", "the a an", "deploy"], &["", "deploy now"]);
        assert!(diagnostics.iter().all(|d| d.severity != Severity::Error));
        assert_eq!(
            diagnostics
                .iter()
                .filter(|d| d.code == "trigger.empty-phrase")
                .count(),
            3
        );
    }

    #[test]
    fn test_no_triggers() {
        let (analysis, diagnostics) = run(Some(COMMIT_DESCRIPTION), &[], &[]);
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["trigger.none"]);
        assert_eq!(analysis.distinct_triggers, 0);
    }

    #[test]
    fn test_collision_and_no_overlap() {
        let (_, diagnostics) = run(
            Some("Deploy the release pipeline. Use when shipping."),
            &["Bake a cake"],
            &["Deploy the release pipeline"],
        );
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert!(codes.contains(&"trigger.no-description-overlap"));
        assert!(codes.contains(&"anti-trigger.collision"));
    }

    #[test]
    fn test_distinct_triggers_counted_greedily() {
        let (analysis, diagnostics) = run(
            Some("Use when working with databases."),
            &[
                "Migrate the database schema",
                "Back up production data",
                "Restore a snapshot",
                "Tune slow queries",
                "Rotate database credentials",
            ],
            &[],
        );
        assert_eq!(analysis.distinct_triggers, 5);
        assert!(diagnostics.iter().all(|d| d.code != "trigger.low-diversity"));
    }

    #[test]
    fn test_uncovered_terms_and_table() {
        let (analysis, diagnostics) = run(
            Some(COMMIT_DESCRIPTION),
            &["Write a commit message for my staged changes."],
            &[],
        );
        assert_eq!(analysis.uncovered_terms, vec!["concis", "generat"]);
        assert!(diagnostics.iter().any(|d| d.code == "trigger.uncovered-terms"));

        let table = analysis.render_table();
        assert!(table.contains(DISCLAIMER));
        assert!(table.contains("Write a commit message for my staged changes."));
        assert!(table.contains("Distinct triggers: 1"));
    }
}
