//! Rule-based outlier scoring conditioned on seniority
//!
//! Each value is scored independently against its level's rule, so a pass is
//! a pure per-row map followed by a filter. Rows scoring 0.5 or more are
//! dropped; the score itself is never stored on the row.

use crate::data::{CandidateRow, Seniority};
use crate::rules::{BandedRule, ExperienceRule, RuleTable, SalaryRule};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Continuity score of a value relative to its level's rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutlierScore {
    /// 0.0
    Typical,
    /// 0.25
    Acceptable,
    /// 0.5
    Suspicious,
    /// 0.75
    Outlier,
    /// 1.0
    Critical,
}

impl OutlierScore {
    pub fn value(&self) -> f64 {
        match self {
            OutlierScore::Typical => 0.0,
            OutlierScore::Acceptable => 0.25,
            OutlierScore::Suspicious => 0.5,
            OutlierScore::Outlier => 0.75,
            OutlierScore::Critical => 1.0,
        }
    }

    /// Rows at or above 0.5 leave the dataset
    pub fn is_dropped(&self) -> bool {
        self.value() >= 0.5
    }
}

impl fmt::Display for OutlierScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Branch of the scoring rules that produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreReason {
    /// No rule for the level
    NoRule,
    /// Above `max_outlier`
    AboveMaximum,
    Typical,
    Acceptable,
    /// Experience below `critical_outlier`
    BelowCritical,
    /// Experience below `outlier_threshold`
    BelowThreshold,
    /// Experience past both thresholds
    OutsideThresholds,
    /// Salary inside `outlier_range`
    InOutlierRange,
    /// Salary inside `critical_range`
    InCriticalRange,
    /// Salary outside every range
    BeyondCritical,
}

/// Score plus the branch that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredValue {
    pub score: OutlierScore,
    pub reason: ScoreReason,
}

impl ScoredValue {
    fn new(score: OutlierScore, reason: ScoreReason) -> Self {
        Self { score, reason }
    }
}

/// Dimension a rule table is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Experience,
    Salary,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Experience => f.write_str("experience"),
            Dimension::Salary => f.write_str("salary"),
        }
    }
}

/// A rule that knows how to score values past its acceptable band
pub trait OutlierRule: BandedRule + Sync {
    const DIMENSION: Dimension;

    /// Value of the row this rule applies to
    fn value_of(row: &CandidateRow) -> f64;

    /// Score for values outside the acceptable band
    fn score_tail(&self, value: f64) -> ScoredValue;
}

impl OutlierRule for ExperienceRule {
    const DIMENSION: Dimension = Dimension::Experience;

    fn value_of(row: &CandidateRow) -> f64 {
        row.experience_years
    }

    fn score_tail(&self, value: f64) -> ScoredValue {
        if value < self.critical_outlier {
            ScoredValue::new(OutlierScore::Outlier, ScoreReason::BelowCritical)
        } else if value < self.outlier_threshold {
            ScoredValue::new(OutlierScore::Suspicious, ScoreReason::BelowThreshold)
        } else {
            ScoredValue::new(OutlierScore::Critical, ScoreReason::OutsideThresholds)
        }
    }
}

impl OutlierRule for SalaryRule {
    const DIMENSION: Dimension = Dimension::Salary;

    fn value_of(row: &CandidateRow) -> f64 {
        row.salary_usd
    }

    fn score_tail(&self, value: f64) -> ScoredValue {
        // The last two branches both yield 1.0; they stay separate so the
        // reason tells them apart.
        if self.outlier_range.contains(value) {
            ScoredValue::new(OutlierScore::Outlier, ScoreReason::InOutlierRange)
        } else if self.critical_range.contains(value) {
            ScoredValue::new(OutlierScore::Critical, ScoreReason::InCriticalRange)
        } else {
            ScoredValue::new(OutlierScore::Critical, ScoreReason::BeyondCritical)
        }
    }
}

/// Score one value against an optional rule. First matching branch wins.
pub fn score_value<R: OutlierRule>(rule: Option<&R>, value: f64) -> ScoredValue {
    let Some(rule) = rule else {
        return ScoredValue::new(OutlierScore::Typical, ScoreReason::NoRule);
    };

    if let Some(max) = rule.max_outlier() {
        if value > max {
            return ScoredValue::new(OutlierScore::Critical, ScoreReason::AboveMaximum);
        }
    }
    if rule.typical_range().contains(value) {
        return ScoredValue::new(OutlierScore::Typical, ScoreReason::Typical);
    }
    if rule.acceptable_range().contains(value) {
        return ScoredValue::new(OutlierScore::Acceptable, ScoreReason::Acceptable);
    }
    rule.score_tail(value)
}

/// Outcome of one cleaning pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassSummary {
    pub dimension: Dimension,
    pub kept: usize,
    pub dropped: usize,
    /// Rows per score, before filtering
    pub histogram: BTreeMap<OutlierScore, usize>,
}

/// Scores one dimension of candidate rows against a rule table
#[derive(Debug, Clone)]
pub struct OutlierScorer<R> {
    rules: RuleTable<R>,
}

/// Scorer over years of experience
pub type ExperienceScorer = OutlierScorer<ExperienceRule>;
/// Scorer over monthly salary
pub type SalaryScorer = OutlierScorer<SalaryRule>;

impl<R: OutlierRule> OutlierScorer<R> {
    pub fn new(rules: RuleTable<R>) -> Self {
        Self { rules }
    }

    pub fn dimension(&self) -> Dimension {
        R::DIMENSION
    }

    pub fn rules(&self) -> &RuleTable<R> {
        &self.rules
    }

    /// Score a value for a level; unknown levels score 0.0
    pub fn score(&self, seniority: Seniority, value: f64) -> ScoredValue {
        score_value(self.rules.get(seniority), value)
    }

    /// Score of a whole row on this scorer's dimension
    pub fn score_row(&self, row: &CandidateRow) -> ScoredValue {
        self.score(row.seniority_level, R::value_of(row))
    }

    /// Keep the rows scoring below 0.5
    pub fn clean(&self, rows: Vec<CandidateRow>) -> (Vec<CandidateRow>, PassSummary) {
        let scores: Vec<ScoredValue> = rows.par_iter().map(|row| self.score_row(row)).collect();

        let mut histogram = BTreeMap::new();
        for s in &scores {
            *histogram.entry(s.score).or_insert(0usize) += 1;
        }

        let total = rows.len();
        let kept: Vec<CandidateRow> = rows
            .into_iter()
            .zip(scores)
            .filter_map(|(row, s)| {
                if s.score.is_dropped() {
                    debug!(
                        dimension = %R::DIMENSION,
                        seniority = %row.seniority_level,
                        value = R::value_of(&row),
                        score = s.score.value(),
                        reason = ?s.reason,
                        "Dropping outlier"
                    );
                    None
                } else {
                    Some(row)
                }
            })
            .collect();

        let summary = PassSummary {
            dimension: R::DIMENSION,
            kept: kept.len(),
            dropped: total - kept.len(),
            histogram,
        };
        info!(
            dimension = %summary.dimension,
            kept = summary.kept,
            dropped = summary.dropped,
            "Outlier pass complete"
        );
        (kept, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tables::{experience_rules, salary_rules};

    #[test]
    fn test_typical_bounds_score_zero() {
        let exp = ExperienceScorer::new(experience_rules());
        let sal = SalaryScorer::new(salary_rules());
        for level in Seniority::RATED {
            let e = exp.rules().get(level).unwrap().typical_range;
            assert_eq!(exp.score(level, e.lo).score, OutlierScore::Typical);
            assert_eq!(exp.score(level, e.hi).score, OutlierScore::Typical);
            let s = sal.rules().get(level).unwrap().typical_range;
            assert_eq!(sal.score(level, s.lo).score, OutlierScore::Typical);
            assert_eq!(sal.score(level, s.hi).score, OutlierScore::Typical);
        }
    }

    #[test]
    fn test_above_max_outlier_is_critical() {
        let exp = ExperienceScorer::new(experience_rules());
        for (level, rule) in exp.rules().iter() {
            if let Some(max) = rule.max_outlier {
                let scored = exp.score(*level, max + 0.5);
                assert_eq!(scored.score, OutlierScore::Critical);
                assert_eq!(scored.reason, ScoreReason::AboveMaximum);
            }
        }
    }

    #[test]
    fn test_junior_experience_bands() {
        let exp = ExperienceScorer::new(experience_rules());
        assert_eq!(exp.score(Seniority::Junior, 3.0).score, OutlierScore::Acceptable);
        // Past the acceptable band and both thresholds (4, 5)
        assert_eq!(exp.score(Seniority::Junior, 6.0).score, OutlierScore::Critical);
        // 3.5 < x < 4: below critical_outlier=5 first
        assert_eq!(exp.score(Seniority::Junior, 3.8).score, OutlierScore::Outlier);
    }

    #[test]
    fn test_senior_low_experience_branches() {
        let exp = ExperienceScorer::new(experience_rules());
        // critical_outlier=1, outlier_threshold=2
        let very_low = exp.score(Seniority::Senior, 0.5);
        assert_eq!(very_low.score, OutlierScore::Outlier);
        assert_eq!(very_low.reason, ScoreReason::BelowCritical);

        let low = exp.score(Seniority::Senior, 1.5);
        assert_eq!(low.score, OutlierScore::Suspicious);
        assert_eq!(low.reason, ScoreReason::BelowThreshold);

        let two = exp.score(Seniority::Senior, 2.0);
        let twenty_five = exp.score(Seniority::Senior, 25.0);
        assert_eq!(two.reason, ScoreReason::OutsideThresholds);
        assert_eq!(twenty_five.reason, ScoreReason::AboveMaximum);
        assert!(two.score.is_dropped());
        assert!(twenty_five.score.is_dropped());
    }

    #[test]
    fn test_salary_tail_branches() {
        let sal = SalaryScorer::new(salary_rules());
        // Senior: acceptable 2500-7000, outlier 2000-8500, critical 1500-10000
        let in_outlier = sal.score(Seniority::Senior, 8000.0);
        assert_eq!(in_outlier.score, OutlierScore::Outlier);
        assert_eq!(in_outlier.reason, ScoreReason::InOutlierRange);

        let in_critical = sal.score(Seniority::Senior, 9500.0);
        assert_eq!(in_critical.score, OutlierScore::Critical);
        assert_eq!(in_critical.reason, ScoreReason::InCriticalRange);

        let beyond = sal.score(Seniority::Senior, 50_000.0);
        assert_eq!(beyond.score, OutlierScore::Critical);
        assert_eq!(beyond.reason, ScoreReason::BeyondCritical);
    }

    #[test]
    fn test_unknown_level_scores_zero() {
        let exp = ExperienceScorer::new(experience_rules());
        let scored = exp.score(Seniority::NotSpecified, 99.0);
        assert_eq!(scored.score, OutlierScore::Typical);
        assert_eq!(scored.reason, ScoreReason::NoRule);
    }

    #[test]
    fn test_clean_drops_half_and_above() {
        let exp = ExperienceScorer::new(experience_rules());
        let rows = vec![
            CandidateRow::new("Backend", Seniority::Senior, "Advanced", 6.0, 4000.0),
            CandidateRow::new("Backend", Seniority::Senior, "Advanced", 1.5, 4000.0),
            CandidateRow::new("Backend", Seniority::Senior, "Advanced", 11.0, 4000.0),
            CandidateRow::new("Backend", Seniority::Senior, "Advanced", 30.0, 4000.0),
        ];
        let (kept, summary) = exp.clean(rows);
        assert_eq!(kept.len(), 2);
        assert_eq!(summary.dropped, 2);
        assert_eq!(summary.histogram.get(&OutlierScore::Acceptable), Some(&1));
        assert_eq!(summary.histogram.get(&OutlierScore::Suspicious), Some(&1));
    }
}
