//! Stratified downsampling of over-represented job categories

use crate::data::CandidateRow;
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Downsamples selected job categories toward a target row count.
///
/// Rows of a balanced category are grouped into (seniority, salary) strata
/// and each stratum keeps `min(size, max(1, target * size / total))` rows,
/// drawn without replacement. Nothing is ever duplicated.
#[derive(Debug, Clone)]
pub struct CategoryBalancer {
    targets: Vec<(String, usize)>,
    seed: u64,
}

impl Default for CategoryBalancer {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            seed: 42,
        }
    }
}

impl CategoryBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance targets in key order
    pub fn from_targets(targets: &BTreeMap<String, usize>) -> Self {
        Self {
            targets: targets.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            ..Self::default()
        }
    }

    /// Add a category with its target count
    pub fn with_target(mut self, category: impl Into<String>, count: usize) -> Self {
        self.targets.push((category.into(), count));
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn targets(&self) -> &[(String, usize)] {
        &self.targets
    }

    /// Rows of untouched categories first, in input order, then the sampled
    /// rows of each balanced category in target order
    pub fn balance(&self, rows: Vec<CandidateRow>) -> Vec<CandidateRow> {
        if self.targets.is_empty() {
            return rows;
        }

        let balanced: HashSet<&str> = self.targets.iter().map(|(c, _)| c.as_str()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let input = rows.len();

        let mut keep: Vec<usize> = (0..rows.len())
            .filter(|&i| !balanced.contains(rows[i].job_category.as_str()))
            .collect();

        for (category, target) in &self.targets {
            let mut members: Vec<usize> = (0..rows.len())
                .filter(|&i| rows[i].job_category == *category)
                .collect();
            if members.is_empty() {
                debug!(category = %category, "No rows to balance");
                continue;
            }

            let total = members.len();
            members.sort_by(|&a, &b| {
                rows[a]
                    .seniority_level
                    .cmp(&rows[b].seniority_level)
                    .then(rows[a].salary_usd.total_cmp(&rows[b].salary_usd))
            });

            let mut sampled = 0usize;
            for stratum in strata(&rows, &members) {
                let size = stratum.len();
                let quota = (target * size / total).max(1).min(size);
                let mut picked: Vec<usize> = index::sample(&mut rng, size, quota)
                    .into_iter()
                    .map(|k| stratum[k])
                    .collect();
                picked.sort_unstable();
                sampled += picked.len();
                keep.extend(picked);
            }

            info!(category = %category, before = total, after = sampled, target, "Balanced category");
        }

        let mut rows: Vec<Option<CandidateRow>> = rows.into_iter().map(Some).collect();
        let out: Vec<CandidateRow> = keep.into_iter().filter_map(|i| rows[i].take()).collect();
        info!(before = input, after = out.len(), "Category balancing complete");
        out
    }
}

/// Split sorted member positions into runs of equal (seniority, salary)
fn strata<'a>(rows: &[CandidateRow], members: &'a [usize]) -> Vec<&'a [usize]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for end in 1..=members.len() {
        let boundary = end == members.len() || {
            let (a, b) = (&rows[members[start]], &rows[members[end]]);
            a.seniority_level != b.seniority_level || a.salary_usd != b.salary_usd
        };
        if boundary {
            groups.push(&members[start..end]);
            start = end;
        }
    }
    groups
}
