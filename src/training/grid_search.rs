//! Exhaustive hyper-parameter search scored by cross-validated R²

use super::catalog::{HyperParams, ModelFamily};
use super::cross_validation::{CVResults, KFold};
use super::models::r2_score;
use super::pipeline::SalaryPipeline;
use super::split::{take_rows, take_values};
use crate::error::{Result, SalaryError};
use crate::preprocessing::FeaturePreprocessor;
use ndarray::Array1;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cross-validation outcome of one grid candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: HyperParams,
    /// Mean fold R², `-inf` when any fold failed
    pub mean_score: f64,
    pub fold_scores: Vec<f64>,
}

/// Winner of a search, refitted on the whole training split
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: HyperParams,
    pub best_score: f64,
    pub pipeline: SalaryPipeline,
    pub candidates: Vec<CandidateScore>,
}

/// Grid search over one model family
#[derive(Debug, Clone)]
pub struct GridSearch {
    family: ModelFamily,
    cv_folds: usize,
    preprocessor: FeaturePreprocessor,
}

impl GridSearch {
    pub fn new(family: ModelFamily, preprocessor: FeaturePreprocessor) -> Self {
        Self {
            family,
            cv_folds: 5,
            preprocessor,
        }
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    fn pipeline_for(&self, params: &HyperParams) -> Result<SalaryPipeline> {
        Ok(SalaryPipeline::new(
            self.preprocessor.clone(),
            self.family.build(params)?,
        ))
    }

    fn evaluate(&self, params: &HyperParams, x: &DataFrame, y: &Array1<f64>) -> Result<CVResults> {
        let folds = KFold::new(self.cv_folds).split(x.height())?;
        let mut scores = Vec::with_capacity(folds.len());
        for fold in &folds {
            let mut pipeline = self.pipeline_for(params)?;
            pipeline.fit(
                &take_rows(x, &fold.train_indices)?,
                &take_values(y, &fold.train_indices),
            )?;
            let predicted = pipeline.predict(&take_rows(x, &fold.test_indices)?)?;
            scores.push(r2_score(&take_values(y, &fold.test_indices), &predicted));
        }
        Ok(CVResults::from_scores(scores))
    }

    /// Score every candidate, keep the first best and refit it on `x`/`y`
    pub fn run(&self, x: &DataFrame, y: &Array1<f64>) -> Result<GridSearchResult> {
        let grid = self.family.param_grid().expand();
        let family = self.family;

        let candidates: Vec<CandidateScore> = grid
            .par_iter()
            .map(|params| match self.evaluate(params, x, y) {
                Ok(cv) if cv.mean_score.is_finite() => CandidateScore {
                    params: params.clone(),
                    mean_score: cv.mean_score,
                    fold_scores: cv.scores,
                },
                Ok(_) => {
                    debug!(%family, "Candidate produced a non-finite score");
                    CandidateScore::failed(params)
                }
                Err(e) => {
                    debug!(%family, error = %e, "Candidate failed");
                    CandidateScore::failed(params)
                }
            })
            .collect();

        let mut best: Option<usize> = None;
        for (idx, candidate) in candidates.iter().enumerate() {
            if candidate.mean_score == f64::NEG_INFINITY {
                continue;
            }
            if best.map_or(true, |b| candidate.mean_score > candidates[b].mean_score) {
                best = Some(idx);
            }
        }
        let best = best.ok_or_else(|| {
            SalaryError::TrainingError(format!("every {} candidate failed", family))
        })?;
        let best_params = candidates[best].params.clone();
        let best_score = candidates[best].mean_score;

        info!(
            %family,
            candidates = candidates.len(),
            best_score,
            "Grid search finished"
        );

        let mut pipeline = self.pipeline_for(&best_params)?;
        pipeline.fit(x, y)?;

        Ok(GridSearchResult {
            best_params,
            best_score,
            pipeline,
            candidates,
        })
    }
}

impl CandidateScore {
    fn failed(params: &HyperParams) -> Self {
        Self {
            params: params.clone(),
            mean_score: f64::NEG_INFINITY,
            fold_scores: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::training::catalog::ParamValue;

    fn salary_frame(n: usize) -> (DataFrame, Array1<f64>) {
        let jobs = ["Backend", "Frontend", "QA", "DevOps"];
        let levels = ["Junior", "Middle", "Senior"];
        let english = ["Pre-Intermediate", "Intermediate", "Upper-Intermediate", "Advanced"];

        let mut job = Vec::with_capacity(n);
        let mut seniority = Vec::with_capacity(n);
        let mut eng = Vec::with_capacity(n);
        let mut exp = Vec::with_capacity(n);
        let mut salary = Vec::with_capacity(n);
        for i in 0..n {
            let level = i % 3;
            let years = 1.0 + level as f64 * 3.0 + (i % 5) as f64 * 0.5;
            job.push(jobs[i % 4]);
            seniority.push(levels[level]);
            eng.push(english[i % 4]);
            exp.push(years);
            salary.push(800.0 + level as f64 * 1500.0 + years * 100.0 + (i % 4) as f64 * 50.0);
        }
        let df = df!(
            "job_category" => job,
            "seniority_level" => seniority,
            "english_level" => eng,
            "experience_years" => exp
        )
        .unwrap();
        (df, Array1::from(salary))
    }

    #[test]
    fn test_ridge_search_picks_a_candidate() {
        let (x, y) = salary_frame(60);
        let pre = FeaturePreprocessor::from_config(&PipelineConfig {
            encoder_cv: 3,
            ..PipelineConfig::default()
        });
        let result = GridSearch::new(ModelFamily::Ridge, pre).run(&x, &y).unwrap();

        assert_eq!(result.candidates.len(), 6);
        assert!(result.best_score > 0.5);
        assert!(result
            .candidates
            .iter()
            .all(|c| c.mean_score <= result.best_score));
        assert!(matches!(result.best_params["alpha"], ParamValue::Float(_)));
        assert_eq!(result.pipeline.predict(&x).unwrap().len(), 60);
    }

    #[test]
    fn test_too_few_rows_fails_every_candidate() {
        let (x, y) = salary_frame(3);
        let err = GridSearch::new(ModelFamily::LinearRegression, FeaturePreprocessor::new())
            .run(&x, &y)
            .unwrap_err();
        assert!(matches!(err, SalaryError::TrainingError(_)));
    }
}
