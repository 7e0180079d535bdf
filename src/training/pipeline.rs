//! Preprocessor + regressor as one fitted unit

use super::decision_tree::DecisionTreeRegressor;
use super::gradient_boosting::GradientBoostingRegressor;
use super::hist_gradient_boosting::HistGradientBoostingRegressor;
use super::knn::KNNRegressor;
use super::linear_models::{
    ElasticNetRegression, HuberRegressor, LassoRegression, LinearRegression, RidgeRegression,
};
use super::models::Regressor;
use super::random_forest::RandomForestRegressor;
use super::svm::SVRRegressor;
use super::xgboost::XGBoostRegressor;
use crate::error::Result;
use crate::preprocessing::FeaturePreprocessor;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Any regressor of the catalog, serializable with its family tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedRegressor {
    Linear(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    ElasticNet(ElasticNetRegression),
    Svr(SVRRegressor),
    Knn(KNNRegressor),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
    XGBoost(XGBoostRegressor),
    Huber(HuberRegressor),
    HistGbm(HistGradientBoostingRegressor),
}

impl TrainedRegressor {
    fn inner(&self) -> &dyn Regressor {
        match self {
            TrainedRegressor::Linear(m) => m,
            TrainedRegressor::Ridge(m) => m,
            TrainedRegressor::Lasso(m) => m,
            TrainedRegressor::ElasticNet(m) => m,
            TrainedRegressor::Svr(m) => m,
            TrainedRegressor::Knn(m) => m,
            TrainedRegressor::DecisionTree(m) => m,
            TrainedRegressor::RandomForest(m) => m,
            TrainedRegressor::GradientBoosting(m) => m,
            TrainedRegressor::XGBoost(m) => m,
            TrainedRegressor::Huber(m) => m,
            TrainedRegressor::HistGbm(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            TrainedRegressor::Linear(m) => m,
            TrainedRegressor::Ridge(m) => m,
            TrainedRegressor::Lasso(m) => m,
            TrainedRegressor::ElasticNet(m) => m,
            TrainedRegressor::Svr(m) => m,
            TrainedRegressor::Knn(m) => m,
            TrainedRegressor::DecisionTree(m) => m,
            TrainedRegressor::RandomForest(m) => m,
            TrainedRegressor::GradientBoosting(m) => m,
            TrainedRegressor::XGBoost(m) => m,
            TrainedRegressor::Huber(m) => m,
            TrainedRegressor::HistGbm(m) => m,
        }
    }
}

impl Regressor for TrainedRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }
}

/// Feature preprocessing followed by a regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryPipeline {
    preprocessor: FeaturePreprocessor,
    model: TrainedRegressor,
}

impl SalaryPipeline {
    pub fn new(preprocessor: FeaturePreprocessor, model: TrainedRegressor) -> Self {
        Self {
            preprocessor,
            model,
        }
    }

    /// Fit the preprocessor with out-of-fold encodings, then the model
    pub fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<()> {
        let features = self.preprocessor.fit_transform(x, y)?;
        self.model.fit(&features, y)
    }

    pub fn predict(&self, x: &DataFrame) -> Result<Array1<f64>> {
        let features = self.preprocessor.transform(x)?;
        self.model.predict(&features)
    }

    pub fn preprocessor(&self) -> &FeaturePreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &TrainedRegressor {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use ndarray::array;

    #[test]
    fn test_pipeline_round_trips_through_json() {
        let x = df!(
            "job_category" => &["Backend", "QA", "Backend", "QA", "Backend", "QA"],
            "seniority_level" => &["Senior", "Junior", "Middle", "Junior", "Senior", "Middle"],
            "english_level" => &["Advanced", "Intermediate", "Intermediate", "Elementary", "Upper-Intermediate", "Advanced"],
            "experience_years" => &[6.0, 1.0, 3.0, 0.5, 7.0, 3.5]
        )
        .unwrap();
        let y = array![4000.0, 900.0, 2200.0, 700.0, 4500.0, 2400.0];

        let cfg = PipelineConfig { encoder_cv: 3, ..PipelineConfig::default() };
        let mut pipeline = SalaryPipeline::new(
            FeaturePreprocessor::from_config(&cfg),
            TrainedRegressor::Ridge(RidgeRegression::new(1.0)),
        );
        pipeline.fit(&x, &y).unwrap();
        let before = pipeline.predict(&x).unwrap();

        let json = serde_json::to_string(&pipeline).unwrap();
        let restored: SalaryPipeline = serde_json::from_str(&json).unwrap();
        let after = restored.predict(&x).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
