//! Integration test: rule tables, outlier passes and category balancing

use salary_estimator::config::AppConfig;
use salary_estimator::data::{frame_to_rows, CandidateRow, DataLoader, Seniority};
use salary_estimator::pipeline::clean_rows;
use salary_estimator::preprocessing::{
    CategoryBalancer, ExperienceScorer, OutlierScore, SalaryScorer, ScoreReason,
};
use salary_estimator::rules::tables::{experience_rules, salary_rules};
use std::collections::HashSet;
use std::io::Write;

#[test]
fn test_typical_boundaries_score_zero() {
    let experience = ExperienceScorer::new(experience_rules());
    for (level, rule) in experience.rules().iter() {
        assert_eq!(experience.score(*level, rule.typical_range.lo).score, OutlierScore::Typical);
        assert_eq!(experience.score(*level, rule.typical_range.hi).score, OutlierScore::Typical);
    }

    let salary = SalaryScorer::new(salary_rules());
    for (level, rule) in salary.rules().iter() {
        assert_eq!(salary.score(*level, rule.typical_range.lo).score, OutlierScore::Typical);
        assert_eq!(salary.score(*level, rule.typical_range.hi).score, OutlierScore::Typical);
    }
}

#[test]
fn test_above_maximum_scores_one() {
    let experience = ExperienceScorer::new(experience_rules());
    let mut checked = 0;
    for (level, rule) in experience.rules().iter() {
        if let Some(max) = rule.max_outlier {
            let scored = experience.score(*level, max + 0.1);
            assert_eq!(scored.score, OutlierScore::Critical);
            assert_eq!(scored.reason, ScoreReason::AboveMaximum);
            checked += 1;
        }
    }
    assert!(checked >= 4);
}

#[test]
fn test_senior_experience_extremes_take_different_branches() {
    let experience = ExperienceScorer::new(experience_rules());

    let low = experience.score(Seniority::Senior, 2.0);
    let high = experience.score(Seniority::Senior, 25.0);
    assert!(low.score.is_dropped());
    assert!(high.score.is_dropped());
    assert_eq!(low.score.value(), 1.0);
    assert_eq!(high.score.value(), 1.0);
    assert_eq!(low.reason, ScoreReason::OutsideThresholds);
    assert_eq!(high.reason, ScoreReason::AboveMaximum);
}

#[test]
fn test_senior_row_survives_both_passes() {
    let rows = vec![CandidateRow::new(
        "Backend",
        Seniority::Senior,
        "Upper-Intermediate",
        6.0,
        4000.0,
    )];
    let cleaned = clean_rows(&AppConfig::default(), rows.clone()).unwrap();
    assert_eq!(cleaned.rows, rows);
    assert_eq!(cleaned.experience.dropped, 0);
    assert_eq!(cleaned.salary.dropped, 0);
}

#[test]
fn test_salary_pass_sees_experience_clean_rows() {
    let rows = vec![
        CandidateRow::new("QA", Seniority::Junior, "Intermediate", 1.0, 1000.0),
        // experience outlier with an outlying salary: only the experience pass counts it
        CandidateRow::new("QA", Seniority::Junior, "Intermediate", 6.0, 9000.0),
        CandidateRow::new("QA", Seniority::Junior, "Intermediate", 2.0, 9000.0),
    ];
    let cleaned = clean_rows(&AppConfig::default(), rows).unwrap();
    assert_eq!(cleaned.experience.kept, 2);
    assert_eq!(cleaned.experience.dropped, 1);
    assert_eq!(cleaned.salary.kept, 1);
    assert_eq!(cleaned.salary.dropped, 1);
}

#[test]
fn test_balancer_equal_strata() {
    let mut rows = Vec::new();
    for stratum in 0..5 {
        for _ in 0..40 {
            rows.push(CandidateRow::new(
                "Frontend",
                Seniority::Middle,
                "Intermediate",
                3.0,
                2000.0 + stratum as f64 * 100.0,
            ));
        }
    }
    rows.push(CandidateRow::new("QA", Seniority::Junior, "Intermediate", 1.0, 900.0));

    let out = CategoryBalancer::new().with_target("Frontend", 100).balance(rows);
    let frontend: Vec<&CandidateRow> = out.iter().filter(|r| r.job_category == "Frontend").collect();
    assert!(frontend.len() <= 100);

    let salaries: HashSet<i64> = frontend.iter().map(|r| r.salary_usd as i64).collect();
    assert_eq!(salaries.len(), 5);
    assert_eq!(out[0].job_category, "QA");
}

#[test]
fn test_balancer_tiny_strata_keep_one_row() {
    let mut rows = Vec::new();
    for i in 0..50 {
        rows.push(CandidateRow::new("Backend", Seniority::Senior, "Advanced", 6.0, 4000.0 + i as f64));
    }
    let out = CategoryBalancer::new().with_target("Backend", 10).balance(rows);
    // 50 singleton strata, each keeps max(1, 10 * 1 / 50) = 1 row
    assert_eq!(out.len(), 50);
}

#[test]
fn test_raw_titles_are_standardized_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "job_category,seniority_level,english_level,experience_years,salary_usd").unwrap();
    writeln!(file, "Backend,Lead / Team Lead,Advanced,8,6000").unwrap();
    writeln!(file, "QA,Intern/Trainee,Intermediate,0.5,400").unwrap();
    writeln!(file, "DevOps,Principal,Upper-Intermediate,12,8000").unwrap();
    writeln!(file, "Design,Немає тайтлу,Intermediate,3,2000").unwrap();
    drop(file);

    let df = DataLoader::new().load_csv(&path).unwrap();
    let rows = frame_to_rows(&df).unwrap();
    let levels: Vec<Seniority> = rows.iter().map(|r| r.seniority_level).collect();
    assert_eq!(
        levels,
        vec![
            Seniority::Lead,
            Seniority::Intern,
            Seniority::StaffPlus,
            Seniority::NotSpecified
        ]
    );

    let cleaned = clean_rows(&AppConfig::default(), rows).unwrap();
    assert_eq!(cleaned.specified, 3);
}
