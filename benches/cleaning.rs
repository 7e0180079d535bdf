use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array1;
use rand::prelude::*;
use salary_estimator::data::{rows_to_frame, CandidateRow, Seniority};
use salary_estimator::preprocessing::{
    CategoryBalancer, ColumnEncoder, ExperienceScorer, SalaryScorer, TargetEncoder,
};
use salary_estimator::rules::tables::{experience_rules, salary_rules};

const JOBS: [&str; 6] = ["Backend", "Frontend", "QA", "DevOps", "Data", "Mobile"];
const ENGLISH: [&str; 4] = ["Pre-Intermediate", "Intermediate", "Upper-Intermediate", "Advanced"];

fn create_survey(n_rows: usize) -> Vec<CandidateRow> {
    let mut rng = rand::thread_rng();
    (0..n_rows)
        .map(|_| {
            let level = Seniority::RATED[rng.gen_range(0..Seniority::RATED.len())];
            CandidateRow::new(
                JOBS[rng.gen_range(0..JOBS.len())],
                level,
                ENGLISH[rng.gen_range(0..ENGLISH.len())],
                rng.gen::<f64>() * 20.0,
                300.0 + rng.gen::<f64>() * 12000.0,
            )
        })
        .collect()
}

fn bench_outlier_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("outlier_passes");
    let experience = ExperienceScorer::new(experience_rules());
    let salary = SalaryScorer::new(salary_rules());

    for n_rows in [1000, 10000, 50000].iter() {
        let rows = create_survey(*n_rows);
        group.bench_with_input(BenchmarkId::new("clean", n_rows), &rows, |b, rows| {
            b.iter(|| {
                let (kept, _) = experience.clean(black_box(rows.clone()));
                salary.clean(kept)
            })
        });
    }

    group.finish();
}

fn bench_balancer(c: &mut Criterion) {
    let rows = create_survey(20000);
    let balancer = CategoryBalancer::new()
        .with_target("Backend", 1000)
        .with_target("Frontend", 1000);

    c.bench_function("balance_20000", |b| {
        b.iter(|| balancer.balance(black_box(rows.clone())))
    });
}

fn bench_target_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("target_encoding");
    group.sample_size(20);

    for n_rows in [1000, 10000].iter() {
        let rows = create_survey(*n_rows);
        let df = rows_to_frame(&rows).unwrap();
        let y: Array1<f64> = rows.iter().map(|r| r.salary_usd).collect();
        let cols = ["job_category", "seniority_level"];

        group.bench_with_input(BenchmarkId::new("fit_transform_cv5", n_rows), &df, |b, df| {
            b.iter(|| {
                let mut enc = TargetEncoder::new();
                enc.fit_transform(black_box(df), &cols, Some(&y)).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_outlier_passes, bench_balancer, bench_target_encoding);
criterion_main!(benches);
