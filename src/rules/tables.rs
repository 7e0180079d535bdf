//! Builtin rule tables for the IT salary survey

use super::{ExperienceRule, ExperienceRules, RuleTable, SalaryRule, SalaryRules, ValueRange};
use crate::data::Seniority;
use std::collections::BTreeMap;

const fn r(lo: f64, hi: f64) -> ValueRange {
    ValueRange::new(lo, hi)
}

fn experience(
    typical: ValueRange,
    acceptable: ValueRange,
    outlier_threshold: f64,
    critical_outlier: f64,
    max_outlier: Option<f64>,
) -> ExperienceRule {
    ExperienceRule {
        typical_range: typical,
        acceptable_range: acceptable,
        outlier_threshold,
        critical_outlier,
        max_outlier,
    }
}

fn salary(
    typical: ValueRange,
    acceptable: ValueRange,
    outlier: ValueRange,
    critical: ValueRange,
) -> SalaryRule {
    SalaryRule {
        typical_range: typical,
        acceptable_range: acceptable,
        outlier_range: outlier,
        critical_range: critical,
    }
}

/// Years of experience per level.
///
/// Intern..Middle flag too *much* experience (thresholds above the
/// acceptable band); Senior and up flag too *little* (thresholds below it)
/// and cap the top with `max_outlier`.
pub fn experience_rules() -> ExperienceRules {
    let mut t = BTreeMap::new();
    t.insert(Seniority::Intern, experience(r(0.0, 1.0), r(0.0, 2.0), 3.0, 4.0, None));
    t.insert(Seniority::Junior, experience(r(0.5, 2.5), r(0.0, 3.5), 4.0, 5.0, None));
    t.insert(Seniority::Middle, experience(r(2.0, 5.0), r(1.5, 7.0), 8.0, 10.0, None));
    t.insert(Seniority::Senior, experience(r(4.0, 9.0), r(3.0, 12.0), 2.0, 1.0, Some(20.0)));
    t.insert(Seniority::Lead, experience(r(6.0, 12.0), r(5.0, 15.0), 3.0, 2.0, Some(20.0)));
    t.insert(Seniority::StaffPlus, experience(r(8.0, 15.0), r(6.0, 18.0), 5.0, 3.0, Some(25.0)));
    t.insert(Seniority::Management, experience(r(7.0, 15.0), r(5.0, 18.0), 4.0, 3.0, Some(25.0)));
    t.insert(Seniority::CLevel, experience(r(12.0, 25.0), r(10.0, 30.0), 7.0, 5.0, Some(40.0)));
    RuleTable::new(t)
}

/// Net monthly salary in USD per level
pub fn salary_rules() -> SalaryRules {
    let mut t = BTreeMap::new();
    t.insert(
        Seniority::Intern,
        salary(r(300.0, 600.0), r(200.0, 800.0), r(150.0, 1000.0), r(100.0, 1200.0)),
    );
    t.insert(
        Seniority::Junior,
        salary(r(700.0, 1500.0), r(500.0, 1800.0), r(400.0, 2200.0), r(300.0, 2500.0)),
    );
    t.insert(
        Seniority::Middle,
        salary(r(1600.0, 3000.0), r(1300.0, 3800.0), r(1000.0, 4500.0), r(800.0, 5500.0)),
    );
    t.insert(
        Seniority::Senior,
        salary(r(3000.0, 5500.0), r(2500.0, 7000.0), r(2000.0, 8500.0), r(1500.0, 10000.0)),
    );
    t.insert(
        Seniority::Lead,
        salary(r(4500.0, 7500.0), r(3500.0, 9000.0), r(2500.0, 10000.0), r(2000.0, 12000.0)),
    );
    t.insert(
        Seniority::StaffPlus,
        salary(r(6000.0, 9500.0), r(5000.0, 12000.0), r(4000.0, 14000.0), r(3000.0, 16000.0)),
    );
    t.insert(
        Seniority::Management,
        salary(r(5000.0, 9000.0), r(4000.0, 11000.0), r(3000.0, 13000.0), r(2500.0, 15000.0)),
    );
    t.insert(
        Seniority::CLevel,
        salary(r(9000.0, 18000.0), r(7000.0, 22000.0), r(5000.0, 25000.0), r(4000.0, 30000.0)),
    );
    RuleTable::new(t)
}
