use crate::models::{Goal, GoalProgress, Income};
use std::collections::BTreeMap;

pub type BucketTotals = BTreeMap<String, f64>;

pub fn total_income(incomes: &[Income]) -> f64 {
    incomes.iter().map(|i| i.amount).sum()
}

pub fn income_by_type<'a>(incomes: &'a [Income], kind: &str) -> Vec<&'a Income> {
    incomes.iter().filter(|i| i.r#type == kind).collect()
}

/// Totals keyed by `YYYY-MM-DD`. The buckets are days, not weeks; the name is
/// kept because the dashboard labels it that way.
pub fn weekly_stats(incomes: &[Income]) -> BucketTotals {
    bucket_totals(incomes, "%Y-%m-%d")
}

/// Totals keyed by `YYYY-MM`.
pub fn monthly_stats(incomes: &[Income]) -> BucketTotals {
    bucket_totals(incomes, "%Y-%m")
}

fn bucket_totals(incomes: &[Income], key_format: &str) -> BucketTotals {
    let mut stats = BucketTotals::new();
    for income in incomes {
        let key = income.date.format(key_format).to_string();
        *stats.entry(key).or_insert(0.0) += income.amount;
    }
    stats
}

/// The progress entry whose goal ends last. Only a strictly later end date
/// displaces the running pick, so the first of several equal dates is kept.
pub fn current_goal<'a>(goals: &[Goal], progress: &'a [GoalProgress]) -> Option<&'a GoalProgress> {
    if goals.is_empty() {
        return None;
    }
    progress.iter().fold(None, |latest: Option<&GoalProgress>, current| match latest {
        None => Some(current),
        Some(latest) => match (current.goal.end_date, latest.goal.end_date) {
            (Some(cur), Some(best)) if cur > best => Some(current),
            _ => Some(latest),
        },
    })
}
