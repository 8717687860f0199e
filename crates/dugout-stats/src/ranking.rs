// Ranking and scaling primitives shared by every table.

use std::cmp::Ordering;

use dugout_core::categories::Direction;

/// Which end of a column receives rank 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Smallest value ranks first.
    Ascending,
    /// Largest value ranks first.
    Descending,
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::HigherIsBetter => Order::Descending,
            Direction::LowerIsBetter => Order::Ascending,
        }
    }
}

/// Threshold below which a column's spread is treated as zero.
const SPREAD_EPSILON: f64 = 1e-12;

fn beats(order: Order, a: f64, b: f64) -> bool {
    let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    match order {
        Order::Ascending => ord == Ordering::Less,
        Order::Descending => ord == Ordering::Greater,
    }
}

fn ties(a: f64, b: f64) -> bool {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal) == Ordering::Equal
}

/// 1-based ranks where tied values share the mean of the ranks they span.
///
/// `[10, 20, 20, 5]` descending ranks as `[3.0, 1.5, 1.5, 4.0]`.
pub fn rank_average(values: &[f64], order: Order) -> Vec<f64> {
    values
        .iter()
        .map(|&v| {
            let better = values.iter().filter(|&&o| beats(order, o, v)).count();
            let equal = values.iter().filter(|&&o| ties(o, v)).count();
            better as f64 + (equal as f64 + 1.0) / 2.0
        })
        .collect()
}

/// 1-based ranks where tied values all take the lowest rank they span.
pub fn rank_min(values: &[f64], order: Order) -> Vec<u32> {
    values
        .iter()
        .map(|&v| values.iter().filter(|&&o| beats(order, o, v)).count() as u32 + 1)
        .collect()
}

/// Ascending average rank divided by the count, as a 0-100 percentile.
pub fn percentile_rank(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    rank_average(values, Order::Ascending)
        .into_iter()
        .map(|r| r / n * 100.0)
        .collect()
}

/// Rescale a column to 0-100 with the best value at 100.
///
/// A column where every team has the same value carries no information and
/// scores 0 for everyone.
pub fn min_max_score(values: &[f64], direction: Direction) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let spread = max - min;
    if !spread.is_finite() || spread.abs() < SPREAD_EPSILON {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|&v| {
            let scaled = (v - min) / spread * 100.0;
            match direction {
                Direction::HigherIsBetter => scaled,
                Direction::LowerIsBetter => 100.0 - scaled,
            }
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N - 1 denominator); 0.0 below two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
