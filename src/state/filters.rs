//! Structured stock filters and the price-range summary shown beside them.

use crate::models::{PriceRange, Stock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Inclusive bounds; a missing side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub price_range: Option<NumericRange>,
    /// Bounds on `change_percent`.
    pub change_range: Option<NumericRange>,
    pub volume_range: Option<NumericRange>,
    pub market_cap_range: Option<NumericRange>,
    /// Empty means every sector.
    pub sectors: BTreeSet<String>,
}

impl FilterOptions {
    /// All active filters must accept the stock.
    pub fn matches(&self, stock: &Stock) -> bool {
        let in_range = |range: &Option<NumericRange>, value: f64| {
            range.as_ref().is_none_or(|r| r.contains(value))
        };
        in_range(&self.price_range, stock.price)
            && in_range(&self.change_range, stock.change_percent)
            && in_range(&self.volume_range, stock.volume as f64)
            && in_range(&self.market_cap_range, stock.market_cap)
            && (self.sectors.is_empty() || self.sectors.contains(&stock.sector))
    }

    pub fn active_count(&self) -> usize {
        [
            &self.price_range,
            &self.change_range,
            &self.volume_range,
            &self.market_cap_range,
        ]
        .into_iter()
        .filter(|r| r.is_some_and(|r| !r.is_unbounded()))
        .count()
            + usize::from(!self.sectors.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }
}

/// Distinct sectors present in `stocks`, sorted.
pub fn sector_options(stocks: &[Stock]) -> Vec<String> {
    stocks
        .iter()
        .map(|s| s.sector.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn count_by_price_range(stocks: &[Stock]) -> BTreeMap<PriceRange, usize> {
    let mut counts = BTreeMap::new();
    for stock in stocks {
        *counts.entry(stock.price_range).or_insert(0) += 1;
    }
    counts
}

/// Per-bucket counts backing the compact price filter.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRangeSummary {
    pub counts: Vec<(PriceRange, usize)>,
    /// Sum of counts, or 1 when nothing was counted so shares never divide by zero.
    pub total: usize,
}

impl PriceRangeSummary {
    pub fn from_counts(counts: &BTreeMap<PriceRange, usize>) -> Self {
        let counts: Vec<(PriceRange, usize)> = PriceRange::ALL
            .iter()
            .map(|range| (*range, counts.get(range).copied().unwrap_or(0)))
            .collect();
        let sum: usize = counts.iter().map(|(_, n)| n).sum();
        Self {
            counts,
            total: sum.max(1),
        }
    }

    pub fn count(&self, range: PriceRange) -> usize {
        self.counts
            .iter()
            .find(|(r, _)| *r == range)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Percentage of the total that falls in `range`.
    pub fn share(&self, range: PriceRange) -> f64 {
        self.count(range) as f64 / self.total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::stock;

    #[test]
    fn price_range_filter_is_inclusive_window() {
        let filters = FilterOptions {
            price_range: Some(NumericRange::new(10.0, 50.0)),
            ..Default::default()
        };
        assert!(!filters.matches(&stock(1, "CHEAP", 5.0, 0.0)));
        assert!(filters.matches(&stock(2, "MID", 25.0, 0.0)));
        assert!(filters.matches(&stock(3, "EDGE", 50.0, 0.0)));
        assert!(!filters.matches(&stock(4, "HIGH", 50.01, 0.0)));
    }

    #[test]
    fn filters_combine_with_and() {
        let mut energy = stock(1, "XOM", 25.0, 1.0);
        energy.sector = "Energy".to_string();
        let tech = stock(2, "MSFT", 25.0, 1.0);

        let filters = FilterOptions {
            price_range: Some(NumericRange::at_least(10.0)),
            change_range: Some(NumericRange::at_least(0.0)),
            sectors: ["Energy".to_string()].into_iter().collect(),
            ..Default::default()
        };
        assert!(filters.matches(&energy));
        assert!(!filters.matches(&tech));

        let falling = energy.with_price(20.0);
        assert!(!filters.matches(&falling));
    }

    #[test]
    fn active_count_ignores_unbounded_ranges() {
        let filters = FilterOptions {
            price_range: Some(NumericRange::default()),
            volume_range: Some(NumericRange::at_most(1e6)),
            sectors: ["Energy".to_string()].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(filters.active_count(), 2);
        assert!(FilterOptions::default().is_empty());
    }

    #[test]
    fn empty_counts_report_zero_per_range_and_total_of_one() {
        let summary = PriceRangeSummary::from_counts(&BTreeMap::new());
        for range in PriceRange::ALL {
            assert_eq!(summary.count(range), 0);
            assert_eq!(summary.share(range), 0.0);
        }
        assert_eq!(summary.total, 1);
    }

    #[test]
    fn summary_shares_add_up() {
        let stocks = vec![
            stock(1, "A", 5.0, 0.0),
            stock(2, "B", 25.0, 0.0),
            stock(3, "C", 30.0, 0.0),
            stock(4, "D", 600.0, 0.0),
        ];
        let summary = PriceRangeSummary::from_counts(&count_by_price_range(&stocks));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.count(PriceRange::From10To50), 2);
        assert_eq!(summary.share(PriceRange::Under10), 25.0);
    }

    #[test]
    fn sector_options_are_distinct_and_sorted() {
        let mut a = stock(1, "A", 1.0, 0.0);
        a.sector = "Utilities".into();
        let mut b = stock(2, "B", 1.0, 0.0);
        b.sector = "Energy".into();
        let c = stock(3, "C", 1.0, 0.0);
        let d = stock(4, "D", 1.0, 0.0);
        assert_eq!(sector_options(&[a, b, c, d]), vec!["Energy", "Technology", "Utilities"]);
    }
}
