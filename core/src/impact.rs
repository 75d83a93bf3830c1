//! Impact vectors: how a mission moves business KPIs.
//!
//! A mission template carries a sparse mapping from KPI dimension to a
//! signed percentage delta ("revenue −20%, customer satisfaction −10%").
//! The dimension space is open-ended on the input side (news scoring and
//! future template authors can invent names), but the financial aggregates
//! must never be perturbed by a dimension nobody mapped deliberately. So a
//! dimension is a tagged union: the recognized financial KPIs as explicit
//! variants, everything else in an informational bucket that is reported
//! but never folded into money math.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single KPI dimension an impact vector can touch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KpiDimension {
    /// Aggregate revenue (financial).
    Revenue,
    /// Aggregate expenses (financial).
    Expenses,
    /// Aggregate cash flow (financial).
    CashFlow,
    /// Any non-financial reading (customer satisfaction, brand trust, ...).
    /// Stored and reported verbatim, never folded into financial aggregates.
    Informational(String),
}

impl KpiDimension {
    /// Maps a KPI name to a dimension. Unrecognized names land in the
    /// informational bucket rather than being dropped or misread.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "revenue" => Self::Revenue,
            "expenses" => Self::Expenses,
            "cashflow" | "cash_flow" => Self::CashFlow,
            other => Self::Informational(other.to_string()),
        }
    }

    /// Whether this dimension participates in financial aggregate math.
    #[must_use]
    pub const fn is_financial(&self) -> bool {
        !matches!(self, Self::Informational(_))
    }
}

impl fmt::Display for KpiDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revenue => f.write_str("revenue"),
            Self::Expenses => f.write_str("expenses"),
            Self::CashFlow => f.write_str("cash_flow"),
            Self::Informational(name) => f.write_str(name),
        }
    }
}

/// One entry of an impact vector: a dimension and a signed percentage delta.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactEntry {
    /// The KPI dimension being moved.
    pub dimension: KpiDimension,
    /// Signed percentage delta, e.g. `-20` for a 20% drop.
    pub percent: i32,
}

/// A sparse mapping from KPI dimension to signed percentage delta.
///
/// Snapshotted onto a mission at creation time and applied exactly once on
/// resolution. Entries are kept in insertion order; a dimension appears at
/// most once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactVector {
    entries: Vec<ImpactEntry>,
}

impl ImpactVector {
    /// Creates an empty impact vector.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Builder-style insert. A repeated dimension overwrites the earlier
    /// percentage rather than double-counting it.
    #[must_use]
    pub fn with(mut self, dimension: KpiDimension, percent: i32) -> Self {
        self.set(dimension, percent);
        self
    }

    /// Inserts or overwrites the percentage for a dimension.
    pub fn set(&mut self, dimension: KpiDimension, percent: i32) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.dimension == dimension) {
            entry.percent = percent;
        } else {
            self.entries.push(ImpactEntry { dimension, percent });
        }
    }

    /// Returns the percentage for a dimension, if present.
    #[must_use]
    pub fn get(&self, dimension: &KpiDimension) -> Option<i32> {
        self.entries
            .iter()
            .find(|e| &e.dimension == dimension)
            .map(|e| e.percent)
    }

    /// Iterates all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ImpactEntry> {
        self.entries.iter()
    }

    /// Iterates only the financial entries.
    pub fn financial(&self) -> impl Iterator<Item = &ImpactEntry> {
        self.entries.iter().filter(|e| e.dimension.is_financial())
    }

    /// Iterates only the informational entries.
    pub fn informational(&self) -> impl Iterator<Item = (&str, i32)> {
        self.entries.iter().filter_map(|e| match &e.dimension {
            KpiDimension::Informational(name) => Some((name.as_str(), e.percent)),
            _ => None,
        })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_financial_dimensions() {
        assert_eq!(KpiDimension::parse("revenue"), KpiDimension::Revenue);
        assert_eq!(KpiDimension::parse(" Expenses "), KpiDimension::Expenses);
        assert_eq!(KpiDimension::parse("cashFlow"), KpiDimension::CashFlow);
        assert_eq!(KpiDimension::parse("cash_flow"), KpiDimension::CashFlow);
    }

    #[test]
    fn parse_routes_unknown_names_to_informational() {
        let dim = KpiDimension::parse("customerSatisfaction");
        assert_eq!(
            dim,
            KpiDimension::Informational("customersatisfaction".to_string())
        );
        assert!(!dim.is_financial());
    }

    #[test]
    fn repeated_dimension_overwrites() {
        let vector = ImpactVector::new()
            .with(KpiDimension::Revenue, -20)
            .with(KpiDimension::Revenue, -30);

        assert_eq!(vector.len(), 1);
        assert_eq!(vector.get(&KpiDimension::Revenue), Some(-30));
    }

    #[test]
    fn financial_and_informational_split() {
        let vector = ImpactVector::new()
            .with(KpiDimension::Revenue, -20)
            .with(KpiDimension::Informational("customer_satisfaction".into()), -10);

        assert_eq!(vector.financial().count(), 1);
        let informational: Vec<_> = vector.informational().collect();
        assert_eq!(informational, vec![("customer_satisfaction", -10)]);
    }
}
