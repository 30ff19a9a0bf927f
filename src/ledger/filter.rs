use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::OrderLine;

/// Restrictions applied to the ledger before aggregation. Empty category or
/// client sets do not restrict anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderFilter {
    pub period: Option<DatePeriod>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub clients: BTreeSet<String>,
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Choices offered for filtering, taken from the unfiltered ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub clients: Vec<String>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid filter date '{0}', expected YYYY-MM-DD or DD/MM/YYYY")]
pub struct FilterDateError(pub String);

pub fn parse_filter_date(raw: &str) -> Result<NaiveDate, FilterDateError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .map_err(|_| FilterDateError(raw.to_string()))
}

impl DatePeriod {
    /// Builds a period from two bounds given in any order.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

impl OrderFilter {
    /// Builds a filter from loosely typed inputs. A single date bound leaves
    /// the other side of the period open; blank entries are ignored.
    pub fn from_inputs<C, K>(
        from: Option<&str>,
        to: Option<&str>,
        categories: C,
        clients: K,
    ) -> Result<Self, FilterDateError>
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let from = from
            .filter(|s| !s.trim().is_empty())
            .map(parse_filter_date)
            .transpose()?;
        let to = to
            .filter(|s| !s.trim().is_empty())
            .map(parse_filter_date)
            .transpose()?;
        let period = match (from, to) {
            (None, None) => None,
            (Some(start), None) => Some(DatePeriod::new(start, NaiveDate::MAX)),
            (None, Some(end)) => Some(DatePeriod::new(NaiveDate::MIN, end)),
            (Some(start), Some(end)) => Some(DatePeriod::new(start, end)),
        };
        Ok(Self {
            period,
            categories: non_blank(categories),
            clients: non_blank(clients),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.period.is_none() && self.categories.is_empty() && self.clients.is_empty()
    }

    pub fn matches(&self, line: &OrderLine) -> bool {
        if let Some(period) = &self.period {
            match line.date {
                Some(date) if period.contains(date.date()) => {}
                _ => return false,
            }
        }
        if !self.categories.is_empty() && !self.categories.contains(&line.category) {
            return false;
        }
        if !self.clients.is_empty() && !self.clients.contains(&line.client) {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, lines: &'a [OrderLine]) -> Vec<&'a OrderLine> {
        lines.iter().filter(|line| self.matches(line)).collect()
    }
}

fn non_blank<I>(values: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

pub fn filter_options(lines: &[OrderLine]) -> FilterOptions {
    let categories: BTreeSet<&str> = lines.iter().map(|l| l.category.as_str()).collect();
    let clients: BTreeSet<&str> = lines.iter().map(|l| l.client.as_str()).collect();
    FilterOptions {
        categories: categories.into_iter().map(str::to_string).collect(),
        clients: clients.into_iter().map(str::to_string).collect(),
        first_date: lines.iter().filter_map(|l| l.date).map(|d| d.date()).min(),
        last_date: lines.iter().filter_map(|l| l.date).map(|d| d.date()).max(),
    }
}
