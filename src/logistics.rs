use serde::{Deserialize, Serialize};

/// Distance interval `[start_km, end_km]` priced per kilometre.
///
/// Any of the three values may be blank in the workbook. A band missing
/// either bound never matches; a matched band without a price costs nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RateBand {
    pub start_km: Option<f64>,
    pub end_km: Option<f64>,
    pub price_per_km: Option<f64>,
}

impl RateBand {
    pub fn new(start_km: f64, end_km: f64, price_per_km: f64) -> Self {
        Self::from_parts(Some(start_km), Some(end_km), Some(price_per_km))
    }

    pub fn from_parts(
        start_km: Option<f64>,
        end_km: Option<f64>,
        price_per_km: Option<f64>,
    ) -> Self {
        Self {
            start_km,
            end_km,
            price_per_km,
        }
    }

    pub fn contains(&self, distance_km: f64) -> bool {
        match (self.start_km, self.end_km) {
            (Some(start), Some(end)) => start <= distance_km && distance_km <= end,
            _ => false,
        }
    }
}

/// Rate bands in the order they were declared in the workbook.
///
/// Bands are expected not to overlap and are not required to cover every
/// distance. Lookup is a linear scan: the first band containing the distance
/// wins, and a distance outside every band costs nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RateTable {
    bands: Vec<RateBand>,
}

impl RateTable {
    pub fn new(bands: Vec<RateBand>) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &[RateBand] {
        &self.bands
    }

    pub fn band_for(&self, distance_km: f64) -> Option<&RateBand> {
        self.bands.iter().find(|band| band.contains(distance_km))
    }

    /// The search stops at the first matching band even when that band has
    /// no price.
    pub fn cost_for(&self, distance_km: f64) -> f64 {
        self.band_for(distance_km)
            .and_then(|band| band.price_per_km)
            .map(|price| price * distance_km)
            .unwrap_or(0.0)
    }

    /// Cost of an optional distance; orders without a delivery row cost zero.
    pub fn cost_for_optional(&self, distance_km: Option<f64>) -> f64 {
        distance_km.map(|d| self.cost_for(d)).unwrap_or(0.0)
    }
}
