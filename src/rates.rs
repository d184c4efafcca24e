use serde::{Deserialize, Serialize};

use crate::model::{Ms, Size};

/// Tariff configuration. Immutable once the engine is built; tests and
/// deployments vary rates by constructing their own card instead of
/// touching process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    /// Minimum charge covering the first `flat_rate_hours` of a sub-daily
    /// stay.
    pub flat_rate: i64,
    pub flat_rate_hours: f64,
    /// Charge per full 24-hour block once a ticket crosses a day.
    pub daily_rate: i64,
    pub hourly_small: i64,
    pub hourly_medium: i64,
    pub hourly_large: i64,
    /// Maximum gap after checkout during which a returning vehicle reuses
    /// its previous ticket instead of being issued a new one.
    pub continuity_window: Ms,
}

impl RateCard {
    pub fn hourly(&self, size: Size) -> i64 {
        match size {
            Size::Small => self.hourly_small,
            Size::Medium => self.hourly_medium,
            Size::Large => self.hourly_large,
        }
    }
}

impl Default for RateCard {
    fn default() -> Self {
        Self {
            flat_rate: 40,
            flat_rate_hours: 3.0,
            daily_rate: 5000,
            hourly_small: 20,
            hourly_medium: 60,
            hourly_large: 100,
            continuity_window: 60 * 60_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_rate_by_size() {
        let rates = RateCard::default();
        assert_eq!(rates.hourly(Size::Small), 20);
        assert_eq!(rates.hourly(Size::Medium), 60);
        assert_eq!(rates.hourly(Size::Large), 100);
    }

    #[test]
    fn default_tariff_values() {
        let rates = RateCard::default();
        assert_eq!(rates.flat_rate, 40);
        assert_eq!(rates.flat_rate_hours, 3.0);
        assert_eq!(rates.daily_rate, 5000);
        assert_eq!(rates.continuity_window, 3_600_000);
    }
}
