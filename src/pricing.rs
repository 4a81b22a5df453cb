//! Mock premium price list. Nothing here takes payment; purchases only
//! produce a notification.

use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SubscriptionTier {
    #[default]
    None,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl SubscriptionTier {
    pub fn discount_pct(self) -> u32 {
        match self {
            SubscriptionTier::None => 0,
            SubscriptionTier::Bronze => 5,
            SubscriptionTier::Silver => 10,
            SubscriptionTier::Gold => 20,
            SubscriptionTier::Platinum => 30,
        }
    }

    pub fn price_per_month(self) -> f64 {
        match self {
            SubscriptionTier::None => 0.0,
            SubscriptionTier::Bronze => 5.0,
            SubscriptionTier::Silver => 12.0,
            SubscriptionTier::Gold => 25.0,
            SubscriptionTier::Platinum => 50.0,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Some(SubscriptionTier::None),
            "bronze" => Some(SubscriptionTier::Bronze),
            "silver" => Some(SubscriptionTier::Silver),
            "gold" => Some(SubscriptionTier::Gold),
            "platinum" => Some(SubscriptionTier::Platinum),
            _ => None,
        }
    }

    fn apply(self, amount: f64) -> f64 {
        amount * (1.0 - f64::from(self.discount_pct()) / 100.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoostTier {
    Bronze,
    Silver,
    Gold,
}

impl BoostTier {
    pub const MULTIPLIER: &'static str = "2×";

    pub fn base_price(self) -> f64 {
        match self {
            BoostTier::Bronze => 15.0,
            BoostTier::Silver => 25.0,
            BoostTier::Gold => 40.0,
        }
    }

    pub fn hours(self) -> u32 {
        match self {
            BoostTier::Bronze => 2,
            BoostTier::Silver => 4,
            BoostTier::Gold => 8,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bronze" => Some(BoostTier::Bronze),
            "silver" => Some(BoostTier::Silver),
            "gold" => Some(BoostTier::Gold),
            _ => None,
        }
    }

    pub fn price(self, subscription: SubscriptionTier) -> f64 {
        subscription.apply(self.base_price())
    }
}

impl fmt::Display for BoostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BoostTier::Bronze => "Bronze",
            BoostTier::Silver => "Silver",
            BoostTier::Gold => "Gold",
        };
        write!(f, "{name} Boost")
    }
}

pub const MIN_MONTHS: u32 = 6;
pub const MAX_BONUS_PCT: u32 = 100;
const BONUS_STEP_PCT: u32 = 5;
/// Monthly price of every 10% of token bonus.
const PRICE_PER_TEN_PCT: f64 = 5.0;

/// Lowest bonus on offer for a commitment of `months`.
pub fn min_bonus_pct(months: u32) -> u32 {
    if months >= 12 {
        10
    } else {
        15
    }
}

pub fn term_discount_pct(months: u32) -> u32 {
    match months {
        m if m >= 24 => 35,
        m if m >= 12 => 20,
        m if m >= 6 => 10,
        _ => 0,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PremiumTimeQuote {
    pub bonus_pct: u32,
    pub months: u32,
    pub term_discount_pct: u32,
    pub subscription_discount_pct: u32,
    pub total: f64,
}

impl PremiumTimeQuote {
    /// Clamps `months` to the minimum commitment and `bonus_pct` into the
    /// allowed range, snapped down to 5% steps.
    pub fn compute(bonus_pct: u32, months: u32, subscription: SubscriptionTier) -> Self {
        let months = months.max(MIN_MONTHS);
        let bonus_pct =
            (bonus_pct.min(MAX_BONUS_PCT) / BONUS_STEP_PCT * BONUS_STEP_PCT).max(min_bonus_pct(months));
        let base_monthly = f64::from(bonus_pct) / 10.0 * PRICE_PER_TEN_PCT;
        let term_discount_pct = term_discount_pct(months);
        let after_term = base_monthly * f64::from(months) * (1.0 - f64::from(term_discount_pct) / 100.0);
        Self {
            bonus_pct,
            months,
            term_discount_pct,
            subscription_discount_pct: subscription.discount_pct(),
            total: subscription.apply(after_term),
        }
    }
}

/// Formats pounds rounded to pennies; whole amounts have no decimals.
pub fn gbp(amount: f64) -> String {
    let pennies = (amount * 100.0).round();
    if pennies % 100.0 == 0.0 {
        format!("£{}", pennies / 100.0)
    } else {
        format!("£{:.2}", pennies / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gbp_formatting() {
        assert_eq!(gbp(15.0), "£15");
        assert_eq!(gbp(14.25), "£14.25");
        assert_eq!(gbp(22.5), "£22.50");
        assert_eq!(gbp(0.005), "£0.01");
    }

    #[test]
    fn boost_price_applies_subscription_discount() {
        assert_eq!(gbp(BoostTier::Bronze.price(SubscriptionTier::None)), "£15");
        assert_eq!(gbp(BoostTier::Bronze.price(SubscriptionTier::Bronze)), "£14.25");
        assert_eq!(gbp(BoostTier::Gold.price(SubscriptionTier::Platinum)), "£28");
        assert_eq!(BoostTier::Silver.hours(), 4);
    }

    #[test]
    fn premium_time_quote() {
        // 15% for 6 months: 1.5 * 5 * 6 = 45, minus 10% term = 40.5
        let q = PremiumTimeQuote::compute(15, 6, SubscriptionTier::None);
        assert_eq!(q.term_discount_pct, 10);
        assert_eq!(gbp(q.total), "£40.50");

        // 20% for 24 months with Gold: 2 * 5 * 24 = 240, -35% = 156, -20% = 124.8
        let q = PremiumTimeQuote::compute(20, 24, SubscriptionTier::Gold);
        assert_eq!(gbp(q.total), "£124.80");
    }

    #[test]
    fn quote_clamps_to_offer_rules() {
        let q = PremiumTimeQuote::compute(10, 3, SubscriptionTier::None);
        assert_eq!(q.months, 6);
        assert_eq!(q.bonus_pct, 15);

        let q = PremiumTimeQuote::compute(10, 12, SubscriptionTier::None);
        assert_eq!(q.bonus_pct, 10);

        let q = PremiumTimeQuote::compute(250, 12, SubscriptionTier::None);
        assert_eq!(q.bonus_pct, 100);
        assert_eq!(PremiumTimeQuote::compute(37, 12, SubscriptionTier::None).bonus_pct, 35);
    }
}
