//! Reward rules and the item-to-token mapping.
//!
//! A [`RewardRule`] says how many tokens one unit of an obtained item is worth.
//! [`RewardMapper`] resolves a [`ParsedReward`] against a snapshot of the rules.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An item obtained in game, as extracted from a chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReward {
    pub item_name: String,
    pub quantity: u64,
}

impl ParsedReward {
    pub fn new(item_name: impl Into<String>, quantity: u64) -> Self {
        Self {
            item_name: item_name.into(),
            quantity,
        }
    }
}

/// Token multiplier for one item name. Names match case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRule {
    pub name: String,
    pub multiplier: f64,
}

impl RewardRule {
    pub fn new(name: impl Into<String>, multiplier: f64) -> Result<Self, DomainError> {
        let rule = Self {
            name: name.into(),
            multiplier,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("Reward rule name cannot be empty"));
        }
        if !self.multiplier.is_finite() {
            return Err(DomainError::validation(format!(
                "Reward rule '{}' has a non-finite multiplier",
                self.name
            )));
        }
        Ok(())
    }

    pub fn matches(&self, item_name: &str) -> bool {
        self.name.eq_ignore_ascii_case(item_name)
    }
}

/// `round(quantity * multiplier)`, ties away from zero.
///
/// The float-to-int cast saturates, so negative products become 0 and the balance
/// can never be driven below zero by a misconfigured rule.
pub fn compute_amount(quantity: u64, multiplier: f64) -> u64 {
    (quantity as f64 * multiplier).round() as u64
}

/// Resolves parsed rewards against one snapshot of the configured rules.
#[derive(Debug, Clone, Copy)]
pub struct RewardMapper<'a> {
    rules: &'a [RewardRule],
}

impl<'a> RewardMapper<'a> {
    pub fn new(rules: &'a [RewardRule]) -> Self {
        Self { rules }
    }

    pub fn rule_for(&self, item_name: &str) -> Option<&'a RewardRule> {
        self.rules.iter().find(|rule| rule.matches(item_name))
    }

    /// Token amount for the reward, or `None` when no rule covers the item.
    pub fn amount_for(&self, reward: &ParsedReward) -> Option<u64> {
        self.rule_for(&reward.item_name)
            .map(|rule| compute_amount(reward.quantity, rule.multiplier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<RewardRule> {
        vec![
            RewardRule::new("Cracked Clusters", 2.0).unwrap(),
            RewardRule::new("MGP", 0.25).unwrap(),
        ]
    }

    #[test]
    fn maps_case_insensitively() {
        let rules = rules();
        let mapper = RewardMapper::new(&rules);

        let amount = mapper.amount_for(&ParsedReward::new("cracked clusters", 1_234));
        assert_eq!(amount, Some(2_468));
    }

    #[test]
    fn unknown_item_yields_none() {
        let rules = rules();
        let mapper = RewardMapper::new(&rules);

        assert_eq!(mapper.amount_for(&ParsedReward::new("Gil", 500)), None);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(compute_amount(10, 0.25), 3); // 2.5
        assert_eq!(compute_amount(6, 0.25), 2); // 1.5
        assert_eq!(compute_amount(1, 0.4), 0);
    }

    #[test]
    fn negative_multiplier_clamps_to_zero() {
        assert_eq!(compute_amount(100, -3.0), 0);
    }

    #[test]
    fn rejects_invalid_rules() {
        assert!(RewardRule::new("", 1.0).is_err());
        assert!(RewardRule::new("MGP", f64::NAN).is_err());
    }

    #[test]
    fn deserializes_from_config_shape() {
        let rule: RewardRule =
            serde_json::from_str(r#"{"name": "MGP", "multiplier": 0.5}"#).unwrap();
        assert_eq!(rule.name, "MGP");
        assert_eq!(rule.multiplier, 0.5);
    }
}
