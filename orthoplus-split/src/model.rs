//! Split-payment data model
//!
//! All monetary values are integer cents (`i64`). Nothing in this crate
//! touches floating point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a configuration's rules divide a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitType {
    /// Every rule is a percentage; percentages sum to exactly 100
    Percentage,
    /// Every rule is a fixed amount in cents
    Fixed,
    /// Fixed amounts come off the top, percentages divide the remainder
    Hybrid,
}

impl SplitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitType::Percentage => "PERCENTAGE",
            SplitType::Fixed => "FIXED",
            SplitType::Hybrid => "HYBRID",
        }
    }
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERCENTAGE" => Ok(SplitType::Percentage),
            "FIXED" => Ok(SplitType::Fixed),
            "HYBRID" => Ok(SplitType::Hybrid),
            other => Err(format!("Unknown split type: {}", other)),
        }
    }
}

/// Interpretation of a rule's `value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    /// Whole percent, 0..=100
    Percentage,
    /// Amount in cents
    FixedCents,
}

/// One recipient entry in a configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRule {
    pub recipient_id: Uuid,
    pub kind: RuleKind,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SplitRule {
    pub fn percentage(recipient_id: Uuid, percent: i64) -> Self {
        Self {
            recipient_id,
            kind: RuleKind::Percentage,
            value: percent,
            label: None,
        }
    }

    pub fn fixed(recipient_id: Uuid, cents: i64) -> Self {
        Self {
            recipient_id,
            kind: RuleKind::FixedCents,
            value: cents,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Payment-method tag such as `PIX` or `CREDIT_CARD`
///
/// Normalized to trimmed upper case on construction, so `" pix"` and
/// `"PIX"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PaymentMethod(String);

impl PaymentMethod {
    pub fn new(tag: &str) -> Self {
        Self(tag.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for PaymentMethod {
    fn from(tag: String) -> Self {
        Self::new(&tag)
    }
}

impl From<&str> for PaymentMethod {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        method.0
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, clinic-scoped split configuration
///
/// Never edited in place. The only mutation is deactivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub split_type: SplitType,
    pub split_rules: Vec<SplitRule>,
    /// Empty set means every payment method
    pub apply_to_payment_methods: BTreeSet<PaymentMethod>,
    pub minimum_amount_cents: i64,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl SplitConfig {
    /// Whether this configuration covers `method`
    pub fn applies_to(&self, method: &PaymentMethod) -> bool {
        self.apply_to_payment_methods.is_empty() || self.apply_to_payment_methods.contains(method)
    }
}

fn default_active() -> bool {
    true
}

/// Fields supplied when creating a configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSplitConfig {
    pub name: String,
    pub split_type: SplitType,
    pub split_rules: Vec<SplitRule>,
    #[serde(default)]
    pub apply_to_payment_methods: BTreeSet<PaymentMethod>,
    #[serde(default)]
    pub minimum_amount_cents: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Amount owed to one recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient_id: Uuid,
    pub amount_cents: i64,
}

/// Result of running the calculator
///
/// `payouts` has one entry per rule, in rule order.
/// `sum(payouts) + unassigned_cents` always equals the input total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOutcome {
    pub payouts: Vec<Payout>,
    pub unassigned_cents: i64,
}

impl SplitOutcome {
    /// Cents handed to recipients
    pub fn distributed_cents(&self) -> i64 {
        self.payouts.iter().map(|p| p.amount_cents).sum()
    }
}

/// Request to split one payment
#[derive(Debug, Clone, PartialEq)]
pub struct ApplySplitInput {
    pub clinic_id: Uuid,
    pub user_id: Uuid,
    pub amount_total_cents: i64,
    pub payment_method: PaymentMethod,
    pub split_config_id: Option<Uuid>,
    /// Caller-chosen token; replays with the same token return the first transaction
    pub idempotency_key: Option<String>,
}

/// Immutable record of one applied split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTransaction {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub config_id: Uuid,
    pub amount_total_cents: i64,
    pub payment_method: PaymentMethod,
    pub computed_payouts: Vec<Payout>,
    pub unassigned_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Caller role within a clinic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Root,
    Admin,
    Member,
}

impl Role {
    /// Parse a role tag; anything unrecognized is treated as `Member`
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "ROOT" => Role::Root,
            "ADMIN" => Role::Admin,
            _ => Role::Member,
        }
    }

    /// ROOT and ADMIN may create and deactivate split configurations
    pub fn can_manage_splits(&self) -> bool {
        matches!(self, Role::Root | Role::Admin)
    }
}

/// Authenticated caller, scoped to one clinic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub clinic_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_is_normalized() {
        assert_eq!(PaymentMethod::new(" pix "), PaymentMethod::new("PIX"));
        let parsed: PaymentMethod = serde_json::from_str("\"credit_card\"").unwrap();
        assert_eq!(parsed.as_str(), "CREDIT_CARD");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"CREDIT_CARD\"");
    }

    #[test]
    fn rule_kinds_use_screaming_case() {
        let rule = SplitRule::fixed(Uuid::nil(), 500);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["kind"], "FIXED_CENTS");
        assert!(json.get("label").is_none());
    }

    #[test]
    fn split_type_round_trips_through_str() {
        for split_type in [SplitType::Percentage, SplitType::Fixed, SplitType::Hybrid] {
            assert_eq!(split_type.as_str().parse::<SplitType>().unwrap(), split_type);
        }
        assert!("SOMETHING".parse::<SplitType>().is_err());
    }

    #[test]
    fn empty_method_set_applies_to_everything() {
        let mut config = SplitConfig {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            name: "Default".to_string(),
            split_type: SplitType::Percentage,
            split_rules: vec![SplitRule::percentage(Uuid::new_v4(), 100)],
            apply_to_payment_methods: BTreeSet::new(),
            minimum_amount_cents: 0,
            is_active: true,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        assert!(config.applies_to(&PaymentMethod::new("PIX")));

        config.apply_to_payment_methods.insert(PaymentMethod::new("CREDIT_CARD"));
        assert!(!config.applies_to(&PaymentMethod::new("PIX")));
        assert!(config.applies_to(&PaymentMethod::new("credit_card")));
    }

    #[test]
    fn new_config_defaults() {
        let json = serde_json::json!({
            "name": "Comissões",
            "split_type": "PERCENTAGE",
            "split_rules": [
                {"recipient_id": Uuid::nil(), "kind": "PERCENTAGE", "value": 100}
            ]
        });
        let config: NewSplitConfig = serde_json::from_value(json).unwrap();
        assert!(config.is_active);
        assert_eq!(config.minimum_amount_cents, 0);
        assert!(config.apply_to_payment_methods.is_empty());
    }

    #[test]
    fn unknown_roles_are_members() {
        assert_eq!(Role::from_tag("admin"), Role::Admin);
        assert_eq!(Role::from_tag("ROOT"), Role::Root);
        assert_eq!(Role::from_tag("dentist"), Role::Member);
        assert!(!Role::Member.can_manage_splits());
        assert!(Role::Admin.can_manage_splits());
    }
}
