//! Split calculation
//!
//! Turns a payment total and an ordered rule list into one payout per rule.
//! Pure and deterministic: identical inputs always give identical outputs.
//!
//! Rounding policy:
//! - Fixed rules are paid first, in rule order, each capped at what is left.
//! - Percentage rules divide the remainder with floor division; the last
//!   percentage rule in rule order absorbs the cents lost to flooring.
//! - Without percentage rules, cents the fixed rules leave over are
//!   reported as `unassigned_cents`.
//!
//! `sum(payouts) + unassigned_cents == amount_total_cents` always holds.

use tracing::warn;

use crate::error::{SplitError, SplitResult};
use crate::model::{Payout, RuleKind, SplitOutcome, SplitRule};
use crate::validator::{percentage_total, REQUIRED_PERCENT_TOTAL};

/// `floor(base * percent / 100)` with a 128-bit intermediate
pub fn percent_of(base: i64, percent: i64) -> Option<i64> {
    (base as i128)
        .checked_mul(percent as i128)?
        .checked_div(REQUIRED_PERCENT_TOTAL as i128)?
        .try_into()
        .ok()
}

pub struct SplitCalculator;

impl SplitCalculator {
    /// Compute payouts for `amount_total_cents` under `rules`
    pub fn calculate(amount_total_cents: i64, rules: &[SplitRule]) -> SplitResult<SplitOutcome> {
        if amount_total_cents <= 0 {
            return Err(SplitError::Validation(format!(
                "Amount must be positive, got {} cents",
                amount_total_cents
            )));
        }
        if rules.is_empty() {
            return Err(SplitError::Validation(
                "At least one split rule is required".to_string(),
            ));
        }
        Self::check_rule_values(rules)?;

        let mut amounts = vec![0i64; rules.len()];
        let mut remaining = amount_total_cents;

        // Phase 1: fixed deductions
        for (i, rule) in rules.iter().enumerate() {
            if rule.kind != RuleKind::FixedCents {
                continue;
            }
            let paid = rule.value.min(remaining);
            if paid < rule.value {
                warn!(
                    "Fixed rule for recipient {} capped at {} of {} cents (total {})",
                    rule.recipient_id, paid, rule.value, amount_total_cents
                );
            }
            amounts[i] = paid;
            remaining -= paid;
        }

        // Phase 2: percentages over the remainder
        let last_percentage = rules.iter().rposition(|r| r.kind == RuleKind::Percentage);
        if let Some(last) = last_percentage {
            let base = remaining;
            let mut allotted = 0i64;

            for (i, rule) in rules.iter().enumerate() {
                if rule.kind != RuleKind::Percentage {
                    continue;
                }
                let share = if i == last {
                    base - allotted
                } else {
                    percent_of(base, rule.value).ok_or_else(|| {
                        SplitError::Validation("Split amount overflowed".to_string())
                    })?
                };
                amounts[i] = share;
                allotted += share;
            }

            remaining = base - allotted;
        }

        let payouts = rules
            .iter()
            .zip(amounts)
            .map(|(rule, amount_cents)| Payout {
                recipient_id: rule.recipient_id,
                amount_cents,
            })
            .collect();

        Ok(SplitOutcome {
            payouts,
            unassigned_cents: remaining,
        })
    }

    fn check_rule_values(rules: &[SplitRule]) -> SplitResult<()> {
        for rule in rules {
            let in_range = match rule.kind {
                RuleKind::Percentage => (0..=REQUIRED_PERCENT_TOTAL).contains(&rule.value),
                RuleKind::FixedCents => rule.value > 0,
            };
            if !in_range {
                return Err(SplitError::Validation(format!(
                    "Rule value {} out of range for recipient {}",
                    rule.value, rule.recipient_id
                )));
            }
        }

        let has_percentage = rules.iter().any(|r| r.kind == RuleKind::Percentage);
        if has_percentage && percentage_total(rules) != Some(REQUIRED_PERCENT_TOTAL) {
            return Err(SplitError::Validation(
                "Percentages must sum to exactly 100".to_string(),
            ));
        }

        Ok(())
    }
}
