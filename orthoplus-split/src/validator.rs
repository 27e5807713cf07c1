//! Static validation of a rule set before it is persisted or used

use serde::Serialize;

use crate::error::{SplitError, SplitResult};
use crate::model::{RuleKind, SplitRule, SplitType};

/// Percentage rules must add up to exactly this
pub const REQUIRED_PERCENT_TOTAL: i64 = 100;

/// Result of validating a rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationOutcome {
    fn ok() -> Self {
        Self { valid: true, error: None }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }

    /// Convert into a `SplitError::Validation` when invalid
    pub fn into_result(self) -> SplitResult<()> {
        if self.valid {
            return Ok(());
        }
        Err(SplitError::Validation(
            self.error
                .unwrap_or_else(|| "Invalid split rules".to_string()),
        ))
    }
}

/// Sum of all percentage-rule values, `None` on overflow
pub fn percentage_total(rules: &[SplitRule]) -> Option<i64> {
    rules
        .iter()
        .filter(|r| r.kind == RuleKind::Percentage)
        .try_fold(0i64, |acc, r| acc.checked_add(r.value))
}

/// Validation gate for split rule sets
///
/// Pure: no side effects, no I/O.
pub struct SplitRulesValidator;

impl SplitRulesValidator {
    /// Validate `rules` against the configuration's `split_type`
    ///
    /// - PERCENTAGE: percentage rules only, each 0..=100, summing to exactly 100.
    /// - FIXED: fixed rules only, each strictly positive.
    /// - HYBRID: at least one of each kind. Fixed values positive, percentages
    ///   (which divide the remainder) summing to exactly 100. Whether fixed
    ///   deductions fit a particular payment is only known at apply time.
    pub fn validate(rules: &[SplitRule], split_type: SplitType) -> ValidationOutcome {
        if rules.is_empty() {
            return ValidationOutcome::invalid("At least one split rule is required");
        }

        match split_type {
            SplitType::Percentage => {
                if rules.iter().any(|r| r.kind != RuleKind::Percentage) {
                    return ValidationOutcome::invalid(
                        "PERCENTAGE configurations accept only percentage rules",
                    );
                }
                Self::check_percentages(rules)
            }
            SplitType::Fixed => {
                if rules.iter().any(|r| r.kind != RuleKind::FixedCents) {
                    return ValidationOutcome::invalid(
                        "FIXED configurations accept only fixed-amount rules",
                    );
                }
                Self::check_fixed(rules)
            }
            SplitType::Hybrid => {
                let has_fixed = rules.iter().any(|r| r.kind == RuleKind::FixedCents);
                let has_percentage = rules.iter().any(|r| r.kind == RuleKind::Percentage);
                if !has_fixed || !has_percentage {
                    return ValidationOutcome::invalid(
                        "HYBRID configurations need both fixed and percentage rules",
                    );
                }

                let fixed = Self::check_fixed(rules);
                if !fixed.valid {
                    return fixed;
                }
                Self::check_percentages(rules)
            }
        }
    }

    fn check_percentages(rules: &[SplitRule]) -> ValidationOutcome {
        let out_of_range = rules
            .iter()
            .filter(|r| r.kind == RuleKind::Percentage)
            .find(|r| !(0..=REQUIRED_PERCENT_TOTAL).contains(&r.value));
        if let Some(rule) = out_of_range {
            return ValidationOutcome::invalid(format!(
                "Percentage for recipient {} must be between 0 and 100, got {}",
                rule.recipient_id, rule.value
            ));
        }

        match percentage_total(rules) {
            Some(REQUIRED_PERCENT_TOTAL) => ValidationOutcome::ok(),
            Some(total) => ValidationOutcome::invalid(format!(
                "Percentages must sum to exactly 100, got {}",
                total
            )),
            None => ValidationOutcome::invalid("Percentage total overflowed"),
        }
    }

    fn check_fixed(rules: &[SplitRule]) -> ValidationOutcome {
        let non_positive = rules
            .iter()
            .filter(|r| r.kind == RuleKind::FixedCents)
            .find(|r| r.value <= 0);

        match non_positive {
            Some(rule) => ValidationOutcome::invalid(format!(
                "Fixed amount for recipient {} must be positive, got {}",
                rule.recipient_id, rule.value
            )),
            None => ValidationOutcome::ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn pct(values: &[i64]) -> Vec<SplitRule> {
        values
            .iter()
            .map(|v| SplitRule::percentage(Uuid::new_v4(), *v))
            .collect()
    }

    fn fixed(values: &[i64]) -> Vec<SplitRule> {
        values
            .iter()
            .map(|v| SplitRule::fixed(Uuid::new_v4(), *v))
            .collect()
    }

    #[test]
    fn percentage_summing_to_100_is_valid() {
        let outcome = SplitRulesValidator::validate(&pct(&[60, 40]), SplitType::Percentage);
        assert_eq!(outcome, ValidationOutcome::ok());
    }

    #[test]
    fn percentage_off_by_one_is_invalid() {
        let under = SplitRulesValidator::validate(&pct(&[60, 39]), SplitType::Percentage);
        assert!(!under.valid);
        assert!(under.error.unwrap().contains("99"));

        let over = SplitRulesValidator::validate(&pct(&[60, 41]), SplitType::Percentage);
        assert!(!over.valid);
    }

    #[test]
    fn empty_rules_are_invalid_for_every_type() {
        for split_type in [SplitType::Percentage, SplitType::Fixed, SplitType::Hybrid] {
            assert!(!SplitRulesValidator::validate(&[], split_type).valid);
        }
    }

    #[test]
    fn percentage_out_of_range_is_invalid() {
        let outcome = SplitRulesValidator::validate(&pct(&[150, -50]), SplitType::Percentage);
        assert!(!outcome.valid);
    }

    #[test]
    fn percentage_config_rejects_fixed_rules() {
        let mut rules = pct(&[100]);
        rules.extend(fixed(&[500]));
        assert!(!SplitRulesValidator::validate(&rules, SplitType::Percentage).valid);
    }

    #[test]
    fn fixed_rejects_zero_and_negative() {
        assert!(SplitRulesValidator::validate(&fixed(&[100, 250]), SplitType::Fixed).valid);
        assert!(!SplitRulesValidator::validate(&fixed(&[100, 0]), SplitType::Fixed).valid);
        assert!(!SplitRulesValidator::validate(&fixed(&[-1]), SplitType::Fixed).valid);
    }

    #[test]
    fn fixed_config_rejects_percentage_rules() {
        assert!(!SplitRulesValidator::validate(&pct(&[100]), SplitType::Fixed).valid);
    }

    #[test]
    fn hybrid_needs_both_kinds() {
        assert!(!SplitRulesValidator::validate(&fixed(&[500]), SplitType::Hybrid).valid);
        assert!(!SplitRulesValidator::validate(&pct(&[100]), SplitType::Hybrid).valid);

        let mut rules = fixed(&[500]);
        rules.extend(pct(&[70, 30]));
        assert!(SplitRulesValidator::validate(&rules, SplitType::Hybrid).valid);
    }

    #[test]
    fn hybrid_checks_both_constraints() {
        let mut bad_fixed = fixed(&[0]);
        bad_fixed.extend(pct(&[100]));
        assert!(!SplitRulesValidator::validate(&bad_fixed, SplitType::Hybrid).valid);

        let mut bad_pct = fixed(&[500]);
        bad_pct.extend(pct(&[50]));
        assert!(!SplitRulesValidator::validate(&bad_pct, SplitType::Hybrid).valid);
    }

    #[test]
    fn into_result_maps_to_validation_error() {
        let outcome = SplitRulesValidator::validate(&pct(&[10]), SplitType::Percentage);
        assert!(matches!(outcome.into_result(), Err(SplitError::Validation(_))));
        assert!(ValidationOutcome::ok().into_result().is_ok());
    }

    proptest! {
        #[test]
        fn percentage_valid_iff_sum_is_100(values in prop::collection::vec(0i64..=100, 1..=8)) {
            let outcome = SplitRulesValidator::validate(&pct(&values), SplitType::Percentage);
            let sum: i64 = values.iter().sum();
            prop_assert_eq!(outcome.valid, sum == 100);
        }
    }
}
