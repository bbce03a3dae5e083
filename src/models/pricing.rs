//! Money arithmetic for order lines.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::entities::promotion::DiscountType;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A promotion that could lower the unit price of a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscountRule {
    pub promotion_id: Uuid,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    /// Per-item override of the promotional price, for `fixed_price` rules.
    pub special_price: Option<Decimal>,
}

/// Unit discount `rule` grants on `base`. Never negative, never above `base`.
pub fn unit_discount(base: Decimal, rule: &DiscountRule) -> Decimal {
    let raw = match rule.discount_type {
        DiscountType::Percentage => base * rule.discount_value / Decimal::ONE_HUNDRED,
        DiscountType::FixedAmount => rule.discount_value,
        DiscountType::FixedPrice => base - rule.special_price.unwrap_or(rule.discount_value),
    };
    round_money(raw.max(Decimal::ZERO).min(base.max(Decimal::ZERO)))
}

/// Picks the rule granting the largest unit discount. Ties keep the first.
pub fn best_discount<'a>(
    base: Decimal,
    rules: impl IntoIterator<Item = &'a DiscountRule>,
) -> Option<(Uuid, Decimal)> {
    rules
        .into_iter()
        .map(|rule| (rule.promotion_id, unit_discount(base, rule)))
        .filter(|(_, discount)| *discount > Decimal::ZERO)
        .fold(None, |best: Option<(Uuid, Decimal)>, candidate| match best {
            Some(current) if current.1 >= candidate.1 => Some(current),
            _ => Some(candidate),
        })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub unit_discount: Decimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn total_price(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }

    pub fn total_discount(&self) -> Decimal {
        round_money(self.unit_discount * Decimal::from(self.quantity))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    pub fn compute(lines: &[PricedLine], delivery_fee: Decimal) -> Self {
        let subtotal: Decimal = lines.iter().map(PricedLine::total_price).sum();
        let discount: Decimal = lines.iter().map(PricedLine::total_discount).sum();
        let delivery_fee = round_money(delivery_fee);
        Self {
            subtotal,
            delivery_fee,
            discount,
            total: subtotal + delivery_fee - discount,
        }
    }
}

/// Checks a section's selection count against its bounds. A zero maximum
/// means unbounded.
pub fn selection_count_ok(count: usize, min: i32, max: i32) -> bool {
    let count = count as i64;
    count >= i64::from(min) && (max <= 0 || count <= i64::from(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rule(discount_type: DiscountType, value: Decimal) -> DiscountRule {
        DiscountRule {
            promotion_id: Uuid::new_v4(),
            discount_type,
            discount_value: value,
            special_price: None,
        }
    }

    #[test]
    fn percentage_rounds_to_cents() {
        let r = rule(DiscountType::Percentage, dec!(15));
        assert_eq!(unit_discount(dec!(9.99), &r), dec!(1.50));
    }

    #[test]
    fn fixed_amount_is_capped_at_base() {
        let r = rule(DiscountType::FixedAmount, dec!(20));
        assert_eq!(unit_discount(dec!(12.50), &r), dec!(12.50));
    }

    #[test]
    fn fixed_price_prefers_item_special_price() {
        let mut r = rule(DiscountType::FixedPrice, dec!(8));
        assert_eq!(unit_discount(dec!(10), &r), dec!(2));
        r.special_price = Some(dec!(6.5));
        assert_eq!(unit_discount(dec!(10), &r), dec!(3.5));
        // A "special" above the base never raises the price.
        r.special_price = Some(dec!(11));
        assert_eq!(unit_discount(dec!(10), &r), Decimal::ZERO);
    }

    #[test]
    fn best_discount_wins() {
        let small = rule(DiscountType::FixedAmount, dec!(1));
        let big = rule(DiscountType::Percentage, dec!(50));
        let best = best_discount(dec!(10), [&small, &big]).unwrap();
        assert_eq!(best, (big.promotion_id, dec!(5)));
        assert!(best_discount(dec!(10), []).is_none());
    }

    #[test]
    fn totals_add_fee_and_subtract_discount() {
        let lines = [
            PricedLine { unit_price: dec!(10), unit_discount: dec!(2), quantity: 2 },
            PricedLine { unit_price: dec!(4.25), unit_discount: Decimal::ZERO, quantity: 1 },
        ];
        let totals = OrderTotals::compute(&lines, dec!(3));
        assert_eq!(totals.subtotal, dec!(24.25));
        assert_eq!(totals.discount, dec!(4));
        assert_eq!(totals.total, dec!(23.25));
    }

    #[test]
    fn selection_bounds() {
        assert!(selection_count_ok(1, 1, 1));
        assert!(!selection_count_ok(0, 1, 2));
        assert!(!selection_count_ok(3, 0, 2));
        assert!(selection_count_ok(7, 0, 0));
    }
}
