//! Property-based tests for the pure ordering, pricing and scheduling rules.

use chrono::NaiveTime;
use proptest::prelude::*;
use restaurant_orders_api::{
    entities::promotion::DiscountType,
    models::{
        order_status::{
            allowed_actions, transition, AvailableActions, OrderAction, OrderSnapshot, OrderStatus,
            ServiceType,
        },
        pricing::{round_money, unit_discount, DiscountRule, OrderTotals, PricedLine},
        promotion_validity::time_in_window,
        sort_order::{compact, plan, SortEntry},
    },
};
use rust_decimal::Decimal;
use uuid::Uuid;

const STATUSES: [OrderStatus; 8] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
];

// Strategies for generating test data
fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000, 0u32..3).prop_map(|(units, scale)| Decimal::new(units, scale))
}

fn discount_type_strategy() -> impl Strategy<Value = DiscountType> {
    prop_oneof![
        Just(DiscountType::Percentage),
        Just(DiscountType::FixedAmount),
        Just(DiscountType::FixedPrice),
    ]
}

fn time_strategy() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

fn snapshot_strategy() -> impl Strategy<Value = OrderSnapshot> {
    (
        0usize..STATUSES.len(),
        prop_oneof![Just(ServiceType::Pickup), Just(ServiceType::Delivery)],
        any::<bool>(),
    )
        .prop_map(|(status, service_type, has_driver)| OrderSnapshot {
            status: STATUSES[status],
            service_type,
            driver_id: has_driver.then(Uuid::new_v4),
        })
}

/// A permutation of `n` fresh ids with arbitrary, possibly colliding positions.
fn batch_strategy() -> impl Strategy<Value = (Vec<Uuid>, Vec<SortEntry>)> {
    (1usize..20)
        .prop_flat_map(|n| {
            (
                Just(n),
                Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
                prop::collection::vec(-50i32..50, n),
            )
        })
        .prop_map(|(n, order, positions)| {
            let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
            let batch = order
                .into_iter()
                .zip(positions)
                .map(|(index, sort_order)| SortEntry {
                    id: ids[index],
                    sort_order,
                })
                .collect();
            (ids, batch)
        })
}

// Property: discounts never exceed the price they apply to
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn unit_discount_is_bounded_by_the_base_price(
        base in money_strategy(),
        value in money_strategy(),
        discount_type in discount_type_strategy(),
    ) {
        let rule = DiscountRule {
            promotion_id: Uuid::new_v4(),
            discount_type,
            discount_value: value,
            special_price: None,
        };
        let discount = unit_discount(base, &rule);
        prop_assert!(discount >= Decimal::ZERO);
        prop_assert!(discount <= round_money(base));
        prop_assert!(discount.scale() <= 2);
    }

    #[test]
    fn rounding_is_idempotent(value in money_strategy()) {
        let once = round_money(value);
        prop_assert_eq!(round_money(once), once);
        prop_assert!((value - once).abs() <= Decimal::new(5, 3));
    }

    #[test]
    fn totals_add_up(
        lines in prop::collection::vec((money_strategy(), 1i32..10), 1..6),
        fee in money_strategy(),
    ) {
        let priced: Vec<PricedLine> = lines
            .iter()
            .map(|(price, quantity)| PricedLine {
                unit_price: round_money(*price),
                unit_discount: Decimal::ZERO,
                quantity: *quantity,
            })
            .collect();
        let totals = OrderTotals::compute(&priced, fee);
        prop_assert_eq!(totals.total, totals.subtotal + totals.delivery_fee - totals.discount);
        prop_assert!(totals.total >= Decimal::ZERO);
        prop_assert_eq!(totals.discount, Decimal::ZERO);
    }
}

// Property: a complete reorder batch always yields positions 1..=n
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn complete_batches_are_renumbered_contiguously((ids, batch) in batch_strategy()) {
        let planned = plan(&ids, &batch).expect("complete batch");
        let positions: Vec<i32> = planned.iter().map(|e| e.sort_order).collect();
        let expected: Vec<i32> = (1..=ids.len() as i32).collect();
        prop_assert_eq!(positions, expected);

        let mut planned_ids: Vec<Uuid> = planned.iter().map(|e| e.id).collect();
        let mut all_ids = ids.clone();
        planned_ids.sort();
        all_ids.sort();
        prop_assert_eq!(planned_ids, all_ids);
    }

    #[test]
    fn dropping_any_id_is_rejected((ids, batch) in batch_strategy(), skip in any::<prop::sample::Index>()) {
        let skip = skip.index(batch.len());
        let partial: Vec<SortEntry> = batch
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, e)| *e)
            .collect();
        prop_assert!(plan(&ids, &partial).is_err());
    }

    #[test]
    fn compacting_a_renumbered_list_is_a_no_op((ids, batch) in batch_strategy()) {
        let planned = plan(&ids, &batch).expect("complete batch");
        prop_assert!(compact(&planned).is_empty());
    }
}

// Property: time windows and the order state machine stay consistent
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn window_bounds_are_inclusive(from in time_strategy(), until in time_strategy()) {
        prop_assert!(time_in_window(from, from, until));
        prop_assert!(time_in_window(until, from, until));
    }

    #[test]
    fn midnight_window_covers_what_the_day_window_misses(
        time in time_strategy(),
        from in time_strategy(),
        until in time_strategy(),
    ) {
        prop_assume!(from < until);
        prop_assume!(time != from && time != until);
        // [from, until] and its wrap-around complement [until, from] only share their edges.
        prop_assert_ne!(time_in_window(time, from, until), time_in_window(time, until, from));
    }

    #[test]
    fn terminal_orders_allow_nothing(order in snapshot_strategy()) {
        let flags = allowed_actions(&order);
        if order.status.is_terminal() {
            prop_assert_eq!(flags, AvailableActions::default());
        }
        prop_assert_eq!(
            flags.can_accept,
            transition(&order, &OrderAction::Accept { start_preparing: false }).is_ok()
        );
    }

    #[test]
    fn pickup_orders_never_leave_for_delivery(order in snapshot_strategy()) {
        prop_assume!(order.service_type == ServiceType::Pickup);
        prop_assert!(transition(&order, &OrderAction::PickUp).is_err());
        let assign = OrderAction::AssignDriver { driver_id: Uuid::new_v4() };
        prop_assert!(transition(&order, &assign).is_err());
    }
}
