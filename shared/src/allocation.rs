//! FIFO lot allocation
//!
//! Pure decision logic for draining stock lots. The backend applies the
//! resulting plan inside a single store transaction; nothing here touches
//! storage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{line_cost, LotStatus, StockLot};

/// Why a lot drain or allocation cannot proceed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("Quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Stock lot {lot_code} is not available (status: {status})")]
    LotNotAvailable { lot_code: String, status: LotStatus },

    #[error("Quantity to remove exceeds available quantity (available: {available}, requested: {requested})")]
    ExceedsLot { available: Decimal, requested: Decimal },

    #[error("Insufficient stock (available: {available}, requested: {requested})")]
    Shortfall { available: Decimal, requested: Decimal },
}

/// Outcome of removing a quantity from a single lot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotDrain {
    pub quantity: Decimal,
    pub status: LotStatus,
}

/// Remove `quantity` from `lot`, returning its new quantity and status.
///
/// A lot that reaches zero becomes `depleted`.
pub fn drain_lot(lot: &StockLot, quantity: Decimal) -> Result<LotDrain, AllocationError> {
    if quantity <= Decimal::ZERO {
        return Err(AllocationError::NonPositiveQuantity);
    }
    if lot.status != LotStatus::Available {
        return Err(AllocationError::LotNotAvailable {
            lot_code: lot.lot_code.clone(),
            status: lot.status,
        });
    }
    if quantity > lot.quantity {
        return Err(AllocationError::ExceedsLot {
            available: lot.quantity,
            requested: quantity,
        });
    }

    let remaining = lot.quantity - quantity;
    let status = if remaining.is_zero() {
        LotStatus::Depleted
    } else {
        LotStatus::Available
    };
    Ok(LotDrain {
        quantity: remaining,
        status,
    })
}

/// One lot's share of a fulfillment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub lot_id: Uuid,
    pub lot_code: String,
    /// Quantity consumed from the lot
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    /// Lot quantity left after consumption
    pub remaining: Decimal,
    pub status_after: LotStatus,
}

/// Ordered set of lot draws that together satisfy a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub requested: Decimal,
    pub allocations: Vec<Allocation>,
}

impl AllocationPlan {
    pub fn total_quantity(&self) -> Decimal {
        self.allocations.iter().map(|a| a.quantity).sum()
    }

    pub fn total_cost(&self) -> Decimal {
        self.allocations.iter().map(|a| a.total_cost).sum()
    }
}

/// Lots in the order FIFO consumes them: oldest receipt first, ties by
/// creation time. Non-allocatable lots are dropped.
pub fn fifo_order(lots: &[StockLot]) -> Vec<&StockLot> {
    let mut ordered: Vec<&StockLot> = lots.iter().filter(|l| l.is_allocatable()).collect();
    ordered.sort_by(|a, b| {
        a.received_date
            .cmp(&b.received_date)
            .then(a.created_at.cmp(&b.created_at))
    });
    ordered
}

/// Sum of allocatable quantity across `lots`
pub fn allocatable_quantity(lots: &[StockLot]) -> Decimal {
    lots.iter()
        .filter(|l| l.is_allocatable())
        .map(|l| l.quantity)
        .sum()
}

/// Plan a FIFO allocation of `requested` across `lots`.
///
/// All-or-nothing: if the allocatable lots cannot cover the whole request,
/// no plan is produced.
pub fn plan_fifo(lots: &[StockLot], requested: Decimal) -> Result<AllocationPlan, AllocationError> {
    if requested <= Decimal::ZERO {
        return Err(AllocationError::NonPositiveQuantity);
    }

    let available = allocatable_quantity(lots);
    if available < requested {
        return Err(AllocationError::Shortfall {
            available,
            requested,
        });
    }

    let mut remaining = requested;
    let mut allocations = Vec::new();
    for lot in fifo_order(lots) {
        if remaining.is_zero() {
            break;
        }
        let take = remaining.min(lot.quantity);
        let drain = drain_lot(lot, take)?;
        allocations.push(Allocation {
            lot_id: lot.id,
            lot_code: lot.lot_code.clone(),
            quantity: take,
            unit_cost: lot.unit_cost,
            total_cost: line_cost(take, lot.unit_cost),
            remaining: drain.quantity,
            status_after: drain.status,
        });
        remaining -= take;
    }

    Ok(AllocationPlan {
        requested,
        allocations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lot(code: &str, day: u32, created_secs: i64, qty: Decimal, cost: Decimal) -> StockLot {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
            + Duration::seconds(created_secs);
        StockLot {
            id: Uuid::new_v4(),
            lot_code: code.to_string(),
            item_id: Uuid::nil(),
            warehouse_id: 1,
            batch_no: format!("B-{}", code),
            quantity: qty,
            unit_cost: cost,
            total_cost: qty * cost,
            expiry_date: None,
            supplier: "PT Pupuk".to_string(),
            status: LotStatus::Available,
            notes: None,
            received_date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            created_at: created,
            updated_at: created,
        }
    }

    // ========================================================================
    // drain_lot
    // ========================================================================

    #[test]
    fn test_drain_partial_keeps_lot_available() {
        let l = lot("L1", 1, 0, dec("10"), dec("2"));
        let drain = drain_lot(&l, dec("4")).unwrap();
        assert_eq!(drain.quantity, dec("6"));
        assert_eq!(drain.status, LotStatus::Available);
    }

    #[test]
    fn test_drain_to_zero_depletes_lot() {
        let l = lot("L1", 1, 0, dec("10"), dec("2"));
        let drain = drain_lot(&l, dec("10")).unwrap();
        assert!(drain.quantity.is_zero());
        assert_eq!(drain.status, LotStatus::Depleted);
    }

    #[test]
    fn test_drain_more_than_lot_fails() {
        let l = lot("L1", 1, 0, dec("10"), dec("2"));
        assert_eq!(
            drain_lot(&l, dec("10.5")),
            Err(AllocationError::ExceedsLot {
                available: dec("10"),
                requested: dec("10.5"),
            })
        );
    }

    #[test]
    fn test_drain_unavailable_lot_fails() {
        let mut l = lot("L1", 1, 0, dec("10"), dec("2"));
        l.status = LotStatus::Reserved;
        assert!(matches!(
            drain_lot(&l, dec("1")),
            Err(AllocationError::LotNotAvailable { .. })
        ));
    }

    #[test]
    fn test_drain_non_positive_fails() {
        let l = lot("L1", 1, 0, dec("10"), dec("2"));
        assert_eq!(drain_lot(&l, Decimal::ZERO), Err(AllocationError::NonPositiveQuantity));
        assert_eq!(drain_lot(&l, dec("-1")), Err(AllocationError::NonPositiveQuantity));
    }

    // ========================================================================
    // plan_fifo
    // ========================================================================

    #[test]
    fn test_fifo_consumes_oldest_lot_first() {
        let lots = vec![
            lot("L2", 2, 10, dec("5"), dec("3")),
            lot("L1", 1, 20, dec("5"), dec("2")),
        ];
        let plan = plan_fifo(&lots, dec("7")).unwrap();

        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.allocations[0].lot_code, "L1");
        assert_eq!(plan.allocations[0].quantity, dec("5"));
        assert_eq!(plan.allocations[0].status_after, LotStatus::Depleted);
        assert_eq!(plan.allocations[1].lot_code, "L2");
        assert_eq!(plan.allocations[1].quantity, dec("2"));
        assert_eq!(plan.allocations[1].remaining, dec("3"));
        assert_eq!(plan.total_cost(), dec("16"));
    }

    #[test]
    fn test_fifo_same_day_breaks_ties_by_creation() {
        let lots = vec![
            lot("LATE", 1, 50, dec("5"), dec("1")),
            lot("EARLY", 1, 5, dec("5"), dec("1")),
        ];
        let plan = plan_fifo(&lots, dec("3")).unwrap();
        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].lot_code, "EARLY");
    }

    #[test]
    fn test_fifo_skips_unavailable_lots() {
        let mut depleted = lot("OLD", 1, 0, Decimal::ZERO, dec("1"));
        depleted.status = LotStatus::Depleted;
        let mut expired = lot("EXP", 1, 1, dec("9"), dec("1"));
        expired.status = LotStatus::Expired;
        let fresh = lot("NEW", 3, 2, dec("4"), dec("1"));

        let plan = plan_fifo(&[depleted, expired, fresh], dec("4")).unwrap();
        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].lot_code, "NEW");
    }

    #[test]
    fn test_fifo_shortfall_reports_available_and_requested() {
        let lots = vec![lot("A", 1, 0, dec("100"), dec("2"))];
        let err = plan_fifo(&lots, dec("120")).unwrap_err();
        assert_eq!(
            err,
            AllocationError::Shortfall {
                available: dec("100"),
                requested: dec("120"),
            }
        );
        assert_eq!(
            err.to_string(),
            "Insufficient stock (available: 100, requested: 120)"
        );
    }

    #[test]
    fn test_fifo_exact_fit_depletes_everything() {
        let lots = vec![
            lot("A", 1, 0, dec("2.5"), dec("4")),
            lot("B", 2, 0, dec("1.5"), dec("4")),
        ];
        let plan = plan_fifo(&lots, dec("4")).unwrap();
        assert!(plan
            .allocations
            .iter()
            .all(|a| a.status_after == LotStatus::Depleted));
    }

    // ========================================================================
    // Property Tests
    // ========================================================================

    fn arb_lots() -> impl Strategy<Value = Vec<StockLot>> {
        prop::collection::vec((1u32..28, 0i64..1000, 1u32..200, 1u32..50), 0..8).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (day, secs, qty, cost))| {
                    lot(
                        &format!("L{}", i),
                        day,
                        secs,
                        Decimal::from(qty),
                        Decimal::from(cost),
                    )
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_plan_consumes_exactly_requested(lots in arb_lots(), requested in 1u32..1000) {
            let requested = Decimal::from(requested);
            let available = allocatable_quantity(&lots);
            match plan_fifo(&lots, requested) {
                Ok(plan) => {
                    prop_assert!(available >= requested);
                    prop_assert_eq!(plan.total_quantity(), requested);
                }
                Err(AllocationError::Shortfall { available: a, requested: r }) => {
                    prop_assert!(available < requested);
                    prop_assert_eq!(a, available);
                    prop_assert_eq!(r, requested);
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        #[test]
        fn prop_plan_never_overdraws_a_lot(lots in arb_lots(), requested in 1u32..1000) {
            if let Ok(plan) = plan_fifo(&lots, Decimal::from(requested)) {
                for a in &plan.allocations {
                    let source = lots.iter().find(|l| l.id == a.lot_id).unwrap();
                    prop_assert!(a.quantity > Decimal::ZERO);
                    prop_assert!(a.quantity <= source.quantity);
                    prop_assert_eq!(source.quantity - a.quantity, a.remaining);
                    prop_assert_eq!(a.total_cost, a.quantity * source.unit_cost);
                }
            }
        }

        #[test]
        fn prop_plan_follows_receipt_order(lots in arb_lots(), requested in 1u32..1000) {
            if let Ok(plan) = plan_fifo(&lots, Decimal::from(requested)) {
                let keys: Vec<_> = plan
                    .allocations
                    .iter()
                    .map(|a| {
                        let l = lots.iter().find(|l| l.id == a.lot_id).unwrap();
                        (l.received_date, l.created_at)
                    })
                    .collect();
                prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));
                // only the last lot touched may be left partially drained
                let n = plan.allocations.len();
                for a in plan.allocations.iter().take(n.saturating_sub(1)) {
                    prop_assert_eq!(a.status_after, LotStatus::Depleted);
                }
            }
        }
    }
}
