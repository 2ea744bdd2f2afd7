//! Lot store and movement ledger tests
//!
//! Tests for stock receipt and depletion including:
//! - Receipt cost and last-cost average
//! - Quantity conservation between lots and their movements
//! - Lot availability rules on decrement
//! - Retry of conflicting units of work

mod common;

use common::*;
use proptest::prelude::*;
use shared::{net_lot_quantity, MovementFilter, MovementType, Page};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use agrione_inventory::error::AppError;
    use agrione_inventory::services::ledger::MovementDraft;
    use agrione_inventory::services::lot_store::RemoveStockInput;
    use agrione_inventory::services::LedgerEvent;
    use axum::http::StatusCode;
    use shared::{LotFilter, LotStatus};
    use uuid::Uuid;

    fn removal(lot_id: Uuid, quantity: &str) -> RemoveStockInput {
        RemoveStockInput {
            lot_id,
            quantity: dec(quantity),
            reason: "Aplikasi pemupukan blok A1".to_string(),
            performed_by: "budi".to_string(),
            reference: Some("WO-42".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_receive_records_lot_and_movement() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "10").await;

        let receipt = ledger
            .receive(item.id, WAREHOUSE_1, "100", "2.0", day(1))
            .await;

        let lot = &receipt.lot;
        assert!(lot.lot_code.starts_with("LOT-"));
        assert_eq!(lot.quantity, dec("100"));
        assert_eq!(lot.total_cost, dec("200.0"));
        assert_eq!(lot.status, LotStatus::Available);
        assert_eq!(lot.received_date, day(1));

        let movement = &receipt.movement;
        assert_eq!(movement.movement_type, MovementType::In);
        assert_eq!(movement.lot_id, Some(lot.id));
        assert_eq!(movement.quantity, dec("100"));
        assert_eq!(movement.total_cost, dec("200"));
        assert_eq!(movement.reason, "Stock Receipt");
        assert_eq!(movement.reference.as_deref(), Some(lot.batch_no.as_str()));
        assert_eq!(movement.performed_by, "System");

        let item = ledger.catalog().get(item.id).await.unwrap();
        assert_eq!(item.avg_cost, dec("2.0"));
    }

    #[tokio::test]
    async fn test_avg_cost_is_last_receipt_cost() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "10").await;

        ledger.receive(item.id, WAREHOUSE_1, "100", "2.0", day(1)).await;
        ledger.receive(item.id, WAREHOUSE_1, "10", "3.5", day(2)).await;

        let item = ledger.catalog().get(item.id).await.unwrap();
        assert_eq!(item.avg_cost, dec("3.5"));
    }

    #[tokio::test]
    async fn test_receive_defaults_received_date_to_today() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "10").await;

        let mut input = receipt_input(item.id, WAREHOUSE_1, "5", "1", day(1));
        input.received_date = None;
        let receipt = ledger.lots().receive(input).await.unwrap();

        assert_eq!(receipt.lot.received_date, chrono::Utc::now().date_naive());
    }

    #[tokio::test]
    async fn test_receive_rejects_invalid_input() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "10").await;

        let err = ledger
            .lots()
            .receive(receipt_input(item.id, WAREHOUSE_1, "0", "2", day(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));

        let err = ledger
            .lots()
            .receive(receipt_input(item.id, WAREHOUSE_1, "5", "0", day(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "unit_cost"));

        let mut input = receipt_input(item.id, WAREHOUSE_1, "5", "2", day(1));
        input.supplier = "  ".to_string();
        let err = ledger.lots().receive(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "supplier"));
    }

    #[tokio::test]
    async fn test_receive_requires_stock_warehouse() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "10").await;

        let err = ledger
            .lots()
            .receive(receipt_input(item.id, FIELD_PLOT, "5", "2", day(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "warehouse_id"));

        let err = ledger
            .lots()
            .receive(receipt_input(item.id, 777, "5", "2", day(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Storage plots hold stock too
        ledger.receive(item.id, WAREHOUSE_2, "5", "2", day(1)).await;
    }

    #[tokio::test]
    async fn test_receive_unknown_item() {
        let ledger = ledger();
        let err = ledger
            .lots()
            .receive(receipt_input(Uuid::new_v4(), WAREHOUSE_1, "5", "2", day(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref r) if r == "Inventory item"));
        assert!(ledger.store.all_lots().await.is_empty());
    }

    #[tokio::test]
    async fn test_available_quantity_by_warehouse() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "10").await;
        ledger.receive(item.id, WAREHOUSE_1, "100", "2", day(1)).await;
        ledger.receive(item.id, WAREHOUSE_1, "50", "2.5", day(2)).await;
        ledger.receive(item.id, WAREHOUSE_2, "7", "2", day(1)).await;

        let lots = ledger.lots();
        assert_eq!(
            lots.available_quantity(item.id, WAREHOUSE_1).await.unwrap(),
            dec("150")
        );
        assert_eq!(
            lots.available_quantity(item.id, WAREHOUSE_2).await.unwrap(),
            dec("7")
        );
    }

    #[tokio::test]
    async fn test_decrement_drains_lot() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "0").await;
        let lot = ledger
            .receive(item.id, WAREHOUSE_1, "30", "2", day(1))
            .await
            .lot;

        let removed = ledger.lots().decrement(removal(lot.id, "12")).await.unwrap();
        assert_eq!(removed.lot.quantity, dec("18"));
        assert_eq!(removed.lot.status, LotStatus::Available);
        assert_eq!(removed.movement.movement_type, MovementType::Out);
        assert_eq!(removed.movement.quantity, dec("12"));
        assert_eq!(removed.movement.total_cost, dec("24"));
        assert_eq!(removed.movement.performed_by, "budi");
        assert_eq!(removed.movement.reference.as_deref(), Some("WO-42"));

        let removed = ledger.lots().decrement(removal(lot.id, "18")).await.unwrap();
        assert_eq!(removed.lot.quantity, dec("0"));
        assert_eq!(removed.lot.status, LotStatus::Depleted);
    }

    #[tokio::test]
    async fn test_decrement_beyond_lot_quantity() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "0").await;
        let lot = ledger
            .receive(item.id, WAREHOUSE_1, "10", "2", day(1))
            .await
            .lot;

        let err = ledger
            .lots()
            .decrement(removal(lot.id, "10.5"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientQuantity { .. }));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let lot = ledger.lots().get(lot.id).await.unwrap();
        assert_eq!(lot.quantity, dec("10"));
    }

    #[tokio::test]
    async fn test_decrement_depleted_lot_not_available() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "0").await;
        let lot = ledger
            .receive(item.id, WAREHOUSE_1, "10", "2", day(1))
            .await
            .lot;
        ledger.lots().decrement(removal(lot.id, "10")).await.unwrap();

        let err = ledger
            .lots()
            .decrement(removal(lot.id, "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LotNotAvailable(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_decrement_unknown_lot() {
        let ledger = ledger();
        let err = ledger
            .lots()
            .decrement(removal(Uuid::new_v4(), "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref r) if r == "Stock lot"));
    }

    #[tokio::test]
    async fn test_decrement_requires_performer() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "0").await;
        let lot = ledger
            .receive(item.id, WAREHOUSE_1, "10", "2", day(1))
            .await
            .lot;

        let mut input = removal(lot.id, "1");
        input.performed_by = "   ".to_string();
        let err = ledger.lots().decrement(input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "performed_by"));
    }

    #[tokio::test]
    async fn test_decrement_publishes_low_stock() {
        let mut ledger = ledger();
        let item = ledger.item("SKU-001", "10").await;
        let lot = ledger
            .receive(item.id, WAREHOUSE_1, "30", "2", day(1))
            .await
            .lot;

        ledger.lots().decrement(removal(lot.id, "5")).await.unwrap();
        assert!(ledger.drain_events().is_empty());

        ledger.lots().decrement(removal(lot.id, "15")).await.unwrap();
        let events = ledger.drain_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            LedgerEvent::LowStock {
                item_id,
                warehouse_id,
                available,
                reorder_point,
                ..
            } => {
                assert_eq!(*item_id, item.id);
                assert_eq!(*warehouse_id, WAREHOUSE_1);
                assert_eq!(*available, dec("10"));
                assert_eq!(*reorder_point, dec("10"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decrement_retries_conflicts() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "0").await;
        let lot = ledger
            .receive(item.id, WAREHOUSE_1, "10", "2", day(1))
            .await
            .lot;

        ledger.store.inject_conflicts(2);
        let removed = ledger.lots().decrement(removal(lot.id, "4")).await.unwrap();
        assert_eq!(removed.lot.quantity, dec("6"));

        // Exactly one out movement despite the retried attempts
        let outs: Vec<_> = ledger
            .store
            .all_movements()
            .await
            .into_iter()
            .filter(|m| m.movement_type == MovementType::Out)
            .collect();
        assert_eq!(outs.len(), 1);
    }

    #[tokio::test]
    async fn test_decrement_gives_up_after_retries() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "0").await;
        let lot = ledger
            .receive(item.id, WAREHOUSE_1, "10", "2", day(1))
            .await
            .lot;

        ledger.store.inject_conflicts(10);
        let err = ledger
            .lots()
            .decrement(removal(lot.id, "4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransactionConflict(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        ledger.store.inject_conflicts(0);
        let lot = ledger.lots().get(lot.id).await.unwrap();
        assert_eq!(lot.quantity, dec("10"));
    }

    #[tokio::test]
    async fn test_record_adjustment_movement() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "0").await;

        let movement = ledger
            .movements()
            .record(MovementDraft {
                movement_type: MovementType::Adjustment,
                item_id: item.id,
                lot_id: None,
                warehouse_id: WAREHOUSE_1,
                quantity: dec("3"),
                unit_cost: dec("1.25"),
                reason: "Stock opname".to_string(),
                reference: None,
                performed_by: "auditor".to_string(),
                notes: None,
                stock_request_id: None,
            })
            .await
            .unwrap();

        assert!(movement.movement_code.starts_with("MOV-"));
        assert_eq!(movement.total_cost, dec("3.75"));
        assert_eq!(movement.lot_id, None);
    }

    #[tokio::test]
    async fn test_list_movements_filters() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "0").await;
        let lot = ledger
            .receive(item.id, WAREHOUSE_1, "10", "2", day(1))
            .await
            .lot;
        ledger.receive(item.id, WAREHOUSE_2, "10", "2", day(1)).await;
        ledger.lots().decrement(removal(lot.id, "3")).await.unwrap();

        let movements = ledger.movements();
        let outs = movements
            .list(
                &MovementFilter {
                    movement_type: Some(MovementType::Out),
                    ..Default::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(outs.len(), 1);

        let in_w1 = movements
            .list(
                &MovementFilter {
                    warehouse_id: Some(WAREHOUSE_1),
                    ..Default::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(in_w1.len(), 2);
        // Newest first
        assert_eq!(in_w1[0].movement_type, MovementType::Out);

        let by_performer = movements
            .list(
                &MovementFilter {
                    search: Some("BUDI".to_string()),
                    ..Default::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(by_performer.len(), 1);
    }

    #[tokio::test]
    async fn test_list_lots_filters() {
        let ledger = ledger();
        let item = ledger.item("SKU-001", "0").await;
        let lot = ledger
            .receive(item.id, WAREHOUSE_1, "10", "2", day(1))
            .await
            .lot;
        ledger.receive(item.id, WAREHOUSE_1, "10", "2", day(2)).await;
        ledger.receive(item.id, WAREHOUSE_2, "10", "2", day(3)).await;
        ledger.lots().decrement(removal(lot.id, "10")).await.unwrap();

        let lots = ledger.lots();
        let available_w1 = lots
            .list(
                &LotFilter {
                    warehouse_id: Some(WAREHOUSE_1),
                    status: Some(LotStatus::Available),
                    ..Default::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(available_w1.len(), 1);
        assert_eq!(available_w1[0].received_date, day(2));

        let by_item_name = lots
            .list(
                &LotFilter {
                    search: Some("pupuk sku-001".to_string()),
                    ..Default::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(by_item_name.len(), 3);
        // Newest receipt first
        assert_eq!(by_item_name[0].received_date, day(3));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use agrione_inventory::services::lot_store::RemoveStockInput;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Received quantity minus removals always equals the lot's quantity,
        /// and every movement's cost is quantity times unit cost
        #[test]
        fn prop_lot_quantity_conserved(
            received in 1u32..500,
            unit_cost_cents in 1u32..10_000,
            removals in proptest::collection::vec(1u32..200, 0..12),
        ) {
            let rt = runtime();
            rt.block_on(async {
                let ledger = ledger();
                let item = ledger.item("SKU-001", "0").await;
                let unit_cost = rust_decimal::Decimal::new(unit_cost_cents as i64, 2);
                let lot = ledger
                    .receive(item.id, WAREHOUSE_1, &received.to_string(), &unit_cost.to_string(), day(1))
                    .await
                    .lot;

                for quantity in removals {
                    // Over-removals are rejected and leave no trace
                    let _ = ledger
                        .lots()
                        .decrement(RemoveStockInput {
                            lot_id: lot.id,
                            quantity: quantity.into(),
                            reason: "Pemakaian".to_string(),
                            performed_by: "budi".to_string(),
                            reference: None,
                            notes: None,
                        })
                        .await;
                }

                let lot = ledger.lots().get(lot.id).await.unwrap();
                let movements: Vec<_> = ledger
                    .store
                    .all_movements()
                    .await
                    .into_iter()
                    .filter(|m| m.lot_id == Some(lot.id))
                    .collect();

                prop_assert_eq!(net_lot_quantity(&movements), lot.quantity);
                prop_assert!(lot.quantity >= rust_decimal::Decimal::ZERO);
                prop_assert_eq!(lot.total_cost, rust_decimal::Decimal::from(received) * unit_cost);
                for m in &movements {
                    prop_assert_eq!(m.total_cost, m.quantity * m.unit_cost);
                    prop_assert_eq!(m.unit_cost, unit_cost);
                }
                Ok(())
            })?;
        }
    }
}
