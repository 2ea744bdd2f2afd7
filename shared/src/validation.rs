//! Validation utilities for the inventory ledger
//!
//! Field-level checks shared by the catalog, lot store and request workflow.

use rust_decimal::Decimal;

/// Longest SKU the catalog accepts
pub const MAX_SKU_LENGTH: usize = 50;

// ============================================================================
// Text Fields
// ============================================================================

/// Validate that a required text field is present
pub fn validate_required(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Field is required");
    }
    Ok(())
}

/// Validate SKU format: non-empty, no whitespace, at most 50 characters
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.trim().is_empty() {
        return Err("SKU is required");
    }
    if sku.chars().count() > MAX_SKU_LENGTH {
        return Err("SKU must be at most 50 characters");
    }
    if sku.chars().any(char::is_whitespace) {
        return Err("SKU must not contain whitespace");
    }
    Ok(())
}

/// Validate that a rejection carries a reason
pub fn validate_rejection_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("Rejection reason is required");
    }
    Ok(())
}

// ============================================================================
// Quantities and Costs
// ============================================================================

/// Validate a movement, receipt or request quantity
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate a lot's unit cost
pub fn validate_unit_cost(unit_cost: Decimal) -> Result<(), &'static str> {
    if unit_cost <= Decimal::ZERO {
        return Err("Unit cost must be greater than zero");
    }
    Ok(())
}

/// Validate a reorder point or average cost
pub fn validate_non_negative(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Value cannot be negative");
    }
    Ok(())
}
