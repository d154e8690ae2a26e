//! # Validation Module
//!
//! Input validation for carts, admin edits and discount grants.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (pure)                                           │
//! │  ├── Quantities, percents, prices, names                               │
//! │  └── Cart normalisation (merge duplicates, size limits)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine (inside the transaction)                              │
//! │  ├── Products / customers exist                                        │
//! │  └── Stock is sufficient (compare-and-set debit)                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (percent BETWEEN 0 AND 100)             │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::CartLine;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates free text such as feedback or a shipping address.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a discount percent (0-100 inclusive).
pub fn validate_percent(percent: u32) -> ValidationResult<()> {
    if percent > 100 {
        return Err(ValidationError::OutOfRange {
            field: "percent".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates a price or fee in sen.
///
/// ## Rules
/// - Zero is allowed, negatives are not
/// - Must not exceed MAX_PRICE_CENTS (Rp 99.999.999,99)
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if cents > MAX_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates an absolute stock level set by an admin.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Cart
// =============================================================================

/// Validates a cart and merges repeated products.
///
/// ## Rules
/// - Must not be empty
/// - Every quantity valid (after merging)
/// - At most MAX_CART_ITEMS distinct products
///
/// First-seen order is preserved so order lines follow the cart.
pub fn normalize_cart(lines: &[CartLine]) -> CoreResult<Vec<CartLine>> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        validate_quantity(line.quantity)?;

        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(line.clone()),
        }
    }

    if merged.len() > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    for line in &merged {
        if line.quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: line.quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
    }

    Ok(merged)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Semen Tiga Roda 50kg").is_ok());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_percent() {
        assert!(validate_percent(0).is_ok());
        assert!(validate_percent(100).is_ok());
        assert!(validate_percent(101).is_err());
    }

    #[test]
    fn test_validate_price_and_stock() {
        assert!(validate_price_cents("price", 0).is_ok());
        assert!(validate_price_cents("price", -1).is_err());
        assert!(validate_price_cents("price", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents("shipping_fee", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-5).is_err());
    }

    #[test]
    fn test_normalize_cart_rejects_empty() {
        assert!(matches!(normalize_cart(&[]), Err(CoreError::EmptyCart)));
    }

    #[test]
    fn test_normalize_cart_merges_duplicates() {
        let lines = vec![
            CartLine::new("semen", 2),
            CartLine::new("bata", 100),
            CartLine::new("semen", 3),
        ];

        let merged = normalize_cart(&lines).unwrap();
        assert_eq!(merged, vec![CartLine::new("semen", 5), CartLine::new("bata", 100)]);
    }

    #[test]
    fn test_normalize_cart_rejects_bad_quantity() {
        let lines = vec![CartLine::new("semen", 0)];
        assert!(matches!(
            normalize_cart(&lines),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let lines = vec![
            CartLine::new("semen", MAX_ITEM_QUANTITY),
            CartLine::new("semen", 1),
        ];
        assert!(matches!(
            normalize_cart(&lines),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_normalize_cart_limits_distinct_products() {
        let lines: Vec<CartLine> = (0..=MAX_CART_ITEMS)
            .map(|i| CartLine::new(format!("p{}", i), 1))
            .collect();
        assert!(matches!(
            normalize_cart(&lines),
            Err(CoreError::CartTooLarge { .. })
        ));
    }
}
