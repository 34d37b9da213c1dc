//! # Return Rules
//!
//! Checks a return request against the originating sale and the returns
//! already recorded for the same (sale, product) pair.
//!
//! ## Cumulative Bound
//! ```text
//! Sale line: product P × 2
//!
//!   return 1 of P   → sold 2, already returned 0, remaining 2  ✅
//!   return 2 of P   → sold 2, already returned 1, remaining 1  ❌ ReturnExceedsSold
//!   return 1 of P   → sold 2, already returned 1, remaining 1  ✅
//! ```
//! Comparing only against the line quantity would accept the second request
//! and re-credit more stock than was ever sold.

use crate::error::{CoreError, CoreResult};
use crate::types::{NewReturn, Sale, SaleStatus};
use crate::validation::{validate_non_negative_cents, validate_quantity};

/// How much of one product on one sale can still be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnAllowance {
    pub sold: i64,
    pub already_returned: i64,
}

impl ReturnAllowance {
    #[inline]
    pub fn remaining(&self) -> i64 {
        (self.sold - self.already_returned).max(0)
    }
}

/// Validates the request fields that need no stored data.
pub fn validate_return_request(request: &NewReturn) -> CoreResult<()> {
    validate_quantity(request.quantity)?;
    validate_non_negative_cents("refund_amount", request.refund_amount_cents)?;
    Ok(())
}

/// Checks `request` against `sale` given the quantity of the same product
/// already returned on that sale.
///
/// ## Errors
/// - `InvalidSaleStatus` if the sale was cancelled
/// - `ProductNotInSale` if no line of the sale references the product
/// - `ReturnExceedsSold` if the request exceeds the remaining allowance
pub fn check_return(
    sale: &Sale,
    request: &NewReturn,
    already_returned: i64,
) -> CoreResult<ReturnAllowance> {
    if sale.status != SaleStatus::Completed {
        return Err(CoreError::InvalidSaleStatus {
            sale_id: sale.id.clone(),
            status: sale.status.to_string(),
        });
    }

    if !sale.contains_product(&request.product_id) {
        return Err(CoreError::ProductNotInSale {
            sale_id: sale.id.clone(),
            product_id: request.product_id.clone(),
        });
    }

    let allowance = ReturnAllowance {
        sold: sale.quantity_sold(&request.product_id),
        already_returned,
    };

    if request.quantity > allowance.remaining() {
        return Err(CoreError::ReturnExceedsSold {
            product_id: request.product_id.clone(),
            sold: allowance.sold,
            already_returned: allowance.already_returned,
            requested: request.quantity,
        });
    }

    Ok(allowance)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::SaleLine;
    use chrono::Utc;

    fn sale_of(product_id: &str, quantity: i64) -> Sale {
        Sale {
            id: "s-1".to_string(),
            customer_id: "c-1".to_string(),
            total_amount_cents: 100 * quantity,
            status: SaleStatus::Completed,
            created_by: "u-1".to_string(),
            created_at: Utc::now(),
            lines: vec![SaleLine {
                id: "l-1".to_string(),
                sale_id: "s-1".to_string(),
                line_no: 0,
                product_id: product_id.to_string(),
                quantity,
                price_at_sale_cents: 100,
                subtotal_cents: 100 * quantity,
            }],
        }
    }

    fn request(product_id: &str, quantity: i64) -> NewReturn {
        NewReturn {
            sale_id: "s-1".to_string(),
            product_id: product_id.to_string(),
            quantity,
            refund_amount_cents: 100 * quantity,
            reason: Some("damaged".to_string()),
        }
    }

    #[test]
    fn test_within_allowance() {
        let allowance = check_return(&sale_of("p-1", 2), &request("p-1", 2), 0).unwrap();
        assert_eq!(allowance.remaining(), 2);
    }

    #[test]
    fn test_more_than_line_quantity() {
        let err = check_return(&sale_of("p-1", 2), &request("p-1", 3), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_prior_returns_count_against_allowance() {
        let sale = sale_of("p-1", 2);
        assert!(check_return(&sale, &request("p-1", 1), 0).is_ok());

        let err = check_return(&sale, &request("p-1", 2), 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReturnExceedsSold {
                sold: 2,
                already_returned: 1,
                requested: 2,
                ..
            }
        ));
        assert!(check_return(&sale, &request("p-1", 1), 1).is_ok());
    }

    #[test]
    fn test_product_not_in_sale() {
        let err = check_return(&sale_of("p-1", 2), &request("p-9", 1), 0).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotInSale { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_cancelled_sale() {
        let mut sale = sale_of("p-1", 2);
        sale.status = SaleStatus::Cancelled;
        let err = check_return(&sale, &request("p-1", 1), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_request_validation() {
        assert!(validate_return_request(&request("p-1", 1)).is_ok());
        assert!(validate_return_request(&request("p-1", 0)).is_err());

        let mut negative_refund = request("p-1", 1);
        negative_refund.refund_amount_cents = -1;
        assert!(validate_return_request(&negative_refund).is_err());
    }
}
