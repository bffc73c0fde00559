pub mod stripe_client;

pub use stripe_client::StripeClient;

use crate::domain::TicketOrder;
use crate::error::{AppError, Result};

/// One hosted-checkout line item, provider-agnostic. Amounts are whole
/// cents, already resolved through the active price phase.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub unit_amount_cents: i64,
    pub quantity: u64,
}

/// Prices resolved for an order before checkout: the ordered ticket's own
/// active-phase price, and the per-seat price for kino seats beyond the
/// first (kino ticket price, falling back to the `kino-standard` table).
#[derive(Debug, Clone)]
pub struct ResolvedPrices {
    pub own_price_cents: i64,
    pub own_name: String,
    pub extra_unit_price_cents: Option<i64>,
    pub extra_unit_name: Option<String>,
}

impl ResolvedPrices {
    /// Checks that the table covers the requested seat count. Run before
    /// the order row is inserted, so a misconfigured price table rejects
    /// the request without leaving an orphan pending order.
    pub fn require_for_quantity(&self, kino_quantity: i64) -> Result<()> {
        if self.own_price_cents <= 0 {
            return Err(AppError::Payment("no resolvable price for ticket".to_string()));
        }
        if kino_quantity > 1 && !self.extra_unit_price_cents.is_some_and(|p| p > 0) {
            return Err(AppError::Payment(
                "no resolvable price for additional kino tickets".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builds the checkout line items for a validated order.
///
/// The first unit is always billed at the ordered ticket's own price; for
/// kino/combo orders with more than one seat, the remaining seats go on a
/// second line at the standard per-seat price. Prices are re-checked here
/// so nothing non-positive ever reaches the payment provider.
pub fn line_items_for_order(order: &TicketOrder, prices: &ResolvedPrices) -> Result<Vec<LineItem>> {
    if prices.own_price_cents <= 0 {
        return Err(AppError::Payment("no resolvable price for ticket".to_string()));
    }

    let mut items = vec![LineItem {
        name: prices.own_name.clone(),
        unit_amount_cents: prices.own_price_cents,
        quantity: 1,
    }];

    let extra_seats = order.kino_quantity.saturating_sub(1);
    if extra_seats > 0 {
        let unit_amount = prices.extra_unit_price_cents.ok_or_else(|| {
            AppError::Payment("no resolvable price for additional kino tickets".to_string())
        })?;
        if unit_amount <= 0 {
            return Err(AppError::Payment("no resolvable price for additional kino tickets".to_string()));
        }
        items.push(LineItem {
            name: prices
                .extra_unit_name
                .clone()
                .unwrap_or_else(|| "Kinoticket".to_string()),
            unit_amount_cents: unit_amount,
            quantity: extra_seats as u64,
        });
    }

    Ok(items)
}

pub fn total_cents(items: &[LineItem]) -> i64 {
    items
        .iter()
        .map(|i| i.unit_amount_cents * i.quantity as i64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Locale, OrderStatus, TicketType};
    use chrono::Utc;
    use uuid::Uuid;

    fn order(ticket_type: TicketType, quantity: i64) -> TicketOrder {
        TicketOrder {
            id: Uuid::new_v4(),
            ticket_type,
            status: OrderStatus::Pending,
            customer_name: "Rojda Baran".to_string(),
            customer_email: "rojda@example.org".to_string(),
            kino_quantity: quantity,
            amount_total_cents: 0,
            currency: String::new(),
            locale: Locale::De,
            stripe_session_id: None,
            stripe_payment_intent_id: None,
            created_at: Utc::now(),
        }
    }

    fn prices(own: i64, extra: Option<i64>) -> ResolvedPrices {
        ResolvedPrices {
            own_price_cents: own,
            own_name: "Festivalpass".to_string(),
            extra_unit_price_cents: extra,
            extra_unit_name: extra.map(|_| "Kinoticket".to_string()),
        }
    }

    #[test]
    fn online_order_is_a_single_line() {
        let items = line_items_for_order(&order(TicketType::Online, 0), &prices(1500, None)).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_amount_cents, 1500);
        assert_eq!(items[0].quantity, 1);
    }

    #[test]
    fn single_kino_seat_needs_no_extra_line() {
        let items = line_items_for_order(&order(TicketType::Kino, 1), &prices(900, None)).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn extra_kino_seats_go_on_a_second_line() {
        let items =
            line_items_for_order(&order(TicketType::Kino, 4), &prices(900, Some(1100))).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].unit_amount_cents, 1100);
        assert_eq!(items[1].quantity, 3);
        assert_eq!(total_cents(&items), 900 + 3 * 1100);
    }

    #[test]
    fn combo_extra_seats_use_the_fallback_price() {
        let items =
            line_items_for_order(&order(TicketType::Combo, 2), &prices(2500, Some(1100))).unwrap();
        assert_eq!(items[0].unit_amount_cents, 2500);
        assert_eq!(items[1].unit_amount_cents, 1100);
    }

    #[test]
    fn missing_or_zero_prices_are_rejected() {
        assert!(line_items_for_order(&order(TicketType::Online, 0), &prices(0, None)).is_err());
        assert!(line_items_for_order(&order(TicketType::Kino, 3), &prices(900, None)).is_err());
        assert!(line_items_for_order(&order(TicketType::Kino, 3), &prices(900, Some(0))).is_err());
    }

    #[test]
    fn quantity_check_catches_missing_seat_price_up_front() {
        assert!(prices(900, Some(1100)).require_for_quantity(4).is_ok());
        assert!(prices(900, None).require_for_quantity(1).is_ok());
        assert!(matches!(
            prices(900, None).require_for_quantity(2),
            Err(AppError::Payment(_))
        ));
        assert!(prices(900, Some(0)).require_for_quantity(2).is_err());
        assert!(prices(0, None).require_for_quantity(1).is_err());
    }
}
