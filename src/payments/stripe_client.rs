use std::collections::HashMap;
use std::time::Duration;

use stripe::{
    CheckoutSession, CheckoutSessionMode, CheckoutSessionPaymentStatus, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems, Currency, EventObject, EventType,
    Expandable, Webhook, WebhookError,
};

/// Currencies the shop can settle in. Anything unrecognized falls back to
/// EUR, the festival's default.
fn currency_from_code(code: &str) -> Currency {
    match code.to_ascii_lowercase().as_str() {
        "eur" => Currency::EUR,
        "usd" => Currency::USD,
        "gbp" => Currency::GBP,
        "chf" => Currency::CHF,
        other => {
            tracing::warn!("Unsupported currency {:?}, defaulting to EUR", other);
            Currency::EUR
        }
    }
}
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::payments::LineItem;

const STRIPE_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Metadata keys correlating a checkout session back to our records.
pub const META_ORDER_ID: &str = "order_id";
pub const META_DONATION_ID: &str = "donation_id";
pub const META_TICKET_TYPE: &str = "ticket_type";
pub const META_LOCALE: &str = "locale";

pub struct StripeClient {
    client: Client,
    webhook_secret: String,
    currency: Currency,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRef {
    pub id: String,
    pub url: String,
}

/// Signature-verified webhook outcome, reduced to what fulfillment needs.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutCompletion),
    /// Anything we do not act on: other event types, unpaid sessions.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct CheckoutCompletion {
    pub session_id: String,
    pub order_id: Option<Uuid>,
    pub donation_id: Option<Uuid>,
    pub payment_intent_id: Option<String>,
    /// `None` when Stripe omitted the session total.
    pub amount_total_cents: Option<i64>,
    pub currency: String,
}

impl StripeClient {
    pub fn new(api_key: String, webhook_secret: String, currency: &str) -> Self {
        let client = Client::new(api_key);
        Self {
            client,
            webhook_secret,
            currency: currency_from_code(currency),
        }
    }

    /// Creates a hosted checkout session for the given line items. The
    /// metadata is opaque to Stripe and comes back on the webhook.
    pub async fn create_checkout_session(
        &self,
        line_items: &[LineItem],
        metadata: HashMap<String, String>,
        customer_email: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSessionRef> {
        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.success_url = Some(success_url);
        params.cancel_url = Some(cancel_url);
        params.customer_email = Some(customer_email);

        params.line_items = Some(
            line_items
                .iter()
                .map(|item| CreateCheckoutSessionLineItems {
                    price_data: Some(stripe::CreateCheckoutSessionLineItemsPriceData {
                        currency: self.currency,
                        unit_amount: Some(item.unit_amount_cents),
                        product_data: Some(
                            stripe::CreateCheckoutSessionLineItemsPriceDataProductData {
                                name: item.name.clone(),
                                ..Default::default()
                            },
                        ),
                        ..Default::default()
                    }),
                    quantity: Some(item.quantity),
                    ..Default::default()
                })
                .collect(),
        );

        params.metadata = Some(metadata);

        let session = tokio::time::timeout(
            STRIPE_CALL_TIMEOUT,
            CheckoutSession::create(&self.client, params),
        )
        .await
        .map_err(|_| AppError::External("Stripe checkout call timed out".to_string()))?
        .map_err(|e| AppError::External(format!("Stripe error: {}", e)))?;

        let url = session
            .url
            .ok_or_else(|| AppError::External("No checkout URL returned".to_string()))?;

        Ok(CheckoutSessionRef {
            id: session.id.to_string(),
            url,
        })
    }

    /// Verifies the `Stripe-Signature` header over the raw payload (the
    /// library compares HMACs in constant time) and reduces the event to a
    /// `WebhookEvent`. A bad signature is a `BadRequest`; nothing else may
    /// run before this check.
    pub fn parse_webhook(&self, payload: &str, signature: &str) -> Result<WebhookEvent> {
        let event = Webhook::construct_event(payload, signature, &self.webhook_secret).map_err(
            |e| match e {
                WebhookError::BadSignature => {
                    AppError::BadRequest("Invalid signature".to_string())
                }
                _ => AppError::BadRequest(format!("Webhook error: {}", e)),
            },
        )?;

        if event.type_ != EventType::CheckoutSessionCompleted {
            tracing::debug!("Ignoring webhook event type: {:?}", event.type_);
            return Ok(WebhookEvent::Ignored);
        }

        let session = match event.data.object {
            EventObject::CheckoutSession(session) => session,
            other => {
                tracing::warn!("checkout.session.completed carried unexpected object: {:?}", other);
                return Ok(WebhookEvent::Ignored);
            }
        };

        if session.payment_status != CheckoutSessionPaymentStatus::Paid {
            tracing::info!(
                "Session {} completed but payment_status is {:?}; ignoring",
                session.id,
                session.payment_status
            );
            return Ok(WebhookEvent::Ignored);
        }

        let metadata = session.metadata.clone().unwrap_or_default();
        let payment_intent_id = session.payment_intent.as_ref().map(|pi| match pi {
            Expandable::Id(id) => id.to_string(),
            Expandable::Object(obj) => obj.id.to_string(),
        });

        // Absent amounts happen; fulfillment then keeps the total recorded
        // at session creation instead of overwriting it with zero.
        let amount_total_cents = session.amount_total;
        if amount_total_cents.is_none() {
            tracing::warn!("Paid session {} carries no amount_total", session.id);
        }

        Ok(WebhookEvent::CheckoutCompleted(CheckoutCompletion {
            session_id: session.id.to_string(),
            order_id: metadata.get(META_ORDER_ID).and_then(|s| Uuid::parse_str(s).ok()),
            donation_id: metadata.get(META_DONATION_ID).and_then(|s| Uuid::parse_str(s).ok()),
            payment_intent_id,
            amount_total_cents,
            currency: session
                .currency
                .map(|c| c.to_string())
                .unwrap_or_else(|| self.currency.to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_codes_map_case_insensitively() {
        assert_eq!(currency_from_code("eur"), Currency::EUR);
        assert_eq!(currency_from_code("USD"), Currency::USD);
    }

    #[test]
    fn unknown_currency_codes_fall_back_to_eur() {
        assert_eq!(currency_from_code("xyz"), Currency::EUR);
    }
}
