//! Webhook-driven order and donation fulfillment.
//!
//! The flow after signature verification: resolve the referenced record,
//! run the transactional state change (mark paid, assign ticket codes,
//! issue the access code), then perform best-effort side effects (PDFs,
//! confirmation mail). A redelivered webhook finds the record already paid
//! and becomes a no-op; a failed side effect lands in the outbox instead of
//! failing the webhook.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Donation, FulfilledOrder, OutboxKind};
use crate::error::{AppError, Result};
use crate::mail::{
    donation_receipt_email, order_confirmation_email, EmailAttachment, Mailer, OutgoingEmail,
};
use crate::payments::stripe_client::{CheckoutCompletion, WebhookEvent};
use crate::pdf;
use crate::repository::{DonationRepository, OrderRepository, OutboxRepository, PaymentConfirmation};

const MAIL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    /// Event type or payment status we do not act on.
    Ignored,
    /// Duplicate delivery (or a second session paying an already-paid
    /// record); acknowledged without side effects.
    AlreadyPaid,
    OrderFulfilled { codes_issued: usize },
    DonationFulfilled,
}

pub struct FulfillmentService {
    orders: Arc<dyn OrderRepository>,
    donations: Arc<dyn DonationRepository>,
    outbox: Arc<dyn OutboxRepository>,
    mailer: Arc<dyn Mailer>,
    festival_name: String,
    tax_notice: String,
}

impl FulfillmentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        donations: Arc<dyn DonationRepository>,
        outbox: Arc<dyn OutboxRepository>,
        mailer: Arc<dyn Mailer>,
        festival_name: String,
        tax_notice: String,
    ) -> Self {
        Self {
            orders,
            donations,
            outbox,
            mailer,
            festival_name,
            tax_notice,
        }
    }

    pub async fn process(&self, event: WebhookEvent) -> Result<FulfillmentOutcome> {
        match event {
            WebhookEvent::Ignored => Ok(FulfillmentOutcome::Ignored),
            WebhookEvent::CheckoutCompleted(completion) => {
                if let Some(order_id) = completion.order_id {
                    self.fulfill_order(order_id, &completion).await
                } else if let Some(donation_id) = completion.donation_id {
                    self.fulfill_donation(donation_id, &completion).await
                } else {
                    tracing::warn!(
                        "Completed session {} carries no order or donation reference",
                        completion.session_id
                    );
                    Ok(FulfillmentOutcome::Ignored)
                }
            }
        }
    }

    pub async fn fulfill_order(
        &self,
        order_id: uuid::Uuid,
        completion: &CheckoutCompletion,
    ) -> Result<FulfillmentOutcome> {
        let fulfilled = self
            .orders
            .fulfill(order_id, confirmation(completion))
            .await?;

        let Some(fulfilled) = fulfilled else {
            // Already paid. Either Stripe redelivered the event, or a second
            // session paid the same order; the session id pair lets support
            // sort out a refund in the latter case.
            tracing::warn!(
                "Order {} already paid; ignoring completed session {}",
                order_id,
                completion.session_id
            );
            return Ok(FulfillmentOutcome::AlreadyPaid);
        };

        let codes_issued = fulfilled.attendees.len()
            + usize::from(fulfilled.access_code.is_some());
        tracing::info!(
            "Order {} fulfilled: {} attendees, online access: {}",
            order_id,
            fulfilled.attendees.len(),
            fulfilled.access_code.is_some()
        );

        if let Err(e) = self.send_order_confirmation(&fulfilled).await {
            tracing::error!("Confirmation mail for order {} failed: {}", order_id, e);
            self.outbox
                .record_failure(
                    OutboxKind::OrderConfirmation,
                    order_id,
                    &fulfilled.order.customer_email,
                    &e.to_string(),
                )
                .await?;
        } else {
            self.orders.mark_pdfs_sent(order_id).await?;
        }

        Ok(FulfillmentOutcome::OrderFulfilled { codes_issued })
    }

    pub async fn fulfill_donation(
        &self,
        donation_id: uuid::Uuid,
        completion: &CheckoutCompletion,
    ) -> Result<FulfillmentOutcome> {
        let donation = self
            .donations
            .mark_paid(donation_id, confirmation(completion))
            .await?;

        let Some(donation) = donation else {
            tracing::warn!(
                "Donation {} already paid; ignoring completed session {}",
                donation_id,
                completion.session_id
            );
            return Ok(FulfillmentOutcome::AlreadyPaid);
        };

        tracing::info!("Donation {} settled", donation_id);

        if let Err(e) = self.send_donation_receipt(&donation).await {
            tracing::error!("Receipt mail for donation {} failed: {}", donation_id, e);
            self.outbox
                .record_failure(
                    OutboxKind::DonationReceipt,
                    donation_id,
                    &donation.donor_email,
                    &e.to_string(),
                )
                .await?;
        }

        Ok(FulfillmentOutcome::DonationFulfilled)
    }

    async fn send_order_confirmation(&self, fulfilled: &FulfilledOrder) -> Result<()> {
        let mut attachments = Vec::with_capacity(fulfilled.attendees.len());
        for attendee in &fulfilled.attendees {
            let bytes = pdf::ticket_pdf(&self.festival_name, &fulfilled.order, attendee)?;
            attachments.push(EmailAttachment {
                filename: format!(
                    "ticket-{}.pdf",
                    attendee.ticket_code.as_deref().unwrap_or("attendee")
                ),
                bytes,
            });
        }

        let (subject, html) = order_confirmation_email(
            &self.festival_name,
            &fulfilled.order,
            &fulfilled.attendees,
            fulfilled.access_code.as_ref(),
        );

        self.send_with_timeout(OutgoingEmail {
            to: fulfilled.order.customer_email.clone(),
            subject,
            html,
            attachments,
        })
        .await
    }

    async fn send_donation_receipt(&self, donation: &Donation) -> Result<()> {
        let bytes = pdf::donation_receipt_pdf(&self.festival_name, &self.tax_notice, donation)?;
        let (subject, html) = donation_receipt_email(&self.festival_name, donation);

        self.send_with_timeout(OutgoingEmail {
            to: donation.donor_email.clone(),
            subject,
            html,
            attachments: vec![EmailAttachment {
                filename: format!("receipt-{}.pdf", donation.id),
                bytes,
            }],
        })
        .await
    }

    async fn send_with_timeout(&self, email: OutgoingEmail) -> Result<()> {
        tokio::time::timeout(MAIL_TIMEOUT, self.mailer.send(email))
            .await
            .map_err(|_| AppError::External("mail send timed out".to_string()))?
    }
}

fn confirmation(completion: &CheckoutCompletion) -> PaymentConfirmation {
    PaymentConfirmation {
        payment_intent_id: completion.payment_intent_id.clone(),
        amount_total_cents: completion.amount_total_cents,
        currency: completion.currency.clone(),
    }
}
