//! Outbound email.
//!
//! `Mailer` is the seam between fulfillment and SMTP: production wires up
//! the lettre transport, tests use [`RecordingMailer`]. Templates are tiny
//! HTML bodies in the order's locale; PDFs travel as attachments.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::domain::{Attendee, Donation, Locale, OnlineAccessCode, TicketOrder};
use crate::error::{AppError, Result};
use crate::pdf::format_amount;

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<EmailAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| AppError::Internal("SMTP enabled but no host configured".to_string()))?;
        let from = config
            .from_address
            .as_deref()
            .ok_or_else(|| AppError::Internal("SMTP enabled but no from address".to_string()))?
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP from address: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| AppError::Internal(format!("SMTP relay setup failed: {}", e)))?;
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::Validation(format!("Invalid recipient address: {}", e)))?;

        let mut multipart = MultiPart::mixed().singlepart(SinglePart::html(email.html));
        for attachment in email.attachments {
            let content_type = ContentType::parse("application/pdf")
                .map_err(|e| AppError::Internal(format!("Bad content type: {}", e)))?;
            multipart = multipart
                .singlepart(Attachment::new(attachment.filename).body(attachment.bytes, content_type));
        }

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(multipart)
            .map_err(|e| AppError::Internal(format!("Email build failed: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::External(format!("SMTP send failed: {}", e)))?;

        Ok(())
    }
}

/// Drops mail on the floor with a log line. Used when SMTP is disabled so
/// local development never needs a mail server.
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        tracing::info!(
            "SMTP disabled; dropping email to {} ({} attachments): {}",
            email.to,
            email.attachments.len(),
            email.subject
        );
        Ok(())
    }
}

/// Test double that records sent mail in memory.
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        if self.fail {
            return Err(AppError::External("simulated SMTP outage".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub fn order_confirmation_email(
    festival_name: &str,
    order: &TicketOrder,
    attendees: &[Attendee],
    access_code: Option<&OnlineAccessCode>,
) -> (String, String) {
    let subject = match order.locale {
        Locale::De => format!("{} – Deine Tickets", festival_name),
        Locale::En => format!("{} – Your tickets", festival_name),
        Locale::Ku => format!("{} – Bilêtên te", festival_name),
    };

    let greeting = match order.locale {
        Locale::De => format!("Hallo {},", order.customer_name),
        Locale::En => format!("Hello {},", order.customer_name),
        Locale::Ku => format!("Silav {},", order.customer_name),
    };
    let thanks = match order.locale {
        Locale::De => "vielen Dank für deine Bestellung. Deine Tickets findest du im Anhang.",
        Locale::En => "thank you for your order. Your tickets are attached.",
        Locale::Ku => "spas ji bo fermana te. Bilêtên te pêvek in.",
    };

    let mut html = format!("<p>{}</p><p>{}</p>", greeting, thanks);
    if !attendees.is_empty() {
        html.push_str("<ul>");
        for attendee in attendees {
            html.push_str(&format!(
                "<li>{} {} – <strong>{}</strong></li>",
                attendee.first_name,
                attendee.last_name,
                attendee.ticket_code.as_deref().unwrap_or("-")
            ));
        }
        html.push_str("</ul>");
    }
    if let Some(code) = access_code {
        let label = match order.locale {
            Locale::De => "Dein Online-Zugangscode",
            Locale::En => "Your online access code",
            Locale::Ku => "Koda te ya gihîştina online",
        };
        html.push_str(&format!("<p>{}: <strong>{}</strong></p>", label, code.code));
    }

    (subject, html)
}

pub fn donation_receipt_email(festival_name: &str, donation: &Donation) -> (String, String) {
    let subject = match donation.locale {
        Locale::De => format!("{} – Spendenbescheinigung", festival_name),
        Locale::En => format!("{} – Donation receipt", festival_name),
        Locale::Ku => format!("{} – Belgeya bexşê", festival_name),
    };

    let body = match donation.locale {
        Locale::De => format!(
            "<p>Liebe/r {},</p><p>herzlichen Dank für deine Spende über {}. \
             Die Spendenbescheinigung findest du im Anhang.</p>",
            donation.donor_name,
            format_amount(donation.amount_total_cents, &donation.currency)
        ),
        Locale::En => format!(
            "<p>Dear {},</p><p>thank you for your donation of {}. \
             Your receipt is attached.</p>",
            donation.donor_name,
            format_amount(donation.amount_total_cents, &donation.currency)
        ),
        Locale::Ku => format!(
            "<p>{} hêja,</p><p>spas ji bo bexşa te ya {}. Belge pêvek e.</p>",
            donation.donor_name,
            format_amount(donation.amount_total_cents, &donation.currency)
        ),
    };

    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderStatus, TicketType};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn confirmation_email_lists_codes_in_order_locale() {
        let order = TicketOrder {
            id: Uuid::new_v4(),
            ticket_type: TicketType::Combo,
            status: OrderStatus::Paid,
            customer_name: "Rojda".to_string(),
            customer_email: "rojda@example.org".to_string(),
            kino_quantity: 1,
            amount_total_cents: 3000,
            currency: "eur".to_string(),
            locale: Locale::En,
            stripe_session_id: None,
            stripe_payment_intent_id: None,
            created_at: Utc::now(),
        };
        let attendees = vec![Attendee {
            id: Uuid::new_v4(),
            order_id: order.id,
            first_name: "Rojda".to_string(),
            last_name: "Baran".to_string(),
            ticket_code: Some("FK-AB2C-3DEF".to_string()),
            pdf_sent: false,
        }];
        let code = OnlineAccessCode {
            id: Uuid::new_v4(),
            order_id: Some(order.id),
            code: "ON-XY2Z-W3VU".to_string(),
            email: order.customer_email.clone(),
            redeemed_at: None,
            redeemed_by_user_id: None,
            created_at: Utc::now(),
        };

        let (subject, html) = order_confirmation_email("Mitos Film Festival", &order, &attendees, Some(&code));
        assert!(subject.contains("Your tickets"));
        assert!(html.contains("FK-AB2C-3DEF"));
        assert!(html.contains("ON-XY2Z-W3VU"));
    }
}
