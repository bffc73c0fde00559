use std::collections::HashMap;

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    api::{handlers::checkout::require_stripe, state::AppState},
    domain::{Locale, NewDonation},
    error::Result,
    payments::stripe_client::{META_DONATION_ID, META_LOCALE},
    payments::LineItem,
};

#[derive(Deserialize, Validate)]
pub struct DonationRequest {
    #[validate(length(min = 1, max = 200))]
    pub donor_name: String,
    #[validate(email)]
    pub donor_email: String,
    pub donor_address: Option<String>,
    #[validate(range(min = 100, max = 1_000_000))]
    pub amount_cents: i64,
    #[serde(default)]
    pub locale: Locale,
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<DonationRequest>,
) -> Result<Json<Value>> {
    req.validate()?;
    let stripe = require_stripe(&state)?;

    let donation = state
        .donations
        .create(
            NewDonation {
                donor_name: req.donor_name,
                donor_email: req.donor_email,
                donor_address: req.donor_address,
                amount_total_cents: req.amount_cents,
                locale: req.locale,
            },
            &state.settings.festival.currency,
        )
        .await?;

    let line_items = [LineItem {
        name: match donation.locale {
            Locale::De => format!("Spende – {}", state.settings.festival.name),
            Locale::En => format!("Donation – {}", state.settings.festival.name),
            Locale::Ku => format!("Bexş – {}", state.settings.festival.name),
        },
        unit_amount_cents: donation.amount_total_cents,
        quantity: 1,
    }];

    let mut metadata = HashMap::new();
    metadata.insert(META_DONATION_ID.to_string(), donation.id.to_string());
    metadata.insert(META_LOCALE.to_string(), donation.locale.as_str().to_string());

    let base_url = &state.settings.server.base_url;
    let session = stripe
        .create_checkout_session(
            &line_items,
            metadata,
            &donation.donor_email,
            &format!("{}/donate/thanks", base_url),
            &format!("{}/donate", base_url),
        )
        .await?;

    state
        .donations
        .set_stripe_session(donation.id, &session.id)
        .await?;

    Ok(Json(json!({ "url": session.url })))
}
