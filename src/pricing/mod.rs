//! Time-phased ticket pricing.
//!
//! A ticket's price table is a short ordered list of phases (pre-order,
//! optional early-bird, standard event price). The resolver picks the phase
//! whose date window contains "today"; the builder derives the windows and
//! discounted prices from a base price plus discount percentages.

use chrono::{Days, NaiveDate};

use crate::domain::{PhaseKind, PhaseTemplate, PricePhase};
use crate::error::{AppError, Result};

/// Input for rebuilding a ticket's price table.
#[derive(Debug, Clone)]
pub struct PhaseSpec {
    pub base_price_cents: i64,
    pub preorder_percent: f64,
    pub preorder_end: NaiveDate,
    pub early_percent: Option<f64>,
    pub early_end: Option<NaiveDate>,
}

/// Returns the phase whose `[start_at, end_at]` window contains `today`
/// (missing bounds are open). Falls back to the last phase, which is
/// open-ended by construction, so a non-empty table always resolves.
pub fn resolve_active_phase(phases: &[PricePhase], today: NaiveDate) -> Option<&PricePhase> {
    phases
        .iter()
        .find(|p| {
            let after_start = p.start_at.map_or(true, |start| today >= start);
            let before_end = p.end_at.map_or(true, |end| today <= end);
            after_start && before_end
        })
        .or_else(|| phases.last())
}

/// Builds the contiguous phase windows for a ticket.
///
/// The pre-order phase is open from the past and the event phase open into
/// the future; an early-bird phase sits between them when configured.
/// Supplying only one of early percent / early end rejects the whole spec.
pub fn build_phases(spec: &PhaseSpec) -> Result<Vec<PhaseTemplate>> {
    if spec.base_price_cents <= 0 {
        return Err(AppError::Validation("base price must be positive".into()));
    }
    validate_percent(spec.preorder_percent, "pre-order")?;

    let early = match (spec.early_percent, spec.early_end) {
        (Some(percent), Some(end)) => {
            validate_percent(percent, "early-bird")?;
            if end <= spec.preorder_end {
                return Err(AppError::Validation(
                    "early-bird end must come after the pre-order end".into(),
                ));
            }
            Some((percent, end))
        }
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "early-bird discount and end date must be supplied together".into(),
            ));
        }
    };

    let mut phases = vec![PhaseTemplate {
        phase: PhaseKind::Preorder,
        start_at: None,
        end_at: Some(spec.preorder_end),
        price_cents: discounted(spec.base_price_cents, spec.preorder_percent),
        price_note: None,
    }];

    let mut event_start = next_day(spec.preorder_end)?;
    if let Some((percent, end)) = early {
        phases.push(PhaseTemplate {
            phase: PhaseKind::Early,
            start_at: Some(event_start),
            end_at: Some(end),
            price_cents: discounted(spec.base_price_cents, percent),
            price_note: None,
        });
        event_start = next_day(end)?;
    }

    phases.push(PhaseTemplate {
        phase: PhaseKind::Event,
        start_at: Some(event_start),
        end_at: None,
        price_cents: spec.base_price_cents,
        price_note: None,
    });

    Ok(phases)
}

/// Discounted price in whole cents, rounded half away from zero.
fn discounted(base_cents: i64, percent: f64) -> i64 {
    (base_cents as f64 * (1.0 - percent / 100.0)).round() as i64
}

fn validate_percent(percent: f64, label: &str) -> Result<()> {
    if !(percent > 0.0 && percent < 100.0) {
        return Err(AppError::Validation(format!(
            "{} discount must be between 0 and 100 percent",
            label
        )));
    }
    Ok(())
}

fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::Validation("phase end date out of range".into()))
}
