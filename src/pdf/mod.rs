//! PDF generation for tickets and donation receipts.
//!
//! Tickets embed the attendee's code both as text and as a QR matrix drawn
//! from filled rects, so door scanners and humans can both read it. Built-in
//! Helvetica keeps the binary independent of system fonts.

use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};
use qrcode::QrCode;

use crate::domain::{Attendee, Donation, Locale, TicketOrder};
use crate::error::{AppError, Result};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;

/// One ticket PDF per attendee; the QR payload is the bare ticket code.
pub fn ticket_pdf(festival_name: &str, order: &TicketOrder, attendee: &Attendee) -> Result<Vec<u8>> {
    let code = attendee
        .ticket_code
        .as_deref()
        .ok_or_else(|| AppError::Internal("attendee has no ticket code".to_string()))?;

    let (doc, page, layer) = PdfDocument::new(
        format!("{} Ticket", festival_name),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "ticket",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let font = builtin(&doc, BuiltinFont::Helvetica)?;
    let font_bold = builtin(&doc, BuiltinFont::HelveticaBold)?;

    layer.use_text(festival_name, 24.0, Mm(20.0), Mm(265.0), &font_bold);
    layer.use_text(
        match order.locale {
            Locale::De => "Kinoticket",
            Locale::En => "Cinema ticket",
            Locale::Ku => "Bilêta sînemayê",
        },
        14.0,
        Mm(20.0),
        Mm(252.0),
        &font,
    );

    layer.use_text(
        format!("{} {}", attendee.first_name, attendee.last_name),
        18.0,
        Mm(20.0),
        Mm(232.0),
        &font_bold,
    );
    layer.use_text(format!("Order {}", order.id), 10.0, Mm(20.0), Mm(224.0), &font);

    draw_qr(&layer, code, Mm(20.0), Mm(130.0), Mm(70.0))?;
    layer.use_text(code, 16.0, Mm(20.0), Mm(120.0), &font_bold);

    doc.save_to_bytes()
        .map_err(|e| AppError::Internal(format!("PDF generation failed: {}", e)))
}

/// Donation tax receipt with donor, amount and the configured exemption
/// notice.
pub fn donation_receipt_pdf(
    festival_name: &str,
    tax_notice: &str,
    donation: &Donation,
) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        format!("{} Donation Receipt", festival_name),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "receipt",
    );
    let layer = doc.get_page(page).get_layer(layer);
    let font = builtin(&doc, BuiltinFont::Helvetica)?;
    let font_bold = builtin(&doc, BuiltinFont::HelveticaBold)?;

    layer.use_text(festival_name, 24.0, Mm(20.0), Mm(265.0), &font_bold);
    layer.use_text(
        match donation.locale {
            Locale::De => "Spendenbescheinigung",
            Locale::En => "Donation receipt",
            Locale::Ku => "Belgeya bexşê",
        },
        16.0,
        Mm(20.0),
        Mm(250.0),
        &font,
    );

    layer.use_text(&donation.donor_name, 14.0, Mm(20.0), Mm(228.0), &font_bold);
    if let Some(address) = &donation.donor_address {
        layer.use_text(address, 11.0, Mm(20.0), Mm(221.0), &font);
    }

    layer.use_text(
        format_amount(donation.amount_total_cents, &donation.currency),
        20.0,
        Mm(20.0),
        Mm(200.0),
        &font_bold,
    );
    layer.use_text(
        format!("Receipt no. {}", donation.id),
        10.0,
        Mm(20.0),
        Mm(190.0),
        &font,
    );
    layer.use_text(
        donation.created_at.format("%Y-%m-%d").to_string(),
        10.0,
        Mm(20.0),
        Mm(184.0),
        &font,
    );

    layer.use_text(tax_notice, 10.0, Mm(20.0), Mm(160.0), &font);

    doc.save_to_bytes()
        .map_err(|e| AppError::Internal(format!("PDF generation failed: {}", e)))
}

pub fn format_amount(cents: i64, currency: &str) -> String {
    format!("{}.{:02} {}", cents / 100, (cents % 100).abs(), currency.to_uppercase())
}

fn builtin(doc: &printpdf::PdfDocumentReference, font: BuiltinFont) -> Result<IndirectFontRef> {
    doc.add_builtin_font(font)
        .map_err(|e| AppError::Internal(format!("PDF font error: {}", e)))
}

/// Draws the QR matrix as filled black rects; `size` is the full edge
/// length, `x`/`y` the lower-left corner.
fn draw_qr(layer: &PdfLayerReference, payload: &str, x: Mm, y: Mm, size: Mm) -> Result<()> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encoding failed: {}", e)))?;
    let width = code.width();
    let module = size.0 / width as f32;

    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    for (idx, color) in code.to_colors().into_iter().enumerate() {
        if color != qrcode::Color::Dark {
            continue;
        }
        let col = (idx % width) as f32;
        // QR rows count from the top, PDF coordinates from the bottom.
        let row = (width - 1 - idx / width) as f32;
        let rect = Rect::new(
            Mm(x.0 + col * module),
            Mm(y.0 + row * module),
            Mm(x.0 + (col + 1.0) * module),
            Mm(y.0 + (row + 1.0) * module),
        )
        .with_mode(PaintMode::Fill);
        layer.add_rect(rect);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderStatus, TicketType};
    use chrono::Utc;
    use uuid::Uuid;

    fn paid_order() -> TicketOrder {
        TicketOrder {
            id: Uuid::new_v4(),
            ticket_type: TicketType::Kino,
            status: OrderStatus::Paid,
            customer_name: "Dara Miran".to_string(),
            customer_email: "dara@example.org".to_string(),
            kino_quantity: 1,
            amount_total_cents: 900,
            currency: "eur".to_string(),
            locale: Locale::De,
            stripe_session_id: Some("cs_test_1".to_string()),
            stripe_payment_intent_id: Some("pi_test_1".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ticket_pdf_produces_a_pdf() {
        let order = paid_order();
        let attendee = Attendee {
            id: Uuid::new_v4(),
            order_id: order.id,
            first_name: "Dara".to_string(),
            last_name: "Miran".to_string(),
            ticket_code: Some("FK-AB2C-3DEF".to_string()),
            pdf_sent: false,
        };
        let bytes = ticket_pdf("Mitos Film Festival", &order, &attendee).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn ticket_pdf_requires_a_code() {
        let order = paid_order();
        let attendee = Attendee {
            id: Uuid::new_v4(),
            order_id: order.id,
            first_name: "Dara".to_string(),
            last_name: "Miran".to_string(),
            ticket_code: None,
            pdf_sent: false,
        };
        assert!(ticket_pdf("Mitos Film Festival", &order, &attendee).is_err());
    }

    #[test]
    fn receipt_pdf_produces_a_pdf() {
        let donation = Donation {
            id: Uuid::new_v4(),
            donor_name: "Rojda Baran".to_string(),
            donor_email: "rojda@example.org".to_string(),
            donor_address: Some("Beispielstr. 1, 10115 Berlin".to_string()),
            amount_total_cents: 5000,
            currency: "eur".to_string(),
            status: OrderStatus::Paid,
            locale: Locale::De,
            stripe_session_id: None,
            stripe_payment_intent_id: None,
            created_at: Utc::now(),
        };
        let bytes = donation_receipt_pdf("Mitos Film Festival", "Tax notice.", &donation).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn amounts_format_with_two_decimals() {
        assert_eq!(format_amount(1500, "eur"), "15.00 EUR");
        assert_eq!(format_amount(905, "eur"), "9.05 EUR");
    }
}
