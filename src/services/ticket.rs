use base64::{engine::general_purpose, Engine as _};
use qrcode::{render::svg, QrCode};
use rand::Rng;

use crate::error::AppError;

/// Значение QR до того, как станет известен id брони.
pub const QR_PLACEHOLDER: &str = "PENDING";

/// 6-значный код транзакции, который показывается пользователю и кладётся в QR.
pub fn generate_transaction_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// QR билета: ссылка на проверку и её картинка.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedTicket {
    pub payload: String,
    pub image: String,
}

#[derive(Debug, Clone)]
pub struct TicketIssuer {
    base_url: String,
}

impl TicketIssuer {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn verification_url(&self, booking_id: i64, user_id: i64, transaction_code: &str) -> String {
        format!(
            "{}/api/booking/verify?booking_id={}&user_id={}&code={}",
            self.base_url, booking_id, user_id, transaction_code
        )
    }

    pub fn issue(&self, booking_id: i64, user_id: i64, transaction_code: &str) -> Result<IssuedTicket, AppError> {
        let payload = self.verification_url(booking_id, user_id, transaction_code);
        let image = qr_data_url(&payload)?;
        Ok(IssuedTicket { payload, image })
    }
}

/// SVG с QR-кодом в виде data URL, чтобы фронт мог вставить его в `<img>`.
pub fn qr_data_url(payload: &str) -> Result<String, AppError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encoding failed: {}", e)))?;
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(200, 200)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        general_purpose::STANDARD.encode(image)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_code_is_six_digits() {
        for _ in 0..200 {
            let code = generate_transaction_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn verification_url_embeds_booking_user_and_code() {
        let issuer = TicketIssuer::new("https://tickets.example.com/");
        assert_eq!(
            issuer.verification_url(42, 7, "123456"),
            "https://tickets.example.com/api/booking/verify?booking_id=42&user_id=7&code=123456"
        );
    }

    #[test]
    fn issued_ticket_carries_svg_image() {
        let ticket = TicketIssuer::new("http://localhost:8000").issue(1, 2, "654321").unwrap();
        assert!(ticket.payload.ends_with("code=654321"));
        let encoded = ticket.image.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = general_purpose::STANDARD.decode(encoded).unwrap();
        assert!(String::from_utf8(svg).unwrap().contains("<svg"));
    }
}
