//! Отправка писем о брони.
//!
//! `SmtpMailer` работает через lettre, `LogMailer` только пишет письмо в лог
//! (используется, когда SMTP не настроен или почта выключена флагом).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::info;

use crate::config::MailConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("failed to build email: {0}")]
    Build(String),
    #[error("SMTP error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Данные для письма-подтверждения.
#[derive(Debug, Clone)]
pub struct ConfirmationMail<'a> {
    pub booking_id: i64,
    pub movie_title: &'a str,
    pub starts_at: DateTime<Utc>,
    pub seat_labels: Vec<&'a str>,
    pub final_amount: Decimal,
    pub transaction_code: &'a str,
    pub qr_image: &'a str,
}

pub fn booking_confirmation(to: &str, mail: &ConfirmationMail<'_>) -> MailMessage {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
    <h2>Booking confirmed</h2>
    <p>Booking #{booking_id} for <strong>{title}</strong> on {when}.</p>
    <p>Seats: {seats}</p>
    <p>Amount paid: {amount}</p>
    <p>Transaction code: <strong>{code}</strong></p>
    <p><img src="{qr}" alt="Ticket QR code" width="200" height="200"></p>
</body>
</html>"#,
        booking_id = mail.booking_id,
        title = mail.movie_title,
        when = mail.starts_at.format("%Y-%m-%d %H:%M UTC"),
        seats = mail.seat_labels.join(", "),
        amount = mail.final_amount,
        code = mail.transaction_code,
        qr = mail.qr_image,
    );

    MailMessage {
        to: to.to_string(),
        subject: format!("Your tickets for {}", mail.movie_title),
        html,
    }
}

pub fn booking_cancellation(
    to: &str,
    booking_id: i64,
    movie_title: &str,
    starts_at: DateTime<Utc>,
) -> MailMessage {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
    <h2>Booking cancelled</h2>
    <p>Booking #{} for <strong>{}</strong> on {} has been cancelled.</p>
</body>
</html>"#,
        booking_id,
        movie_title,
        starts_at.format("%Y-%m-%d %H:%M UTC"),
    );

    MailMessage {
        to: to.to_string(),
        subject: format!("Booking #{} cancelled", booking_id),
        html,
    }
}

/// Верхняя граница на одно SMTP-соединение вместо 60 секунд по умолчанию в lettre.
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    credentials: Credentials,
    from: String,
}

impl SmtpMailer {
    pub fn new(host: String, config: &MailConfig) -> Self {
        Self {
            host,
            port: config.smtp_port,
            credentials: Credentials::new(config.smtp_username.clone(), config.smtp_password.clone()),
            from: format!("{} <{}>", config.from_name, config.from_email),
        }
    }

    fn build_transport(&self) -> Result<SmtpTransport, MailError> {
        Ok(SmtpTransport::relay(&self.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(self.port)
            .credentials(self.credentials.clone())
            .timeout(Some(SMTP_TIMEOUT))
            .build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from.parse().map_err(|e| MailError::Address(format!("{}", e)))?)
            .to(message.to.parse().map_err(|e| MailError::Address(format!("{}", e)))?)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html)
            .map_err(|e| MailError::Build(e.to_string()))?;

        let mailer = self.build_transport()?;

        // lettre SmtpTransport блокирующий
        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| MailError::Transport(e.to_string()))
        })
        .await
        .map_err(|e| MailError::Transport(format!("mail task failed: {}", e)))?
        .map(|_| ())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        info!("mail to {}: {}", message.to, message.subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn confirmation_lists_seats_and_code() {
        let starts_at = Utc.with_ymd_and_hms(2026, 11, 2, 19, 30, 0).unwrap();
        let msg = booking_confirmation(
            "viewer@example.com",
            &ConfirmationMail {
                booking_id: 9,
                movie_title: "Arrival",
                starts_at,
                seat_labels: vec!["A1", "A2"],
                final_amount: Decimal::new(3500, 2),
                transaction_code: "481516",
                qr_image: "data:image/svg+xml;base64,AAAA",
            },
        );
        assert_eq!(msg.to, "viewer@example.com");
        assert_eq!(msg.subject, "Your tickets for Arrival");
        assert!(msg.html.contains("Seats: A1, A2"));
        assert!(msg.html.contains("481516"));
        assert!(msg.html.contains("35.00"));
        assert!(msg.html.contains("2026-11-02 19:30 UTC"));
    }

    #[tokio::test]
    async fn log_mailer_never_fails() {
        let msg = booking_cancellation("viewer@example.com", 3, "Arrival", Utc::now());
        assert!(LogMailer.send(msg).await.is_ok());
    }
}
