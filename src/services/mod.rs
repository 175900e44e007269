pub mod booking;
pub mod mailer;
pub mod pricing;
pub mod ticket;
