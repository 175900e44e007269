use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Категория места. Цена задаётся на каждый сеанс отдельно.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatType {
    Classic,
    Prime,
    PrimePlus,
    Recliner,
}

impl SeatType {
    pub const ALL: [SeatType; 4] = [
        SeatType::Classic,
        SeatType::Prime,
        SeatType::PrimePlus,
        SeatType::Recliner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatType::Classic => "CLASSIC",
            SeatType::Prime => "PRIME",
            SeatType::PrimePlus => "PRIME_PLUS",
            SeatType::Recliner => "RECLINER",
        }
    }
}

impl fmt::Display for SeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeatType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown seat type: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatPosition {
    Full,
    Left,
    Middle,
    Right,
}

impl SeatPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatPosition::Full => "full",
            SeatPosition::Left => "left",
            SeatPosition::Middle => "middle",
            SeatPosition::Right => "right",
        }
    }
}

impl FromStr for SeatPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(SeatPosition::Full),
            "left" => Ok(SeatPosition::Left),
            "middle" => Ok(SeatPosition::Middle),
            "right" => Ok(SeatPosition::Right),
            other => Err(format!("unknown seat position: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub screen_id: i64,
    pub label: String,
    pub seat_type: SeatType,
    pub position: SeatPosition,
    pub is_active: bool,
}

/// Место на схеме зала конкретного сеанса.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatAvailability {
    pub seat_id: i64,
    pub label: String,
    pub seat_type: SeatType,
    pub position: SeatPosition,
    pub price: Option<rust_decimal::Decimal>,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_type_uses_storage_spelling() {
        assert_eq!("PRIME_PLUS".parse::<SeatType>(), Ok(SeatType::PrimePlus));
        assert_eq!(
            serde_json::to_string(&SeatType::PrimePlus).unwrap(),
            "\"PRIME_PLUS\""
        );
        assert!("prime".parse::<SeatType>().is_err());
    }

    #[test]
    fn position_parses_lowercase() {
        assert_eq!("middle".parse::<SeatPosition>(), Ok(SeatPosition::Middle));
        assert!("center".parse::<SeatPosition>().is_err());
    }
}
