//! Расчёт стоимости брони по ценам категорий мест конкретного сеанса.
//!
//! Чистые функции, без доступа к БД.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::models::{BookedSeat, SeatType};

pub type PriceTable = BTreeMap<SeatType, Decimal>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no price configured for seat type {0}")]
pub struct MissingPrice(pub SeatType);

/// Место, которое нужно оценить.
#[derive(Debug, Clone)]
pub struct SeatToPrice {
    pub seat_id: i64,
    pub label: String,
    pub seat_type: SeatType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub seats: Vec<BookedSeat>,
    pub total: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
}

/// Сумма = цена категории каждого места. Скидок пока нет, discount всегда 0.
pub fn quote(seats: &[SeatToPrice], prices: &PriceTable) -> Result<PriceQuote, MissingPrice> {
    let priced = seats
        .iter()
        .map(|seat| {
            let price = prices
                .get(&seat.seat_type)
                .copied()
                .ok_or(MissingPrice(seat.seat_type))?;
            Ok(BookedSeat {
                seat_id: seat.seat_id,
                label: seat.label.clone(),
                seat_type: seat.seat_type,
                price,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total: Decimal = priced.iter().map(|s| s.price).sum();
    let discount = Decimal::ZERO;

    Ok(PriceQuote {
        seats: priced,
        total,
        discount,
        final_amount: total - discount,
    })
}

/// Цены сеанса: хотя бы одна категория, все цены положительные.
pub fn validate_price_table(prices: &PriceTable) -> Result<(), String> {
    if prices.is_empty() {
        return Err("at least one seat type price is required".to_string());
    }
    if let Some((seat_type, _)) = prices.iter().find(|(_, p)| **p <= Decimal::ZERO) {
        return Err(format!("price for {} must be greater than zero", seat_type));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn seat(id: i64, seat_type: SeatType) -> SeatToPrice {
        SeatToPrice { seat_id: id, label: format!("A{}", id), seat_type }
    }

    #[test]
    fn two_classic_and_one_prime() {
        let prices = PriceTable::from([(SeatType::Classic, dec!(10)), (SeatType::Prime, dec!(15))]);
        let seats = [
            seat(1, SeatType::Classic),
            seat(2, SeatType::Classic),
            seat(3, SeatType::Prime),
        ];

        let q = quote(&seats, &prices).unwrap();
        assert_eq!(q.total, dec!(35));
        assert_eq!(q.discount, dec!(0));
        assert_eq!(q.final_amount, dec!(35));
        assert_eq!(q.seats[2].price, dec!(15));
    }

    #[test]
    fn missing_price_names_the_seat_type() {
        let prices = PriceTable::from([(SeatType::Classic, dec!(10))]);
        let err = quote(&[seat(1, SeatType::Classic), seat(2, SeatType::Recliner)], &prices)
            .unwrap_err();
        assert_eq!(err, MissingPrice(SeatType::Recliner));
        assert_eq!(err.to_string(), "no price configured for seat type RECLINER");
    }

    #[test]
    fn price_table_rejects_empty_and_non_positive() {
        assert!(validate_price_table(&PriceTable::new()).is_err());
        let zero = PriceTable::from([(SeatType::Prime, dec!(0))]);
        assert_eq!(
            validate_price_table(&zero).unwrap_err(),
            "price for PRIME must be greater than zero"
        );
        let ok = PriceTable::from([(SeatType::Prime, dec!(12.50))]);
        assert!(validate_price_table(&ok).is_ok());
    }

    proptest! {
        #[test]
        fn total_is_sum_of_seat_type_prices(
            cents in proptest::collection::vec(1i64..100_000, 4),
            picks in proptest::collection::vec(0usize..4, 1..40),
        ) {
            let prices: PriceTable = SeatType::ALL
                .iter()
                .zip(&cents)
                .map(|(t, c)| (*t, Decimal::new(*c, 2)))
                .collect();
            let seats: Vec<SeatToPrice> = picks
                .iter()
                .enumerate()
                .map(|(i, p)| seat(i as i64, SeatType::ALL[*p]))
                .collect();

            let expected: Decimal = picks.iter().map(|p| Decimal::new(cents[*p], 2)).sum();
            let q = quote(&seats, &prices).unwrap();
            prop_assert_eq!(q.total, expected);
            prop_assert_eq!(q.final_amount, q.total - q.discount);
            prop_assert_eq!(q.seats.len(), seats.len());
        }
    }
}
