pub mod booking;
pub mod seat;
pub mod showtime;

pub use booking::{BookedSeat, BookingDetails, BookingStatus, NewBooking, OrderSummary, ShowtimeSlot};
pub use seat::{Seat, SeatAvailability, SeatPosition, SeatType};
pub use showtime::{CinemaScope, NewShowtime, Showtime, ShowtimeStatus};
