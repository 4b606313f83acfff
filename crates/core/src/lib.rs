#![warn(clippy::all, missing_docs)]

//! Core domain logic for the seatbook terminal booking app.
//!
//! This crate hosts the movie catalog, the seat grid, occupancy
//! bookkeeping, persistence and the booking state machine used by
//! the terminal UI and any future frontends.

pub mod booking;
pub mod catalog;
pub mod config;
pub mod occupancy;
pub mod seat;
pub mod storage;
pub mod view;

pub use booking::{
    reduce, BookingError, BookingEvent, BookingSession, BookingState, Notice, PendingBooking,
    Prompter, Receipt, Transition,
};
pub use catalog::{find_movie, list_movies, Movie, MovieId};
pub use config::AppConfig;
pub use occupancy::OccupancyMap;
pub use seat::{SeatIndex, COLS, ROWS, SEAT_COUNT};
pub use storage::{FileStorage, MemoryStorage, OccupancyStore, Storage, StorageError};
pub use view::{project, BookingView, SeatCell, SeatStatus};
