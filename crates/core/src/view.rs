//! Pure projection of [`BookingState`] into what a frontend draws.

use crate::{
    booking::BookingState,
    catalog::{format_price, list_movies, Movie, MovieId},
    seat::{SeatIndex, COLS},
};

/// Visual state of a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatStatus {
    /// Free to select.
    Available,
    /// Chosen in this session, not booked yet.
    Selected,
    /// Already booked for the current movie.
    Occupied,
}

impl SeatStatus {
    /// Every status in legend order.
    pub const ALL: [SeatStatus; 3] = [
        SeatStatus::Available,
        SeatStatus::Selected,
        SeatStatus::Occupied,
    ];

    /// Legend label.
    pub fn label(self) -> &'static str {
        match self {
            SeatStatus::Available => "Available",
            SeatStatus::Selected => "Selected",
            SeatStatus::Occupied => "Occupied",
        }
    }
}

/// One cell of the seat grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatCell {
    /// Position in the grid.
    pub seat: SeatIndex,
    /// What to draw.
    pub status: SeatStatus,
    /// Whether clicking the cell toggles the seat.
    pub clickable: bool,
}

/// Entry of the movie selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieOption {
    /// Movie to switch to.
    pub id: MovieId,
    /// `title (price)` label.
    pub label: String,
    /// Whether this is the current movie.
    pub selected: bool,
}

/// Summary line under the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Current movie title.
    pub title: &'static str,
    /// Number of selected seats.
    pub seat_count: usize,
    /// Formatted total price.
    pub total: String,
}

impl Summary {
    /// Single-line rendering.
    pub fn text(&self) -> String {
        format!(
            "Movie: {} | {} seat{} | Total: {}",
            self.title,
            self.seat_count,
            if self.seat_count == 1 { "" } else { "s" },
            self.total
        )
    }
}

/// Everything a frontend needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingView {
    /// Current movie.
    pub movie: &'static Movie,
    /// Movie selector entries in catalog order.
    pub options: Vec<MovieOption>,
    /// Legend entries.
    pub legend: [SeatStatus; 3],
    /// All seats in row-major order.
    pub seats: Vec<SeatCell>,
    /// Summary line contents.
    pub summary: Summary,
}

impl BookingView {
    /// Seats grouped into grid rows.
    pub fn rows(&self) -> impl Iterator<Item = &[SeatCell]> {
        self.seats.chunks(COLS)
    }
}

/// Project `state` into a [`BookingView`].
pub fn project(state: &BookingState, currency: &str) -> BookingView {
    let movie = state.selected_movie();
    let options = list_movies()
        .iter()
        .map(|entry| MovieOption {
            id: entry.id,
            label: entry.option_label(currency),
            selected: entry.id == movie.id,
        })
        .collect();
    let seats = SeatIndex::all()
        .map(|seat| {
            let status = if state.is_occupied(seat) {
                SeatStatus::Occupied
            } else if state.is_selected(seat) {
                SeatStatus::Selected
            } else {
                SeatStatus::Available
            };
            SeatCell {
                seat,
                status,
                clickable: status != SeatStatus::Occupied,
            }
        })
        .collect();
    BookingView {
        movie,
        options,
        legend: SeatStatus::ALL,
        seats,
        summary: Summary {
            title: movie.title,
            seat_count: state.selected_seats().len(),
            total: format_price(state.total_price(), currency),
        },
    }
}
