//! Booking state machine and the handlers driving it.
//!
//! State transitions are pure: [`reduce`] maps the current
//! [`BookingState`] and a [`BookingEvent`] to the next state. The
//! [`BookingSession`] wraps that reducer with persistence and the
//! confirmation/notification capabilities supplied by a frontend.
//!
//! Booking is two-phase. [`BookingState::prepare_booking`] snapshots the
//! selection into a [`PendingBooking`] that the user is asked to confirm;
//! committing it is a single transition that either applies fully or, when
//! the selection changed in the meantime, not at all.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
    catalog::{default_movie, find_movie, format_price, Movie, MovieId},
    occupancy::OccupancyMap,
    seat::SeatIndex,
    storage::{OccupancyStore, Storage, StorageError},
};

/// Errors surfaced by booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Confirmation was requested with no seats selected.
    #[error("select at least one seat")]
    EmptySelection,
    /// The pending booking no longer matches the current selection.
    #[error("the selection changed since the booking was prepared")]
    StaleBooking,
    /// The committed bookings could not be persisted.
    #[error("failed to save bookings")]
    Storage(#[from] StorageError),
}

/// Complete in-memory state of the booking screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingState {
    selected_movie: MovieId,
    selected_seats: BTreeSet<SeatIndex>,
    occupancy: OccupancyMap,
}

impl Default for BookingState {
    fn default() -> Self {
        Self::new(OccupancyMap::new())
    }
}

impl BookingState {
    /// Fresh state on the first catalog movie with nothing selected.
    pub fn new(occupancy: OccupancyMap) -> Self {
        Self {
            selected_movie: default_movie().id,
            selected_seats: BTreeSet::new(),
            occupancy,
        }
    }

    /// The movie currently shown.
    pub fn selected_movie(&self) -> &'static Movie {
        find_movie(self.selected_movie).unwrap_or_else(default_movie)
    }

    /// Seats chosen but not yet booked.
    pub fn selected_seats(&self) -> &BTreeSet<SeatIndex> {
        &self.selected_seats
    }

    /// Bookings across all movies.
    pub fn occupancy(&self) -> &OccupancyMap {
        &self.occupancy
    }

    /// Whether `seat` is currently selected.
    pub fn is_selected(&self, seat: SeatIndex) -> bool {
        self.selected_seats.contains(&seat)
    }

    /// Whether `seat` is booked for the current movie.
    pub fn is_occupied(&self, seat: SeatIndex) -> bool {
        self.occupancy.is_occupied(self.selected_movie, seat)
    }

    /// Price of the current selection.
    pub fn total_price(&self) -> u64 {
        self.selected_movie().price_for(self.selected_seats.len())
    }

    /// Snapshot the selection for confirmation.
    pub fn prepare_booking(&self) -> Result<PendingBooking, BookingError> {
        if self.selected_seats.is_empty() {
            return Err(BookingError::EmptySelection);
        }
        Ok(PendingBooking {
            movie: self.selected_movie,
            seats: self.selected_seats.clone(),
            total: self.total_price(),
        })
    }

    fn select_movie(&self, id: MovieId) -> Self {
        if find_movie(id).is_none() {
            return self.clone();
        }
        Self {
            selected_movie: id,
            selected_seats: BTreeSet::new(),
            occupancy: self.occupancy.clone(),
        }
    }

    fn toggle_seat(&self, seat: SeatIndex) -> Self {
        let mut next = self.clone();
        if next.is_occupied(seat) {
            return next;
        }
        if !next.selected_seats.remove(&seat) {
            next.selected_seats.insert(seat);
        }
        next
    }

    fn commit(&self, pending: PendingBooking) -> Result<(Self, Receipt), BookingError> {
        if pending.movie != self.selected_movie || pending.seats != self.selected_seats {
            return Err(BookingError::StaleBooking);
        }
        let mut next = self.clone();
        next.occupancy
            .occupy(pending.movie, pending.seats.iter().copied());
        next.selected_seats.clear();
        let receipt = Receipt {
            movie: pending.movie,
            seats: pending.seats.into_iter().collect(),
            total: pending.total,
        };
        Ok((next, receipt))
    }
}

/// A selection awaiting the user's confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBooking {
    movie: MovieId,
    seats: BTreeSet<SeatIndex>,
    total: u64,
}

impl PendingBooking {
    /// Movie being booked.
    pub fn movie(&self) -> &'static Movie {
        find_movie(self.movie).unwrap_or_else(default_movie)
    }

    /// Seats being booked.
    pub fn seats(&self) -> &BTreeSet<SeatIndex> {
        &self.seats
    }

    /// Amount to be charged.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Question shown to the user before committing.
    pub fn prompt(&self, currency: &str) -> String {
        let count = self.seats.len();
        format!(
            "{}\nBook {count} seat{} for {}?",
            self.movie().title,
            if count == 1 { "" } else { "s" },
            format_price(self.total, currency)
        )
    }
}

/// Outcome of a committed booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Movie that was booked.
    pub movie: MovieId,
    /// Seats now occupied, in grid order.
    pub seats: Vec<SeatIndex>,
    /// Amount charged.
    pub total: u64,
}

impl Receipt {
    /// Success message for the user.
    pub fn message(&self, currency: &str) -> String {
        let labels: Vec<String> = self.seats.iter().map(|seat| seat.label()).collect();
        let title = find_movie(self.movie)
            .map(|movie| movie.title)
            .unwrap_or("?");
        format!(
            "Booking complete: {title}, seats {} ({})",
            labels.join(", "),
            format_price(self.total, currency)
        )
    }
}

/// User actions understood by the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    /// Switch to another movie, clearing the selection.
    SelectMovie(MovieId),
    /// Select or deselect a seat of the current movie.
    ToggleSeat(SeatIndex),
    /// Book a confirmed selection.
    Commit(PendingBooking),
}

/// Result of applying a [`BookingEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The next state.
    pub state: BookingState,
    /// Present when the event booked seats.
    pub receipt: Option<Receipt>,
}

/// Compute the state following `event`.
///
/// Unknown movie ids and clicks on occupied seats leave the state unchanged.
pub fn reduce(state: &BookingState, event: BookingEvent) -> Result<Transition, BookingError> {
    let (state, receipt) = match event {
        BookingEvent::SelectMovie(id) => (state.select_movie(id), None),
        BookingEvent::ToggleSeat(seat) => (state.toggle_seat(seat), None),
        BookingEvent::Commit(pending) => {
            let (state, receipt) = state.commit(pending)?;
            (state, Some(receipt))
        }
    };
    Ok(Transition { state, receipt })
}

/// Message surfaced to the user by the interaction handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Recoverable problem, e.g. nothing selected.
    Warning(String),
    /// A booking went through.
    Success(String),
}

impl Notice {
    /// Text of the notice.
    pub fn message(&self) -> &str {
        match self {
            Notice::Warning(message) | Notice::Success(message) => message,
        }
    }
}

/// Blocking dialog capability supplied by a frontend.
pub trait Prompter {
    /// Ask a yes/no question.
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Show a message the user must acknowledge.
    fn notify(&mut self, notice: Notice);
}

/// Booking state bound to its persistence.
pub struct BookingSession<S> {
    state: BookingState,
    store: OccupancyStore<S>,
    currency: String,
}

impl<S: Storage> BookingSession<S> {
    /// Start a session from whatever the store holds.
    pub fn new(store: OccupancyStore<S>, currency: impl Into<String>) -> Self {
        let occupancy = store.load();
        info!(
            movies = occupancy.movies().count(),
            "Loaded existing bookings"
        );
        Self {
            state: BookingState::new(occupancy),
            store,
            currency: currency.into(),
        }
    }

    /// Current state.
    pub fn state(&self) -> &BookingState {
        &self.state
    }

    /// Currency suffix used in messages.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Switch movie. Returns whether the movie changed.
    pub fn select_movie(&mut self, id: MovieId) -> bool {
        let before = self.state.selected_movie;
        self.apply_local(BookingEvent::SelectMovie(id));
        let changed = self.state.selected_movie != before;
        if changed {
            info!(movie = %id, title = self.state.selected_movie().title, "Movie selected");
        }
        changed
    }

    /// Toggle a seat. Returns whether it is now selected.
    pub fn toggle_seat(&mut self, seat: SeatIndex) -> bool {
        self.apply_local(BookingEvent::ToggleSeat(seat));
        let selected = self.state.is_selected(seat);
        debug!(seat = %seat, selected, occupied = self.state.is_occupied(seat), "Seat toggled");
        selected
    }

    /// First phase of a booking.
    pub fn begin_booking(&self) -> Result<PendingBooking, BookingError> {
        self.state.prepare_booking()
    }

    /// Second phase of a booking: commit and persist.
    ///
    /// When the save fails the in-memory state is left as it was, so the
    /// selection survives and the booking can be retried.
    pub fn complete_booking(&mut self, pending: PendingBooking) -> Result<Receipt, BookingError> {
        let transition = reduce(&self.state, BookingEvent::Commit(pending))?;
        if let Err(err) = self.store.save(transition.state.occupancy()) {
            error!(key = self.store.key(), "Failed to persist booking: {err}");
            return Err(err.into());
        }
        let receipt = transition
            .receipt
            .ok_or(BookingError::StaleBooking)?;
        self.state = transition.state;
        info!(
            movie = %receipt.movie,
            seats = receipt.seats.len(),
            total = receipt.total,
            "Booking committed"
        );
        Ok(receipt)
    }

    /// Run the whole confirmation flow through blocking dialogs.
    ///
    /// Returns the receipt when seats were booked, `None` when nothing was
    /// selected or the user declined.
    pub fn confirm_booking(
        &mut self,
        prompter: &mut dyn Prompter,
    ) -> Result<Option<Receipt>, BookingError> {
        let pending = match self.begin_booking() {
            Ok(pending) => pending,
            Err(err @ BookingError::EmptySelection) => {
                prompter.notify(Notice::Warning(err.to_string()));
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        if !prompter.confirm(&pending.prompt(&self.currency)) {
            debug!("Booking declined");
            return Ok(None);
        }
        let receipt = self.complete_booking(pending)?;
        prompter.notify(Notice::Success(receipt.message(&self.currency)));
        Ok(Some(receipt))
    }

    fn apply_local(&mut self, event: BookingEvent) {
        // Movie and seat events cannot fail.
        if let Ok(transition) = reduce(&self.state, event) {
            self.state = transition.state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, DEFAULT_STORAGE_KEY};
    use anyhow::Result;

    fn seat(index: usize) -> SeatIndex {
        SeatIndex::new(index).expect("seat in range")
    }

    #[derive(Default)]
    struct ScriptedPrompter {
        answer: bool,
        prompts: Vec<String>,
        notices: Vec<Notice>,
    }

    impl ScriptedPrompter {
        fn answering(answer: bool) -> Self {
            Self {
                answer,
                ..Self::default()
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn confirm(&mut self, prompt: &str) -> bool {
            self.prompts.push(prompt.to_string());
            self.answer
        }

        fn notify(&mut self, notice: Notice) {
            self.notices.push(notice);
        }
    }

    struct FailingStorage;

    impl Storage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }

    fn session() -> (BookingSession<MemoryStorage>, MemoryStorage) {
        let storage = MemoryStorage::new();
        let session = BookingSession::new(OccupancyStore::new(storage.clone()), "KRW");
        (session, storage)
    }

    #[test]
    fn toggling_selects_and_deselects() -> Result<()> {
        let state = BookingState::default();
        let once = reduce(&state, BookingEvent::ToggleSeat(seat(4)))?.state;
        assert!(once.is_selected(seat(4)));
        let twice = reduce(&once, BookingEvent::ToggleSeat(seat(4)))?.state;
        assert_eq!(twice, state);
        Ok(())
    }

    #[test]
    fn occupied_seats_are_not_selectable() -> Result<()> {
        let mut occupancy = OccupancyMap::new();
        occupancy.occupy(MovieId(1), [seat(7)]);
        let state = BookingState::new(occupancy);
        let next = reduce(&state, BookingEvent::ToggleSeat(seat(7)))?;
        assert_eq!(next.state, state);
        assert!(next.receipt.is_none());
        Ok(())
    }

    #[test]
    fn selecting_a_movie_clears_selection() -> Result<()> {
        let state = reduce(&BookingState::default(), BookingEvent::ToggleSeat(seat(1)))?.state;
        let next = reduce(&state, BookingEvent::SelectMovie(MovieId(2)))?.state;
        assert_eq!(next.selected_movie().id, MovieId(2));
        assert!(next.selected_seats().is_empty());

        // Seats occupied for another movie are free here.
        let mut occupancy = OccupancyMap::new();
        occupancy.occupy(MovieId(1), [seat(1)]);
        let other = BookingState::new(occupancy).select_movie(MovieId(2));
        assert!(!other.is_occupied(seat(1)));
        Ok(())
    }

    #[test]
    fn unknown_movie_is_ignored() -> Result<()> {
        let state = reduce(&BookingState::default(), BookingEvent::ToggleSeat(seat(2)))?.state;
        let next = reduce(&state, BookingEvent::SelectMovie(MovieId(42)))?.state;
        assert_eq!(next, state);
        Ok(())
    }

    #[test]
    fn total_is_derived_from_selection() -> Result<()> {
        let mut state = BookingState::default();
        for index in [0, 1] {
            state = reduce(&state, BookingEvent::ToggleSeat(seat(index)))?.state;
        }
        assert_eq!(state.total_price(), 24_000);
        let joker = reduce(&state, BookingEvent::SelectMovie(MovieId(2)))?.state;
        assert_eq!(joker.total_price(), 0);
        Ok(())
    }

    #[test]
    fn stale_commit_changes_nothing() -> Result<()> {
        let state = reduce(&BookingState::default(), BookingEvent::ToggleSeat(seat(3)))?.state;
        let pending = state.prepare_booking()?;
        let moved = reduce(&state, BookingEvent::ToggleSeat(seat(4)))?.state;
        let err = reduce(&moved, BookingEvent::Commit(pending.clone())).unwrap_err();
        assert!(matches!(err, BookingError::StaleBooking));

        let switched = reduce(&state, BookingEvent::SelectMovie(MovieId(3)))?.state;
        assert!(reduce(&switched, BookingEvent::Commit(pending)).is_err());
        Ok(())
    }

    #[test]
    fn empty_confirmation_warns_without_changes() -> Result<()> {
        let (mut session, storage) = session();
        let before = session.state().clone();
        let mut prompter = ScriptedPrompter::answering(true);
        assert_eq!(session.confirm_booking(&mut prompter)?, None);
        assert_eq!(session.state(), &before);
        assert!(prompter.prompts.is_empty());
        assert_eq!(
            prompter.notices,
            vec![Notice::Warning("select at least one seat".to_string())]
        );
        assert_eq!(storage.get(DEFAULT_STORAGE_KEY)?, None);
        Ok(())
    }

    #[test]
    fn declined_confirmation_keeps_selection() -> Result<()> {
        let (mut session, storage) = session();
        session.toggle_seat(seat(10));
        let before = session.state().clone();
        let mut prompter = ScriptedPrompter::answering(false);
        assert_eq!(session.confirm_booking(&mut prompter)?, None);
        assert_eq!(session.state(), &before);
        assert_eq!(
            prompter.prompts,
            vec!["Avengers: Endgame\nBook 1 seat for 12,000 KRW?".to_string()]
        );
        assert!(prompter.notices.is_empty());
        assert_eq!(storage.get(DEFAULT_STORAGE_KEY)?, None);
        Ok(())
    }

    #[test]
    fn confirmed_booking_occupies_and_persists() -> Result<()> {
        let (mut session, storage) = session();
        assert!(session.toggle_seat(seat(0)));
        assert!(session.toggle_seat(seat(1)));
        assert_eq!(session.state().total_price(), 24_000);

        let mut prompter = ScriptedPrompter::answering(true);
        let receipt = session
            .confirm_booking(&mut prompter)?
            .expect("booking confirmed");
        assert_eq!(receipt.seats, vec![seat(0), seat(1)]);
        assert_eq!(receipt.total, 24_000);
        assert!(session.state().selected_seats().is_empty());
        assert_eq!(session.state().occupancy().count(MovieId(1)), 2);
        assert_eq!(
            storage.get(DEFAULT_STORAGE_KEY)?,
            Some(r#"{"1":[0,1]}"#.to_string())
        );
        assert!(matches!(prompter.notices.as_slice(), [Notice::Success(_)]));

        // Seat 0 is now occupied, so toggling it does nothing.
        assert!(!session.toggle_seat(seat(0)));
        assert!(session.state().selected_seats().is_empty());
        Ok(())
    }

    #[test]
    fn bookings_accumulate_across_sessions() -> Result<()> {
        let (mut session, storage) = session();
        session.toggle_seat(seat(5));
        let pending = session.begin_booking()?;
        session.complete_booking(pending)?;

        let mut reopened = BookingSession::new(OccupancyStore::new(storage.clone()), "KRW");
        assert!(reopened.state().is_occupied(seat(5)));
        reopened.toggle_seat(seat(6));
        let pending = reopened.begin_booking()?;
        reopened.complete_booking(pending)?;
        let seats: Vec<usize> = reopened
            .state()
            .occupancy()
            .occupied(MovieId(1))
            .map(SeatIndex::index)
            .collect();
        assert_eq!(seats, vec![5, 6]);
        Ok(())
    }

    #[test]
    fn failed_save_leaves_state_untouched() {
        let mut session = BookingSession::new(OccupancyStore::new(FailingStorage), "KRW");
        session.toggle_seat(seat(9));
        let before = session.state().clone();
        let pending = session.begin_booking().expect("seat selected");
        let err = session.complete_booking(pending).unwrap_err();
        assert!(matches!(err, BookingError::Storage(_)));
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn receipt_message_lists_seats() {
        let receipt = Receipt {
            movie: MovieId(2),
            seats: vec![seat(0), seat(9)],
            total: 22_000,
        };
        assert_eq!(
            receipt.message("KRW"),
            "Booking complete: Joker, seats A1, B2 (22,000 KRW)"
        );
    }
}
