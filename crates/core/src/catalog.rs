//! Fixed movie catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a catalog movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u32);

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A movie that can be booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    /// Unique identifier within the catalog.
    pub id: MovieId,
    /// Display title.
    pub title: &'static str,
    /// Flat price charged per seat.
    pub unit_price: u64,
    /// Poster color (`#rrggbb`) used to tint the title.
    pub accent: &'static str,
}

impl Movie {
    /// Label used by the movie selector, e.g. `Joker (11,000 KRW)`.
    pub fn option_label(&self, currency: &str) -> String {
        format!("{} ({})", self.title, format_price(self.unit_price, currency))
    }

    /// Price for the given number of seats.
    pub fn price_for(&self, seats: usize) -> u64 {
        self.unit_price.saturating_mul(seats as u64)
    }
}

static CATALOG: [Movie; 3] = [
    Movie {
        id: MovieId(1),
        title: "Avengers: Endgame",
        unit_price: 12_000,
        accent: "#e74c3c",
    },
    Movie {
        id: MovieId(2),
        title: "Joker",
        unit_price: 11_000,
        accent: "#8e44ad",
    },
    Movie {
        id: MovieId(3),
        title: "Toy Story 4",
        unit_price: 10_000,
        accent: "#f1c40f",
    },
];

/// All movies in declaration order.
pub fn list_movies() -> &'static [Movie] {
    &CATALOG
}

/// Look up a movie by id.
pub fn find_movie(id: MovieId) -> Option<&'static Movie> {
    CATALOG.iter().find(|movie| movie.id == id)
}

/// The movie selected when the app starts.
pub fn default_movie() -> &'static Movie {
    &CATALOG[0]
}

/// Format an amount with thousands separators and a currency suffix.
pub fn format_price(amount: u64, currency: &str) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let currency = currency.trim();
    if currency.is_empty() {
        grouped
    } else {
        format!("{grouped} {currency}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_stable() {
        let ids: Vec<u32> = list_movies().iter().map(|movie| movie.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(default_movie().id, MovieId(1));
        assert_eq!(find_movie(MovieId(2)).map(|m| m.title), Some("Joker"));
        assert!(find_movie(MovieId(9)).is_none());
    }

    #[test]
    fn formats_prices() {
        assert_eq!(format_price(0, "KRW"), "0 KRW");
        assert_eq!(format_price(999, ""), "999");
        assert_eq!(format_price(12_000, "KRW"), "12,000 KRW");
        assert_eq!(format_price(1_234_567, "won"), "1,234,567 won");
    }

    #[test]
    fn option_label_includes_price() {
        let movie = find_movie(MovieId(3)).expect("catalog entry");
        assert_eq!(movie.option_label("KRW"), "Toy Story 4 (10,000 KRW)");
        assert_eq!(movie.price_for(3), 30_000);
    }
}
