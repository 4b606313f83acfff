//! Per-movie record of booked seats.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::{catalog::MovieId, seat::SeatIndex};

/// Seats already booked, keyed by movie. Entries only ever grow.
///
/// Serialized as a JSON object mapping the movie id (as a string) to an
/// array of seat indices, e.g. `{"1":[0,1]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyMap {
    movies: BTreeMap<MovieId, BTreeSet<SeatIndex>>,
}

impl OccupancyMap {
    /// Empty map with no bookings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seats booked for `movie`.
    pub fn occupied(&self, movie: MovieId) -> impl Iterator<Item = SeatIndex> + '_ {
        self.movies.get(&movie).into_iter().flatten().copied()
    }

    /// Whether `seat` is booked for `movie`.
    pub fn is_occupied(&self, movie: MovieId, seat: SeatIndex) -> bool {
        self.movies
            .get(&movie)
            .map(|seats| seats.contains(&seat))
            .unwrap_or(false)
    }

    /// Number of seats booked for `movie`.
    pub fn count(&self, movie: MovieId) -> usize {
        self.movies.get(&movie).map(BTreeSet::len).unwrap_or(0)
    }

    /// Union `seats` into the booked set for `movie`, returning how many were new.
    pub fn occupy(&mut self, movie: MovieId, seats: impl IntoIterator<Item = SeatIndex>) -> usize {
        let entry = self.movies.entry(movie).or_default();
        seats.into_iter().filter(|seat| entry.insert(*seat)).count()
    }

    /// Movies with at least one recorded entry.
    pub fn movies(&self) -> impl Iterator<Item = MovieId> + '_ {
        self.movies.keys().copied()
    }

    /// True when nothing has been booked.
    pub fn is_empty(&self) -> bool {
        self.movies.values().all(BTreeSet::is_empty)
    }

    /// Parse the persisted JSON layout.
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    /// Render the persisted JSON layout.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for OccupancyMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.movies.len()))?;
        for (movie, seats) in &self.movies {
            map.serialize_entry(&movie.to_string(), seats)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OccupancyMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: BTreeMap<String, Value> = BTreeMap::deserialize(deserializer)?;
        let mut movies: BTreeMap<MovieId, BTreeSet<SeatIndex>> = BTreeMap::new();
        for (key, value) in raw {
            let Ok(id) = key.trim().parse::<u32>() else {
                warn!(key = %key, "Skipping occupancy entry with non-numeric movie id");
                continue;
            };
            let Value::Array(items) = value else {
                warn!(movie = id, "Skipping occupancy entry that is not a seat list");
                continue;
            };
            let seats = movies.entry(MovieId(id)).or_default();
            for item in items {
                match item
                    .as_u64()
                    .and_then(|raw| usize::try_from(raw).ok())
                    .and_then(SeatIndex::new)
                {
                    Some(seat) => {
                        seats.insert(seat);
                    }
                    None => warn!(movie = id, value = %item, "Dropping invalid seat index"),
                }
            }
        }
        Ok(Self { movies })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(index: usize) -> SeatIndex {
        SeatIndex::new(index).expect("seat in range")
    }

    #[test]
    fn occupy_has_set_semantics() {
        let mut map = OccupancyMap::new();
        assert_eq!(map.occupy(MovieId(1), [seat(0), seat(1)]), 2);
        assert_eq!(map.occupy(MovieId(1), [seat(1), seat(2)]), 1);
        assert_eq!(map.count(MovieId(1)), 3);
        assert_eq!(map.count(MovieId(2)), 0);
        assert!(map.is_occupied(MovieId(1), seat(2)));
        assert!(!map.is_occupied(MovieId(2), seat(2)));
    }

    #[test]
    fn serializes_with_string_keys() -> serde_json::Result<()> {
        let mut map = OccupancyMap::new();
        map.occupy(MovieId(2), [seat(5), seat(3)]);
        map.occupy(MovieId(1), [seat(0)]);
        assert_eq!(map.to_json()?, r#"{"1":[0],"2":[3,5]}"#);
        Ok(())
    }

    #[test]
    fn decodes_list_storage_leniently() -> serde_json::Result<()> {
        let map = OccupancyMap::from_json(r#"{"1":[0,1,1,48,-2,"x"],"abc":[3],"3":"oops"}"#)?;
        let seats: Vec<usize> = map.occupied(MovieId(1)).map(SeatIndex::index).collect();
        assert_eq!(seats, vec![0, 1]);
        assert_eq!(map.movies().collect::<Vec<_>>(), vec![MovieId(1)]);
        Ok(())
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(OccupancyMap::from_json("not-json").is_err());
        assert!(OccupancyMap::from_json("[1,2,3]").is_err());
    }
}
