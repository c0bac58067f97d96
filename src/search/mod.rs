//! Interactive fuzzy lookup over endpoint display names.

mod fuzzy;

pub use fuzzy::{highlight, rank, score};
