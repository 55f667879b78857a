//! In-memory index structures: the normalization pipeline feeding the
//! per-keyword ternary search trees, and the per-keyword nearest-neighbour
//! trees. All structures are built during load and frozen before the dataset
//! generation is published.

mod neartree;
mod normalize;
mod ternary;

pub use neartree::{great_circle_km, NearTree};
pub use normalize::{normalize_language, Normalizer};
pub use ternary::TernaryTree;
