//! Raw image moments: tiled partial sums on a compute backend, combined on
//! the host into a centroid.

pub mod aggregate;
pub mod reducer;
pub mod tiles;

pub use aggregate::{aggregate, Centroid, Moments, YAxis};
pub use reducer::MomentReducer;
pub use tiles::{TileGeometry, TilePartialSum, TileReduction};
