pub mod plane;
pub mod sync;

pub use plane::{relative_inclination, NodeKind, PlaneAligner, PlaneAlignment};
pub use sync::{predict, SyncMode, SyncPrediction, Synchronizer, SYNC_ORBITS};
