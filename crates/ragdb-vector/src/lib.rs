//! ragdb-vector
//!
//! Exact (brute-force) cosine nearest-neighbour index over embedded segments,
//! its Arrow IPC on-disk format, and a handle for atomically swapping the
//! active index under concurrent readers.

pub mod handle;
pub mod index;
pub mod schema;
pub mod similarity;
pub mod store;
pub mod topk;

pub use handle::IndexHandle;
pub use index::VectorIndex;
