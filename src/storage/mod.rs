//! # Chunk Storage
//!
//! Persistence of chunk grids in region files.
//!
//! ## Components
//!
//! * [`codec`] - run-length records plus raw height maps for one grid
//! * [`compression`] - zstd frames over fixed-size input blocks
//! * [`seek_table`] - per-region table of payload spans
//! * [`region_file`] - one file: read, write with compaction, delete, flush
//! * [`manager`] - bounded pool of open regions shared between threads
//!
//! ## Data Flow
//!
//! Saving a chunk encodes its grid, compresses the records, and writes the result
//! into the chunk's slot of the region that covers it. Loading runs the same steps
//! in reverse. Region files are addressed by [`RegionPos`].

pub mod codec;
pub mod compression;
pub mod manager;
pub mod region_file;
pub mod region_pos;
pub mod seek_table;

pub use manager::{RegionFileManager, RegionLease, IDLE_LOCK_COUNT};
pub use region_file::RegionFile;
pub use region_pos::RegionPos;
pub use seek_table::{SeekEntry, SeekTable};
