//! The editing session for one world document.
//!
//! A page constructs a `WorldSession` from the local mirror, mutates the
//! document through it (every mutation re-mirrors and marks the dirty flag),
//! and flushes through a persistence backend on a timer, on exit, or on
//! explicit save. The map pin subsystem drives its mutations through the
//! same dirty/flush path.

pub mod autosave;
pub mod backends;
pub mod dirty;
pub mod mirror;
pub mod pins;
pub mod session;

pub use autosave::run_autosave;
pub use backends::{DriveStore, LocalExport, RemoteEntry, RemoteStore, SaveReceipt};
pub use dirty::{DirtyTracker, SaveStatus};
pub use mirror::{KvStore, MemoryStore, Mirror, MirrorSnapshot};
pub use pins::{ClickOutcome, MapEditor, Marker, PinDraft, PinTool, SurfaceSize};
pub use session::{SessionConfig, WorldSession};
