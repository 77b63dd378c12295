//! # scrollkv
//!
//! An embedded, log-structured key-value store with:
//! - An append-only data file as the single source of truth
//! - Crash recovery with partial write handling
//! - Single-writer/multi-reader concurrency model
//! - Lazy per-key TTL expiry (no background threads)
//! - Optional prefix search in insertion order
//! - Explicit, canonical compaction
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                              │
//! │        get / set / delete / clear / compact / search        │
//! │            (Single Writer / Multi Reader)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌──────────────┐
//!   │  Log Store  │ │ Key Dir     │   │ Search Index │
//!   │  (Append)   │ │ (HashMap)   │   │ (Prefix Trie)│
//!   └─────────────┘ └─────────────┘   └──────────────┘
//!     dump.scdb       rebuilt from       rebuilt from
//!                     the log on open    the log on open
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use scrollkv::Engine;
//!
//! # fn main() -> scrollkv::Result<()> {
//! let engine = Engine::open_path("./db".as_ref(), true)?;
//!
//! engine.set(b"foo", b"eng", None)?;
//! engine.set(b"session", b"abc", Some(60))?;
//!
//! assert_eq!(engine.get(b"foo")?, Some(b"eng".to_vec()));
//! let hits = engine.search(b"fo", 0, 0)?;
//! assert_eq!(hits.len(), 1);
//!
//! engine.delete(b"foo")?;
//! engine.compact()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod log;
pub mod keydir;
pub mod search;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ScrollError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of scrollkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
