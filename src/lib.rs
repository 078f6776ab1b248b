//! # StormReplay
//!
//! A Heroes of the Storm replay (.StormReplay) decoding library.
//!
//! A replay is a compound container of independent, named sub-streams
//! (match details, lobby init state, game events, chat messages, tracker
//! events, player attributes), each encoded with a wire grammar that
//! changes between game versions. The container header embeds the base
//! build number that selects the right grammar; this crate reads that
//! header once, resolves a protocol decoder from its static registry,
//! and decodes each sub-stream on demand into queryable, type-indexed
//! collections.
//!
//! ## Quick Start
//!
//! ```no_run
//! use stormreplay::archive::DirArchive;
//! use stormreplay::error::Result;
//! use stormreplay::session::{LoadSelection, ReplaySession};
//!
//! fn inspect_replay(path: &str) -> Result<()> {
//!     // A directory of extracted sub-stream files
//!     let archive = DirArchive::open(path)?;
//!     let mut session = ReplaySession::open(archive)?;
//!
//!     println!("Base build: {}", session.base_build());
//!
//!     session.load(&LoadSelection::default())?;
//!
//!     for (kind, events) in &session.game_events {
//!         println!("{kind}: {} events", events.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types and result alias for decoding operations
//! - [`value`] - The generic structured value all decoders produce
//! - [`wire`] - Bounds-checked byte reading and the tagged serialization
//! - [`archive`] - The container seam and the shipped archive backends
//! - [`protocol`] - The fixed header decoder, the per-build decoder
//!   trait, the built-in decoder family and the build registry
//! - [`events`] - Event records and kind-based categorization
//! - [`session`] - The orchestrating replay session
//!
//! ## Version handling
//!
//! The registry is a closed, compile-time table of base builds. Opening
//! a replay written by an unregistered build fails with a typed
//! `UnsupportedProtocol` error carrying the offending build number;
//! everything else about the container stays untouched. Builds older
//! than the tracker-event rollout simply lack that capability, which is
//! reported through a query rather than an error.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod error;
pub mod events;
pub mod protocol;
pub mod session;
pub mod testutil;
pub mod value;
pub mod wire;

// Re-export commonly used types at the crate root
pub use archive::{DirArchive, MemoryArchive, ReplayArchive};
pub use error::{ReplayError, Result};
pub use events::{categorize, EventMap, EventRecord, GAME_EVENT_PREFIX, TRACKER_EVENT_PREFIX};
pub use protocol::{
    decode_replay_header, registry::resolve, Attribute, ProtocolDecoder, ProtocolVersion,
    ReplayHeader,
};
pub use session::{LoadSelection, ReplaySession};
pub use value::Value;
