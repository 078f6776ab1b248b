//! Protocol decoders and version selection.
//!
//! The wire grammar of every sub-stream changes between base builds, so
//! decoding is split in two:
//!
//! - A **fixed header decoder** ([`decode_replay_header`]) whose grammar
//!   never changes. It runs first, on the container's header blob, to
//!   learn which base build wrote the replay.
//! - A **per-build decoder** behind the [`ProtocolDecoder`] trait,
//!   resolved from the base build via [`registry::resolve`], that knows
//!   the grammar of every other sub-stream for its build.
//!
//! Decoders are stateless and safe to share across sessions. The tracker
//! event capability is optional per build: query
//! [`ProtocolDecoder::supports_tracker_events`] before invoking the
//! decode, since older builds never recorded that sub-stream.

pub mod builds;
pub mod registry;

use serde::Serialize;

use crate::error::{ReplayError, Result};
use crate::events::EventRecord;
use crate::value::Value;
use crate::wire;

/// Header struct field tag of the signature blob.
const FIELD_SIGNATURE: u32 = 0;
/// Header struct field tag of the version descriptor.
const FIELD_VERSION: u32 = 1;
/// Header struct field tag of the elapsed game-loop counter.
const FIELD_ELAPSED_GAME_LOOPS: u32 = 3;

/// Version struct field tag of the flags integer.
const VERSION_FLAGS: u32 = 0;
/// Version struct field tag of the major version.
const VERSION_MAJOR: u32 = 1;
/// Version struct field tag of the minor version.
const VERSION_MINOR: u32 = 2;
/// Version struct field tag of the revision.
const VERSION_REVISION: u32 = 3;
/// Version struct field tag of the build number.
const VERSION_BUILD: u32 = 4;
/// Version struct field tag of the base build number.
const VERSION_BASE_BUILD: u32 = 5;

/// The game version descriptor embedded in a replay header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtocolVersion {
    /// Version flags.
    pub flags: u32,
    /// Major version component.
    pub major: u32,
    /// Minor version component.
    pub minor: u32,
    /// Revision component.
    pub revision: u32,
    /// The full build number.
    pub build: u32,
    /// The base build number that selects the wire grammar.
    pub base_build: u32,
}

/// The structured record decoded from a container's header blob.
///
/// Decoded once per session by the fixed, version-independent header
/// decoder; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayHeader {
    /// The replay signature string.
    pub signature: String,
    /// The nested version descriptor.
    pub version: ProtocolVersion,
    /// Total game loops recorded in the replay.
    pub elapsed_game_loops: u64,
}

/// One player attribute from `replay.attributes.events`.
///
/// Attributes are identified by an attribute id rather than an event
/// type name, so they are kept as a flat sequence instead of being
/// categorized by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// The namespace the attribute id belongs to.
    pub namespace: u32,
    /// The attribute id.
    pub id: u32,
    /// The player slot (or global scope marker) the attribute applies to.
    pub scope: u8,
    /// The attribute value, a short identifier such as `Humn` or `Medi`.
    pub value: String,
}

/// Decodes a container header blob with the fixed, version-independent
/// header grammar.
///
/// This is the bootstrap step of the pipeline: the header carries the
/// base build number needed to resolve every other decoder, so its own
/// grammar cannot depend on the build.
///
/// Unknown or absent auxiliary fields default to zero / empty; only the
/// version descriptor and its base build are required.
///
/// # Errors
///
/// - `ReplayError::ProtocolDecode` when the blob is not a struct, lacks
///   a version descriptor, or lacks a base build
/// - `ReplayError::UnexpectedEof` on truncated data
///
/// # Example
///
/// ```
/// use stormreplay::protocol::decode_replay_header;
/// use stormreplay::testutil::header_blob;
///
/// let header = decode_replay_header(&header_blob(29406)).unwrap();
/// assert_eq!(header.version.base_build, 29406);
/// ```
pub fn decode_replay_header(data: &[u8]) -> Result<ReplayHeader> {
    let root = wire::decode_versioned(data)?;

    if root.as_struct().is_none() {
        return Err(ReplayError::decode("header blob is not a struct"));
    }

    let version = root
        .field(FIELD_VERSION)
        .ok_or_else(|| ReplayError::decode("header is missing its version descriptor"))?;

    let base_build = version
        .field(VERSION_BASE_BUILD)
        .and_then(Value::as_u32)
        .ok_or_else(|| ReplayError::decode("version descriptor is missing the base build"))?;

    let uint_field = |tag: u32| version.field(tag).and_then(Value::as_u32).unwrap_or(0);

    let signature = root
        .field(FIELD_SIGNATURE)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let elapsed_game_loops = root
        .field(FIELD_ELAPSED_GAME_LOOPS)
        .and_then(Value::as_int)
        .and_then(|v| u64::try_from(v).ok())
        .unwrap_or(0);

    Ok(ReplayHeader {
        signature,
        version: ProtocolVersion {
            flags: uint_field(VERSION_FLAGS),
            major: uint_field(VERSION_MAJOR),
            minor: uint_field(VERSION_MINOR),
            revision: uint_field(VERSION_REVISION),
            build: uint_field(VERSION_BUILD),
            base_build,
        },
        elapsed_game_loops,
    })
}

/// A decoder for every versioned sub-stream of one base build.
///
/// Implementations are stateless capability bundles, safe to share
/// read-only across any number of concurrent sessions. Malformed input
/// fails with a decode error that propagates to the caller of the
/// corresponding load operation; nothing is caught internally.
pub trait ProtocolDecoder: Send + Sync {
    /// The base build this decoder implements.
    fn base_build(&self) -> u32;

    /// Decodes a container header blob.
    ///
    /// Redundant with [`decode_replay_header`] for current builds; kept
    /// on the trait so a build could tighten validation of its own
    /// headers.
    ///
    /// # Errors
    ///
    /// Propagates the fixed header decoder's failure modes.
    fn decode_replay_header(&self, data: &[u8]) -> Result<ReplayHeader> {
        decode_replay_header(data)
    }

    /// Decodes the `replay.details` sub-stream into a single record.
    ///
    /// # Errors
    ///
    /// Returns a decode-class error on malformed bytes.
    fn decode_replay_details(&self, data: &[u8]) -> Result<Value>;

    /// Decodes the `replay.initData` sub-stream into a single record.
    ///
    /// # Errors
    ///
    /// Returns a decode-class error on malformed bytes.
    fn decode_replay_initdata(&self, data: &[u8]) -> Result<Value>;

    /// Decodes the `replay.game.events` sub-stream into ordered events.
    ///
    /// # Errors
    ///
    /// Returns a decode-class error on malformed bytes or unknown event ids.
    fn decode_replay_game_events(&self, data: &[u8]) -> Result<Vec<EventRecord>>;

    /// Decodes the `replay.message.events` sub-stream into ordered events.
    ///
    /// # Errors
    ///
    /// Returns a decode-class error on malformed bytes or unknown event ids.
    fn decode_replay_message_events(&self, data: &[u8]) -> Result<Vec<EventRecord>>;

    /// Returns whether this build records tracker events.
    ///
    /// Query this before calling
    /// [`decode_replay_tracker_events`](Self::decode_replay_tracker_events);
    /// absence is normal for older builds, not an error.
    fn supports_tracker_events(&self) -> bool {
        false
    }

    /// Decodes the `replay.tracker.events` sub-stream into ordered events.
    ///
    /// # Errors
    ///
    /// Returns a decode-class error on malformed bytes, or when the build
    /// does not record tracker events at all.
    fn decode_replay_tracker_events(&self, data: &[u8]) -> Result<Vec<EventRecord>> {
        let _ = data;
        Err(ReplayError::decode(format!(
            "base build {} does not record tracker events",
            self.base_build()
        )))
    }

    /// Decodes the `replay.attributes.events` sub-stream.
    ///
    /// # Errors
    ///
    /// Returns a decode-class error on malformed bytes.
    fn decode_replay_attributes_events(&self, data: &[u8]) -> Result<Vec<Attribute>>;
}
