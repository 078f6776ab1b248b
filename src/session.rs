//! The replay session: one open container, one resolved protocol.
//!
//! A [`ReplaySession`] owns an archive, decodes its header once with the
//! fixed header decoder, resolves the matching protocol decoder from the
//! registry, and then populates its typed fields on demand through the
//! per-sub-stream `load_*` operations.
//!
//! Load operations are independent, commutative and idempotent: each one
//! reads its sub-stream, decodes, and replaces its field wholesale. A
//! failed load leaves every field exactly as it was. After [`close`],
//! the container handle is released and every further load fails with
//! [`ReplayError::SessionClosed`].
//!
//! [`close`]: ReplaySession::close
//!
//! # Example
//!
//! ```
//! use stormreplay::archive::{MemoryArchive, SUBSTREAM_ATTRIBUTES_EVENTS};
//! use stormreplay::session::ReplaySession;
//! use stormreplay::testutil::{attributes_stream, header_blob};
//!
//! let archive = MemoryArchive::new(header_blob(29406))
//!     .with_substream(SUBSTREAM_ATTRIBUTES_EVENTS, attributes_stream(&[(999, 500, 16, "Humn")]));
//!
//! let mut session = ReplaySession::open(archive).unwrap();
//! assert_eq!(session.base_build(), 29406);
//!
//! session.load_attributes().unwrap();
//! assert_eq!(session.attributes.len(), 1);
//! ```

use crate::archive::{
    ReplayArchive, SUBSTREAM_ATTRIBUTES_EVENTS, SUBSTREAM_DETAILS, SUBSTREAM_GAME_EVENTS,
    SUBSTREAM_INITDATA, SUBSTREAM_MESSAGE_EVENTS, SUBSTREAM_TRACKER_EVENTS,
};
use crate::error::{ReplayError, Result};
use crate::events::{categorize, EventMap, GAME_EVENT_PREFIX, TRACKER_EVENT_PREFIX};
use crate::protocol::{self, registry, Attribute, ProtocolDecoder, ReplayHeader};
use crate::value::Value;

/// Init-data struct field holding the lobby synchronization sub-record.
/// Only this sub-record is kept; the rest of the init payload is dropped.
const SYNC_LOBBY_STATE_FIELD: u32 = 0;

/// Selects which load operations [`ReplaySession::load`] runs.
///
/// Defaults to everything. The selected subset always runs in the fixed
/// order details, init data, game, messages, tracker, attributes; order
/// only matters for which failure surfaces first, since the fields are
/// independent.
///
/// # Example
///
/// ```
/// use stormreplay::session::LoadSelection;
///
/// let everything = LoadSelection::default();
/// assert!(everything.tracker_events);
///
/// let only_chat = LoadSelection::none().message_events(true);
/// assert!(only_chat.message_events);
/// assert!(!only_chat.game_events);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct LoadSelection {
    pub details: bool,
    pub initdata: bool,
    pub game_events: bool,
    pub message_events: bool,
    pub tracker_events: bool,
    pub attributes: bool,
}

impl Default for LoadSelection {
    fn default() -> Self {
        LoadSelection {
            details: true,
            initdata: true,
            game_events: true,
            message_events: true,
            tracker_events: true,
            attributes: true,
        }
    }
}

impl LoadSelection {
    /// A selection with every operation disabled.
    #[must_use]
    pub fn none() -> Self {
        LoadSelection {
            details: false,
            initdata: false,
            game_events: false,
            message_events: false,
            tracker_events: false,
            attributes: false,
        }
    }

    /// Sets whether `load_details` runs.
    #[must_use]
    pub fn details(mut self, enabled: bool) -> Self {
        self.details = enabled;
        self
    }

    /// Sets whether `load_initdata` runs.
    #[must_use]
    pub fn initdata(mut self, enabled: bool) -> Self {
        self.initdata = enabled;
        self
    }

    /// Sets whether `load_game_events` runs.
    #[must_use]
    pub fn game_events(mut self, enabled: bool) -> Self {
        self.game_events = enabled;
        self
    }

    /// Sets whether `load_message_events` runs.
    #[must_use]
    pub fn message_events(mut self, enabled: bool) -> Self {
        self.message_events = enabled;
        self
    }

    /// Sets whether `load_tracker_events` runs.
    #[must_use]
    pub fn tracker_events(mut self, enabled: bool) -> Self {
        self.tracker_events = enabled;
        self
    }

    /// Sets whether `load_attributes` runs.
    #[must_use]
    pub fn attributes(mut self, enabled: bool) -> Self {
        self.attributes = enabled;
        self
    }
}

/// An open replay with on-demand, per-sub-stream decoding.
///
/// The base build and resolved protocol never change after [`open`];
/// only the explicit load operations mutate the output fields, and
/// [`close`] releases the container handle.
///
/// [`open`]: ReplaySession::open
/// [`close`]: ReplaySession::close
pub struct ReplaySession<A: ReplayArchive> {
    /// `None` once the session is closed.
    archive: Option<A>,
    header: ReplayHeader,
    protocol: &'static dyn ProtocolDecoder,

    /// The decoded `replay.details` record, once loaded.
    pub details: Option<Value>,
    /// The lobby synchronization record from `replay.initData`, once loaded.
    pub initdata: Option<Value>,
    /// Game events bucketed by kind, once loaded.
    pub game_events: EventMap,
    /// Message events bucketed by kind, once loaded.
    pub message_events: EventMap,
    /// Tracker events bucketed by kind, once loaded (empty for builds
    /// without the tracker capability).
    pub tracker_events: EventMap,
    /// Player attributes in decode order, once loaded.
    pub attributes: Vec<Attribute>,
}

impl<A: ReplayArchive> ReplaySession<A> {
    /// Opens a session over an archive.
    ///
    /// Decodes the header blob with the fixed header decoder, extracts
    /// the base build and resolves the protocol decoder once. No
    /// sub-stream is read yet.
    ///
    /// # Errors
    ///
    /// - `ReplayError::ProtocolDecode` / `UnexpectedEof` when the header
    ///   blob is malformed
    /// - `ReplayError::UnsupportedProtocol` when the base build has no
    ///   registered decoder
    pub fn open(archive: A) -> Result<Self> {
        let header = protocol::decode_replay_header(archive.header_blob())?;
        let protocol = registry::resolve(header.version.base_build)?;

        Ok(ReplaySession {
            archive: Some(archive),
            header,
            protocol,
            details: None,
            initdata: None,
            game_events: EventMap::new(),
            message_events: EventMap::new(),
            tracker_events: EventMap::new(),
            attributes: Vec::new(),
        })
    }

    /// Returns the decoded replay header.
    #[must_use]
    pub fn header(&self) -> &ReplayHeader {
        &self.header
    }

    /// Returns the replay's base build number.
    #[must_use]
    pub fn base_build(&self) -> u32 {
        self.header.version.base_build
    }

    /// Returns the resolved protocol decoder.
    #[must_use]
    pub fn protocol(&self) -> &'static dyn ProtocolDecoder {
        self.protocol
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.archive.is_none()
    }

    /// Reads a sub-stream, failing when the session is closed.
    fn read_substream(&self, name: &str) -> Result<Vec<u8>> {
        self.archive
            .as_ref()
            .ok_or(ReplayError::SessionClosed)?
            .read_substream(name)
    }

    /// Loads and decodes `replay.details`.
    ///
    /// # Errors
    ///
    /// `SessionClosed`, `MissingSubstream`, or a decode-class error; the
    /// stored field is untouched on failure.
    pub fn load_details(&mut self) -> Result<()> {
        let data = self.read_substream(SUBSTREAM_DETAILS)?;
        let details = self.protocol.decode_replay_details(&data)?;
        self.details = Some(details);
        Ok(())
    }

    /// Loads `replay.initData` and stores its lobby synchronization
    /// sub-record.
    ///
    /// # Errors
    ///
    /// `SessionClosed`, `MissingSubstream`, or a decode-class error
    /// (including an init payload without the lobby record); the stored
    /// field is untouched on failure.
    pub fn load_initdata(&mut self) -> Result<()> {
        let data = self.read_substream(SUBSTREAM_INITDATA)?;
        let init = self.protocol.decode_replay_initdata(&data)?;
        let lobby = init
            .field(SYNC_LOBBY_STATE_FIELD)
            .cloned()
            .ok_or_else(|| ReplayError::decode("init data has no lobby synchronization record"))?;
        self.initdata = Some(lobby);
        Ok(())
    }

    /// Loads `replay.game.events` and stores the events bucketed by kind.
    ///
    /// # Errors
    ///
    /// `SessionClosed`, `MissingSubstream`, or a decode-class error; the
    /// stored field is untouched on failure.
    pub fn load_game_events(&mut self) -> Result<()> {
        let data = self.read_substream(SUBSTREAM_GAME_EVENTS)?;
        let events = self.protocol.decode_replay_game_events(&data)?;
        self.game_events = categorize(events, GAME_EVENT_PREFIX.len());
        Ok(())
    }

    /// Loads `replay.message.events` and stores the events bucketed by
    /// kind. Message kinds share the game-event namespace prefix.
    ///
    /// # Errors
    ///
    /// `SessionClosed`, `MissingSubstream`, or a decode-class error; the
    /// stored field is untouched on failure.
    pub fn load_message_events(&mut self) -> Result<()> {
        let data = self.read_substream(SUBSTREAM_MESSAGE_EVENTS)?;
        let events = self.protocol.decode_replay_message_events(&data)?;
        self.message_events = categorize(events, GAME_EVENT_PREFIX.len());
        Ok(())
    }

    /// Loads `replay.tracker.events` when the resolved protocol records
    /// them.
    ///
    /// For builds without the tracker capability this is a silent no-op:
    /// the call succeeds and the field keeps its previous value (empty
    /// on a fresh session), since those builds never wrote the
    /// sub-stream.
    ///
    /// # Errors
    ///
    /// `SessionClosed`, `MissingSubstream`, or a decode-class error; the
    /// stored field is untouched on failure.
    pub fn load_tracker_events(&mut self) -> Result<()> {
        if self.archive.is_none() {
            return Err(ReplayError::SessionClosed);
        }
        if !self.protocol.supports_tracker_events() {
            return Ok(());
        }

        let data = self.read_substream(SUBSTREAM_TRACKER_EVENTS)?;
        let events = self.protocol.decode_replay_tracker_events(&data)?;
        self.tracker_events = categorize(events, TRACKER_EVENT_PREFIX.len());
        Ok(())
    }

    /// Loads `replay.attributes.events` as a flat, ordered sequence.
    ///
    /// Attributes are identified by attribute id rather than an event
    /// type name, so they are not categorized.
    ///
    /// # Errors
    ///
    /// `SessionClosed`, `MissingSubstream`, or a decode-class error; the
    /// stored field is untouched on failure.
    pub fn load_attributes(&mut self) -> Result<()> {
        let data = self.read_substream(SUBSTREAM_ATTRIBUTES_EVENTS)?;
        let attributes = self.protocol.decode_replay_attributes_events(&data)?;
        self.attributes = attributes;
        Ok(())
    }

    /// Runs the selected load operations in the fixed order details,
    /// init data, game, messages, tracker, attributes.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failing operation; fields loaded
    /// before the failure keep their new values.
    pub fn load(&mut self, selection: &LoadSelection) -> Result<()> {
        if selection.details {
            self.load_details()?;
        }
        if selection.initdata {
            self.load_initdata()?;
        }
        if selection.game_events {
            self.load_game_events()?;
        }
        if selection.message_events {
            self.load_message_events()?;
        }
        if selection.tracker_events {
            self.load_tracker_events()?;
        }
        if selection.attributes {
            self.load_attributes()?;
        }
        Ok(())
    }

    /// Releases the container handle.
    ///
    /// Terminal: every later load fails with `SessionClosed`. Loaded
    /// fields stay readable.
    pub fn close(&mut self) {
        self.archive = None;
    }
}
