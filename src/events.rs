//! Event records and kind-based categorization.
//!
//! Decoded event sub-streams arrive as one flat, ordered sequence of
//! heterogeneous records. Consumers almost always want "all events of
//! kind X", so [`categorize`] regroups a sequence into a map keyed by
//! event kind, shortening each key by stripping the shared namespace
//! prefix (`NNet.Game.SChatMessage` becomes `ChatMessage`).
//!
//! # Example
//!
//! ```
//! use stormreplay::events::{categorize, EventRecord, GAME_EVENT_PREFIX};
//! use stormreplay::value::Value;
//!
//! let records = vec![
//!     EventRecord::new("NNet.Game.SCmdEvent", 3, Some(1), Value::Null),
//!     EventRecord::new("NNet.Game.SCameraUpdateEvent", 4, Some(1), Value::Null),
//! ];
//!
//! let buckets = categorize(records, GAME_EVENT_PREFIX.len());
//! assert_eq!(buckets["CmdEvent"].len(), 1);
//! assert_eq!(buckets["CameraUpdateEvent"].len(), 1);
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::value::Value;

/// The namespace prefix shared by game and message event kinds.
pub const GAME_EVENT_PREFIX: &str = "NNet.Game.S";

/// The namespace prefix of tracker event kinds.
pub const TRACKER_EVENT_PREFIX: &str = "NNet.Replay.Tracker.S";

/// One decoded event from a game, message or tracker sub-stream.
///
/// Produced fresh on every decode call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// The namespaced event type name (e.g. `NNet.Game.SCmdEvent`).
    pub kind: String,

    /// Game loops elapsed since the previous event in the stream.
    pub delta: i64,

    /// The user the event is attributed to, when the stream records one.
    pub user_id: Option<i64>,

    /// The version-specific event payload.
    pub payload: Value,
}

impl EventRecord {
    /// Creates an event record.
    #[must_use]
    pub fn new(kind: impl Into<String>, delta: i64, user_id: Option<i64>, payload: Value) -> Self {
        EventRecord {
            kind: kind.into(),
            delta,
            user_id,
            payload,
        }
    }
}

/// Event records grouped by their (prefix-stripped) kind.
///
/// Order within a bucket is the original decode order. No ordering is
/// promised across distinct buckets.
pub type EventMap = HashMap<String, Vec<EventRecord>>;

/// Groups events by kind and strips `prefix_len` characters from each key.
///
/// Records are visited in input order and appended to the bucket for
/// their kind, so each bucket preserves arrival order. The prefix strip
/// is a name-shortening convenience, not a structural operation: the
/// caller is responsible for passing a length consistent with the keys'
/// actual common prefix. An over-long length yields empty keys rather
/// than an error, and two kinds that collide after stripping share one
/// bucket.
///
/// # Arguments
///
/// * `records` - The flat decoded event sequence
/// * `prefix_len` - Number of leading characters to remove from each kind
///
/// # Example
///
/// ```
/// use stormreplay::events::{categorize, EventRecord};
/// use stormreplay::value::Value;
///
/// let records = vec![EventRecord::new("NNet.Game.SFoo", 0, None, Value::Null)];
/// let buckets = categorize(records, 11);
/// assert!(buckets.contains_key("Foo"));
/// ```
#[must_use]
pub fn categorize(records: Vec<EventRecord>, prefix_len: usize) -> EventMap {
    let mut buckets: EventMap = HashMap::new();

    for record in records {
        let key = strip_prefix_chars(&record.kind, prefix_len);
        buckets.entry(key).or_default().push(record);
    }

    buckets
}

/// Removes exactly `n` leading characters, saturating to the empty string.
fn strip_prefix_chars(key: &str, n: usize) -> String {
    key.char_indices()
        .nth(n)
        .map_or_else(String::new, |(index, _)| key[index..].to_string())
}
