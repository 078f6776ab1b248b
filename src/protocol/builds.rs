//! The built-in protocol decoder family.
//!
//! All supported builds share one decoder implementation,
//! [`BuildProtocol`], parameterized by the per-build pieces: the event
//! id to event kind tables and the tracker capability. Everything else
//! rides on the self-describing tagged serialization in [`crate::wire`].
//!
//! # Event stream framing
//!
//! Game, message and tracker sub-streams are a back-to-back sequence of
//! tagged structs, one per event:
//!
//! | Field | Content                                    |
//! |-------|--------------------------------------------|
//! | 0     | game-loop delta since the previous event   |
//! | 1     | issuing user id (optional)                 |
//! | 2     | event id, resolved through the kind table  |
//! | 3     | the event payload                          |
//!
//! An event id without a table entry is a decode error: it means the
//! stream was written by a grammar this build table does not describe.

use crate::error::{ReplayError, Result};
use crate::events::EventRecord;
use crate::value::Value;
use crate::wire::{self, ByteReader};

use super::{Attribute, ProtocolDecoder};

/// First base build that records the tracker event sub-stream.
pub const TRACKER_EVENTS_SINCE: u32 = 30829;

/// Event struct field tag of the game-loop delta.
const EVENT_DELTA: u32 = 0;
/// Event struct field tag of the issuing user id.
const EVENT_USER_ID: u32 = 1;
/// Event struct field tag of the event id.
const EVENT_ID: u32 = 2;
/// Event struct field tag of the payload.
const EVENT_PAYLOAD: u32 = 3;

/// Game event ids and their namespaced kind names.
static GAME_EVENT_NAMES: &[(i64, &str)] = &[
    (5, "NNet.Game.SUserFinishedLoadingSyncEvent"),
    (9, "NNet.Game.SBankFileEvent"),
    (10, "NNet.Game.SBankSectionEvent"),
    (11, "NNet.Game.SBankKeyEvent"),
    (12, "NNet.Game.SBankValueEvent"),
    (13, "NNet.Game.SBankSignatureEvent"),
    (14, "NNet.Game.SCameraSaveEvent"),
    (21, "NNet.Game.SSaveGameEvent"),
    (22, "NNet.Game.SSaveGameDoneEvent"),
    (23, "NNet.Game.SLoadGameDoneEvent"),
    (26, "NNet.Game.SGameCheatEvent"),
    (27, "NNet.Game.SCmdEvent"),
    (28, "NNet.Game.SSelectionDeltaEvent"),
    (29, "NNet.Game.SControlGroupUpdateEvent"),
    (30, "NNet.Game.SSelectionSyncCheckEvent"),
    (31, "NNet.Game.SResourceTradeEvent"),
    (32, "NNet.Game.STriggerChatMessageEvent"),
    (33, "NNet.Game.SAICommunicateEvent"),
    (34, "NNet.Game.SSetAbsoluteGameSpeedEvent"),
    (35, "NNet.Game.SAddAbsoluteGameSpeedEvent"),
    (36, "NNet.Game.STriggerPingEvent"),
    (37, "NNet.Game.SBroadcastCheatEvent"),
    (38, "NNet.Game.SAllianceEvent"),
    (39, "NNet.Game.SUnitClickEvent"),
    (40, "NNet.Game.SUnitHighlightEvent"),
    (41, "NNet.Game.STriggerReplySelectedEvent"),
    (44, "NNet.Game.STriggerSkippedEvent"),
    (45, "NNet.Game.STriggerSoundLengthQueryEvent"),
    (46, "NNet.Game.STriggerSoundOffsetEvent"),
    (47, "NNet.Game.STriggerTransmissionOffsetEvent"),
    (48, "NNet.Game.STriggerTransmissionCompleteEvent"),
    (49, "NNet.Game.SCameraUpdateEvent"),
    (50, "NNet.Game.STriggerAbortMissionEvent"),
    (55, "NNet.Game.STriggerDialogControlEvent"),
    (56, "NNet.Game.STriggerSoundLengthSyncEvent"),
    (57, "NNet.Game.STriggerConversationSkippedEvent"),
    (58, "NNet.Game.STriggerMouseClickedEvent"),
    (59, "NNet.Game.STriggerMouseMovedEvent"),
    (63, "NNet.Game.STriggerHotkeyPressedEvent"),
    (64, "NNet.Game.STriggerTargetModeUpdateEvent"),
    (66, "NNet.Game.STriggerSoundtrackDoneEvent"),
    (87, "NNet.Game.STriggerPortraitLoadedEvent"),
    (88, "NNet.Game.STriggerCustomDialogDismissedEvent"),
    (89, "NNet.Game.STriggerGameMenuItemSelectedEvent"),
    (97, "NNet.Game.STriggerButtonPressedEvent"),
    (98, "NNet.Game.STriggerGameCreditsFinishedEvent"),
    (101, "NNet.Game.SGameUserLeaveEvent"),
    (102, "NNet.Game.SGameUserJoinEvent"),
];

/// Message event ids and their namespaced kind names.
static MESSAGE_EVENT_NAMES: &[(i64, &str)] = &[
    (0, "NNet.Game.SChatMessage"),
    (1, "NNet.Game.SPingMessage"),
    (2, "NNet.Game.SLoadingProgressMessage"),
    (3, "NNet.Game.SServerPingMessage"),
    (4, "NNet.Game.SReconnectNotifyMessage"),
];

/// Tracker event ids and their namespaced kind names.
static TRACKER_EVENT_NAMES: &[(i64, &str)] = &[
    (0, "NNet.Replay.Tracker.SPlayerStatsEvent"),
    (1, "NNet.Replay.Tracker.SUnitBornEvent"),
    (2, "NNet.Replay.Tracker.SUnitDiedEvent"),
    (3, "NNet.Replay.Tracker.SUnitOwnerChangeEvent"),
    (4, "NNet.Replay.Tracker.SUnitTypeChangeEvent"),
    (5, "NNet.Replay.Tracker.SUpgradeEvent"),
    (6, "NNet.Replay.Tracker.SUnitInitEvent"),
    (7, "NNet.Replay.Tracker.SUnitDoneEvent"),
    (8, "NNet.Replay.Tracker.SUnitPositionsEvent"),
    (9, "NNet.Replay.Tracker.SPlayerSetupEvent"),
];

/// The decoder implementation shared by all registered builds.
///
/// Stateless; the registry holds one static instance per supported base
/// build.
#[derive(Debug)]
pub struct BuildProtocol {
    base_build: u32,
    tracker_events: bool,
}

impl BuildProtocol {
    /// Creates the decoder for a base build.
    ///
    /// Tracker capability is derived from [`TRACKER_EVENTS_SINCE`].
    #[must_use]
    pub const fn new(base_build: u32) -> Self {
        BuildProtocol {
            base_build,
            tracker_events: base_build >= TRACKER_EVENTS_SINCE,
        }
    }

    /// Decodes one event sub-stream against a kind table.
    fn decode_event_stream(
        &self,
        data: &[u8],
        names: &'static [(i64, &str)],
        stream: &str,
    ) -> Result<Vec<EventRecord>> {
        let mut reader = ByteReader::new(data);
        let mut events = Vec::new();

        while !reader.is_empty() {
            let record = reader.read_versioned()?;

            let delta = record
                .field(EVENT_DELTA)
                .and_then(Value::as_int)
                .ok_or_else(|| {
                    ReplayError::decode(format!("{stream} event {} has no delta", events.len()))
                })?;

            let user_id = record.field(EVENT_USER_ID).and_then(Value::as_int);

            let event_id = record
                .field(EVENT_ID)
                .and_then(Value::as_int)
                .ok_or_else(|| {
                    ReplayError::decode(format!("{stream} event {} has no event id", events.len()))
                })?;

            let kind = lookup_kind(names, event_id).ok_or_else(|| {
                ReplayError::decode(format!(
                    "unknown {stream} event id {event_id} for base build {}",
                    self.base_build
                ))
            })?;

            let payload = record.field(EVENT_PAYLOAD).cloned().unwrap_or(Value::Null);

            events.push(EventRecord::new(kind, delta, user_id, payload));
        }

        Ok(events)
    }
}

/// Resolves an event id through a kind table.
fn lookup_kind(names: &'static [(i64, &str)], event_id: i64) -> Option<&'static str> {
    names
        .iter()
        .find(|(id, _)| *id == event_id)
        .map(|(_, name)| *name)
}

impl ProtocolDecoder for BuildProtocol {
    fn base_build(&self) -> u32 {
        self.base_build
    }

    fn decode_replay_details(&self, data: &[u8]) -> Result<Value> {
        wire::decode_versioned(data)
    }

    fn decode_replay_initdata(&self, data: &[u8]) -> Result<Value> {
        wire::decode_versioned(data)
    }

    fn decode_replay_game_events(&self, data: &[u8]) -> Result<Vec<EventRecord>> {
        self.decode_event_stream(data, GAME_EVENT_NAMES, "game")
    }

    fn decode_replay_message_events(&self, data: &[u8]) -> Result<Vec<EventRecord>> {
        self.decode_event_stream(data, MESSAGE_EVENT_NAMES, "message")
    }

    fn supports_tracker_events(&self) -> bool {
        self.tracker_events
    }

    fn decode_replay_tracker_events(&self, data: &[u8]) -> Result<Vec<EventRecord>> {
        if !self.tracker_events {
            return Err(ReplayError::decode(format!(
                "base build {} does not record tracker events",
                self.base_build
            )));
        }
        self.decode_event_stream(data, TRACKER_EVENT_NAMES, "tracker")
    }

    fn decode_replay_attributes_events(&self, data: &[u8]) -> Result<Vec<Attribute>> {
        // An absent attribute block decodes to an empty list
        if data.is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = ByteReader::new(data);
        let _source = reader.read_u8()?;
        let _map_namespace = reader.read_u32_le()?;
        let count = reader.read_u32_le()?;

        // Each record is 13 bytes; cap the pre-allocation by what the
        // stream can actually hold so a bogus count cannot exhaust memory
        let mut attributes = Vec::with_capacity((count as usize).min(data.len() / 13));
        for _ in 0..count {
            let namespace = reader.read_u32_le()?;
            let id = reader.read_u32_le()?;
            let scope = reader.read_u8()?;

            // The four value bytes are stored reversed and null padded
            let mut raw = reader.read_bytes(4)?.to_vec();
            raw.reverse();
            let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
            let end = raw.iter().rposition(|b| *b != 0).map_or(start, |i| i + 1);
            let value = String::from_utf8_lossy(&raw[start..end]).into_owned();

            attributes.push(Attribute {
                namespace,
                id,
                scope,
                value,
            });
        }

        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        attributes_stream, event, event_stream, versioned_blob, versioned_struct, versioned_vint,
    };

    fn protocol(base_build: u32) -> BuildProtocol {
        BuildProtocol::new(base_build)
    }

    #[test]
    fn test_tracker_capability_threshold() {
        assert!(!protocol(29406).supports_tracker_events());
        assert!(!protocol(30414).supports_tracker_events());
        assert!(protocol(30829).supports_tracker_events());
        assert!(protocol(34053).supports_tracker_events());
    }

    #[test]
    fn test_decode_details() {
        let data = versioned_struct(vec![(1, versioned_blob(b"Cursed Hollow"))]);
        let details = protocol(29406).decode_replay_details(&data).unwrap();
        assert_eq!(details.field(1).and_then(Value::as_str), Some("Cursed Hollow"));
    }

    #[test]
    fn test_decode_game_events() {
        let data = event_stream(vec![
            event(0, Some(1), 27, versioned_struct(vec![(0, versioned_vint(4))])),
            event(16, Some(2), 49, versioned_vint(0)),
            event(3, Some(1), 27, versioned_vint(9)),
        ]);

        let events = protocol(29406).decode_replay_game_events(&data).unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, "NNet.Game.SCmdEvent");
        assert_eq!(events[0].delta, 0);
        assert_eq!(events[0].user_id, Some(1));
        assert_eq!(events[1].kind, "NNet.Game.SCameraUpdateEvent");
        assert_eq!(events[1].delta, 16);
        assert_eq!(events[2].kind, "NNet.Game.SCmdEvent");
    }

    #[test]
    fn test_decode_game_events_empty_stream() {
        let events = protocol(29406).decode_replay_game_events(&[]).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_decode_game_events_unknown_id() {
        let data = event_stream(vec![event(0, Some(1), 9999, versioned_vint(0))]);
        let result = protocol(29406).decode_replay_game_events(&data);
        match result {
            Err(ReplayError::ProtocolDecode { reason }) => {
                assert!(reason.contains("9999"));
                assert!(reason.contains("29406"));
            }
            other => panic!("Expected ProtocolDecode, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_game_events_without_user() {
        let data = event_stream(vec![event(5, None, 5, versioned_vint(0))]);
        let events = protocol(29406).decode_replay_game_events(&data).unwrap();
        assert_eq!(events[0].kind, "NNet.Game.SUserFinishedLoadingSyncEvent");
        assert_eq!(events[0].user_id, None);
    }

    #[test]
    fn test_decode_message_events() {
        let data = event_stream(vec![
            event(0, Some(3), 0, versioned_blob(b"gl hf")),
            event(100, Some(4), 1, versioned_struct(vec![(0, versioned_vint(12))])),
        ]);

        let events = protocol(29406).decode_replay_message_events(&data).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "NNet.Game.SChatMessage");
        assert_eq!(events[0].payload.as_str(), Some("gl hf"));
        assert_eq!(events[1].kind, "NNet.Game.SPingMessage");
    }

    #[test]
    fn test_decode_tracker_events() {
        let data = event_stream(vec![
            event(0, None, 9, versioned_vint(0)),
            event(160, None, 1, versioned_struct(vec![(0, versioned_blob(b"Raynor"))])),
        ]);

        let events = protocol(32455).decode_replay_tracker_events(&data).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "NNet.Replay.Tracker.SPlayerSetupEvent");
        assert_eq!(events[1].kind, "NNet.Replay.Tracker.SUnitBornEvent");
    }

    #[test]
    fn test_decode_tracker_events_unsupported_build() {
        let result = protocol(29406).decode_replay_tracker_events(&[]);
        assert!(matches!(result, Err(ReplayError::ProtocolDecode { .. })));
    }

    #[test]
    fn test_decode_truncated_event_stream() {
        let mut data = event_stream(vec![event(0, Some(1), 27, versioned_vint(0))]);
        data.extend_from_slice(&[0x05]); // a struct tag with nothing behind it
        let result = protocol(29406).decode_replay_game_events(&data);
        assert!(matches!(result, Err(ReplayError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_decode_attributes() {
        let data = attributes_stream(&[
            (999, 500, 16, "Humn"),
            (999, 3001, 1, "Medi"),
        ]);

        let attributes = protocol(29406).decode_replay_attributes_events(&data).unwrap();

        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].id, 500);
        assert_eq!(attributes[0].scope, 16);
        assert_eq!(attributes[0].value, "Humn");
        assert_eq!(attributes[1].value, "Medi");
    }

    #[test]
    fn test_decode_attributes_short_value() {
        // Values shorter than four bytes arrive null padded
        let data = attributes_stream(&[(999, 1, 16, "1v")]);
        let attributes = protocol(29406).decode_replay_attributes_events(&data).unwrap();
        assert_eq!(attributes[0].value, "1v");
    }

    #[test]
    fn test_decode_attributes_empty_stream() {
        let attributes = protocol(29406).decode_replay_attributes_events(&[]).unwrap();
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_decode_attributes_count_larger_than_stream() {
        // A preamble claiming u32::MAX records with no record bytes must
        // fail the first per-record read, not reserve memory up front
        let mut data = vec![0u8];
        data.extend_from_slice(&999u32.to_le_bytes());
        data.extend_from_slice(&u32::MAX.to_le_bytes());

        let result = protocol(29406).decode_replay_attributes_events(&data);
        assert!(matches!(result, Err(ReplayError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_decode_attributes_truncated() {
        let mut data = attributes_stream(&[(999, 1, 16, "Humn")]);
        data.truncate(data.len() - 2);
        let result = protocol(29406).decode_replay_attributes_events(&data);
        assert!(matches!(result, Err(ReplayError::UnexpectedEof { .. })));
    }
}
