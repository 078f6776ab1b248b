//! End-to-end tests for the decoding pipeline over extracted archives.
//!
//! These tests assemble synthetic extracted-archive directories on disk
//! (header blob plus sub-stream files), open them through [`DirArchive`]
//! and drive a full [`ReplaySession`], exactly the path the CLI takes.

use std::fs;
use std::path::Path;

use stormreplay::archive::{
    DirArchive, HEADER_FILE, SUBSTREAM_ATTRIBUTES_EVENTS, SUBSTREAM_DETAILS, SUBSTREAM_GAME_EVENTS,
    SUBSTREAM_INITDATA, SUBSTREAM_MESSAGE_EVENTS, SUBSTREAM_TRACKER_EVENTS,
};
use stormreplay::session::{LoadSelection, ReplaySession};
use stormreplay::testutil::{
    attributes_stream, event, event_stream, header_blob, versioned_blob, versioned_struct,
    versioned_vint,
};
use stormreplay::{ReplayError, Value};

/// Writes a complete extracted archive for the given base build.
fn write_archive(dir: &Path, base_build: u32) {
    fs::write(dir.join(HEADER_FILE), header_blob(base_build)).unwrap();
    fs::write(
        dir.join(SUBSTREAM_DETAILS),
        versioned_struct(vec![
            (0, versioned_blob(b"player list placeholder")),
            (1, versioned_blob(b"Dragon Shire")),
        ]),
    )
    .unwrap();
    fs::write(
        dir.join(SUBSTREAM_INITDATA),
        versioned_struct(vec![(
            0,
            versioned_struct(vec![(0, versioned_vint(5)), (1, versioned_vint(1))]),
        )]),
    )
    .unwrap();
    fs::write(
        dir.join(SUBSTREAM_GAME_EVENTS),
        event_stream(vec![
            event(0, Some(1), 5, versioned_vint(0)),
            event(0, Some(2), 5, versioned_vint(0)),
            event(32, Some(1), 27, versioned_struct(vec![(0, versioned_vint(7))])),
            event(16, Some(2), 49, versioned_vint(0)),
            event(4, Some(1), 27, versioned_vint(1)),
        ]),
    )
    .unwrap();
    fs::write(
        dir.join(SUBSTREAM_MESSAGE_EVENTS),
        event_stream(vec![
            event(0, Some(1), 0, versioned_blob(b"gl hf")),
            event(480, Some(2), 0, versioned_blob(b"gg")),
            event(0, Some(2), 1, versioned_struct(vec![(0, versioned_vint(40))])),
        ]),
    )
    .unwrap();
    fs::write(
        dir.join(SUBSTREAM_TRACKER_EVENTS),
        event_stream(vec![
            event(0, None, 9, versioned_vint(1)),
            event(0, None, 9, versioned_vint(2)),
            event(160, None, 1, versioned_blob(b"FootmanMinion")),
            event(0, None, 2, versioned_vint(3)),
        ]),
    )
    .unwrap();
    fs::write(
        dir.join(SUBSTREAM_ATTRIBUTES_EVENTS),
        attributes_stream(&[
            (999, 500, 16, "Humn"),
            (999, 3001, 1, "Medi"),
            (999, 3001, 2, "Hard"),
            (999, 3009, 1, "Rand"),
            (999, 4002, 16, "5v5"),
        ]),
    )
    .unwrap();
}

#[test]
fn test_full_pipeline_with_tracker_build() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path(), 32455);

    let mut session = ReplaySession::open(DirArchive::open(dir.path()).unwrap()).unwrap();
    assert_eq!(session.base_build(), 32455);
    assert!(session.protocol().supports_tracker_events());

    session.load(&LoadSelection::default()).unwrap();

    // Details
    let details = session.details.as_ref().unwrap();
    assert_eq!(details.field(1).and_then(Value::as_str), Some("Dragon Shire"));

    // Init data keeps only the lobby sync record
    let lobby = session.initdata.as_ref().unwrap();
    assert_eq!(lobby.field(0).and_then(Value::as_int), Some(5));

    // Game events bucketed by prefix-stripped kind
    assert_eq!(session.game_events["UserFinishedLoadingSyncEvent"].len(), 2);
    assert_eq!(session.game_events["CmdEvent"].len(), 2);
    assert_eq!(session.game_events["CameraUpdateEvent"].len(), 1);
    let total: usize = session.game_events.values().map(Vec::len).sum();
    assert_eq!(total, 5);

    // Message events share the game-event prefix
    assert_eq!(session.message_events["ChatMessage"].len(), 2);
    assert_eq!(session.message_events["ChatMessage"][1].payload.as_str(), Some("gg"));
    assert_eq!(session.message_events["PingMessage"].len(), 1);

    // Tracker events use the longer tracker prefix
    assert_eq!(session.tracker_events["PlayerSetupEvent"].len(), 2);
    assert_eq!(session.tracker_events["UnitBornEvent"].len(), 1);
    assert_eq!(session.tracker_events["UnitDiedEvent"].len(), 1);

    // Attributes stay flat and ordered
    assert_eq!(session.attributes.len(), 5);
    assert_eq!(session.attributes[0].value, "Humn");
    assert_eq!(session.attributes[4].value, "5v5");
}

#[test]
fn test_attributes_only_load_for_base_build_29406() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path(), 29406);

    let mut session = ReplaySession::open(DirArchive::open(dir.path()).unwrap()).unwrap();
    assert_eq!(session.base_build(), 29406);

    session.load_attributes().unwrap();

    // Exactly the five records, in original order
    assert_eq!(session.attributes.len(), 5);
    let values: Vec<&str> = session.attributes.iter().map(|a| a.value.as_str()).collect();
    assert_eq!(values, ["Humn", "Medi", "Hard", "Rand", "5v5"]);
    assert_eq!(session.attributes[0].id, 500);
    assert_eq!(session.attributes[0].scope, 16);

    // No other field is touched
    assert!(session.details.is_none());
    assert!(session.initdata.is_none());
    assert!(session.game_events.is_empty());
    assert!(session.message_events.is_empty());
    assert!(session.tracker_events.is_empty());
}

#[test]
fn test_tracker_load_is_noop_for_old_build() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path(), 29406);

    let mut session = ReplaySession::open(DirArchive::open(dir.path()).unwrap()).unwrap();
    assert!(!session.protocol().supports_tracker_events());

    // The sub-stream exists on disk, but the build predates tracker
    // events, so the load succeeds without reading it
    session.load_tracker_events().unwrap();
    assert!(session.tracker_events.is_empty());
}

#[test]
fn test_unsupported_build_fails_before_any_load() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path(), 20000);

    let result = ReplaySession::open(DirArchive::open(dir.path()).unwrap());
    match result {
        Err(ReplayError::UnsupportedProtocol { base_build }) => assert_eq!(base_build, 20000),
        other => panic!("Expected UnsupportedProtocol, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_substream_fails_only_that_load() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path(), 30829);
    fs::remove_file(dir.path().join(SUBSTREAM_MESSAGE_EVENTS)).unwrap();

    let mut session = ReplaySession::open(DirArchive::open(dir.path()).unwrap()).unwrap();

    match session.load(&LoadSelection::default()) {
        Err(ReplayError::MissingSubstream { name }) => {
            assert_eq!(name, SUBSTREAM_MESSAGE_EVENTS);
        }
        other => panic!("Expected MissingSubstream, got {:?}", other.err()),
    }

    // Operations ordered before the failure already completed
    assert!(session.details.is_some());
    assert!(!session.game_events.is_empty());

    // And later operations still work individually
    session.load_attributes().unwrap();
    assert_eq!(session.attributes.len(), 5);
}

#[test]
fn test_corrupt_substream_reports_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path(), 29406);
    fs::write(dir.path().join(SUBSTREAM_DETAILS), [0xFF, 0x00, 0x12]).unwrap();

    let mut session = ReplaySession::open(DirArchive::open(dir.path()).unwrap()).unwrap();
    assert!(matches!(
        session.load_details(),
        Err(ReplayError::ProtocolDecode { .. })
    ));
    assert!(session.details.is_none());
}

#[test]
fn test_close_releases_the_archive() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path(), 29406);

    let mut session = ReplaySession::open(DirArchive::open(dir.path()).unwrap()).unwrap();
    session.load_details().unwrap();
    session.close();

    assert!(session.is_closed());
    assert!(matches!(
        session.load_attributes(),
        Err(ReplayError::SessionClosed)
    ));
    assert!(session.attributes.is_empty());
    assert!(session.details.is_some());
}

#[test]
fn test_repeat_load_replaces_field() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path(), 29406);

    let mut session = ReplaySession::open(DirArchive::open(dir.path()).unwrap()).unwrap();
    session.load_game_events().unwrap();
    let first_total: usize = session.game_events.values().map(Vec::len).sum();

    // Shrink the on-disk stream and reload: the field must be replaced
    // wholesale, not appended to
    fs::write(
        dir.path().join(SUBSTREAM_GAME_EVENTS),
        event_stream(vec![event(0, Some(1), 27, versioned_vint(0))]),
    )
    .unwrap();
    session.load_game_events().unwrap();
    let second_total: usize = session.game_events.values().map(Vec::len).sum();

    assert_eq!(first_total, 5);
    assert_eq!(second_total, 1);
}

#[test]
fn test_malformed_archive_directory() {
    let result = DirArchive::open("/definitely/not/a/replay");
    assert!(matches!(result, Err(ReplayError::ArchiveOpen { .. })));
}
