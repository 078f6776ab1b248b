//! Synthetic wire-data builders shared by unit and integration tests.
//!
//! These helpers encode the tagged serialization described in [`crate::wire`]
//! so tests can assemble well-formed headers, event streams and attribute
//! blocks without fixture files. Not part of the public API.
#![doc(hidden)]
#![allow(missing_docs)]

/// Encodes a variable-length signed integer.
#[must_use]
pub fn vint(value: i64) -> Vec<u8> {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();

    let mut byte = u8::from(negative) | ((magnitude & 0x3F) << 1) as u8;
    magnitude >>= 6;

    let mut out = Vec::new();
    while magnitude != 0 {
        out.push(byte | 0x80);
        byte = (magnitude & 0x7F) as u8;
        magnitude >>= 7;
    }
    out.push(byte);
    out
}

/// Encodes a tagged variable-length integer value.
#[must_use]
pub fn versioned_vint(value: i64) -> Vec<u8> {
    let mut out = vec![0x09];
    out.extend_from_slice(&vint(value));
    out
}

/// Encodes a tagged blob value.
#[must_use]
pub fn versioned_blob(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0x02];
    out.extend_from_slice(&vint(data.len() as i64));
    out.extend_from_slice(data);
    out
}

/// Encodes a tagged array value from pre-encoded elements.
#[must_use]
pub fn versioned_array(items: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = vec![0x00];
    out.extend_from_slice(&vint(items.len() as i64));
    for item in items {
        out.extend_from_slice(&item);
    }
    out
}

/// Encodes a tagged struct value from pre-encoded `(field tag, value)` pairs.
#[must_use]
pub fn versioned_struct(fields: Vec<(u32, Vec<u8>)>) -> Vec<u8> {
    let mut out = vec![0x05];
    out.extend_from_slice(&vint(fields.len() as i64));
    for (tag, value) in fields {
        out.extend_from_slice(&vint(i64::from(tag)));
        out.extend_from_slice(&value);
    }
    out
}

/// Encodes a tagged optional value.
#[must_use]
pub fn versioned_optional(inner: Option<Vec<u8>>) -> Vec<u8> {
    match inner {
        Some(value) => {
            let mut out = vec![0x04, 0x01];
            out.extend_from_slice(&value);
            out
        }
        None => vec![0x04, 0x00],
    }
}

/// Builds a header blob carrying the given base build.
///
/// Shape matches the fixed header decoder: field 0 signature, field 1
/// version struct (major/minor/revision/build/baseBuild), field 3
/// elapsed game loops.
#[must_use]
pub fn header_blob(base_build: u32) -> Vec<u8> {
    versioned_struct(vec![
        (0, versioned_blob(b"Heroes of the Storm replay\x1b11")),
        (
            1,
            versioned_struct(vec![
                (0, versioned_vint(1)),
                (1, versioned_vint(0)),
                (2, versioned_vint(9)),
                (3, versioned_vint(1)),
                (4, versioned_vint(i64::from(base_build) + 100)),
                (5, versioned_vint(i64::from(base_build))),
            ]),
        ),
        (2, versioned_vint(2)),
        (3, versioned_vint(10_000)),
    ])
}

/// Encodes one event for the built-in event-stream framing.
///
/// Field 0 is the game-loop delta, field 1 the issuing user, field 2 the
/// event id, field 3 the payload.
#[must_use]
pub fn event(delta: i64, user_id: Option<i64>, event_id: i64, payload: Vec<u8>) -> Vec<u8> {
    versioned_struct(vec![
        (0, versioned_vint(delta)),
        (1, versioned_optional(user_id.map(versioned_vint))),
        (2, versioned_vint(event_id)),
        (3, payload),
    ])
}

/// Concatenates encoded events into a sub-stream.
#[must_use]
pub fn event_stream(events: Vec<Vec<u8>>) -> Vec<u8> {
    events.concat()
}

/// Builds a `replay.attributes.events` sub-stream.
///
/// Layout: u8 source, u32 map namespace, u32 count, then per attribute
/// u32 namespace, u32 id, u8 scope and a reversed four-byte value.
#[must_use]
pub fn attributes_stream(attributes: &[(u32, u32, u8, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(0); // source
    out.extend_from_slice(&999u32.to_le_bytes()); // map namespace
    out.extend_from_slice(&(attributes.len() as u32).to_le_bytes());

    for &(namespace, id, scope, value) in attributes {
        out.extend_from_slice(&namespace.to_le_bytes());
        out.extend_from_slice(&id.to_le_bytes());
        out.push(scope);

        let mut raw = [0u8; 4];
        for (slot, byte) in raw.iter_mut().zip(value.bytes()) {
            *slot = byte;
        }
        raw.reverse();
        out.extend_from_slice(&raw);
    }

    out
}
