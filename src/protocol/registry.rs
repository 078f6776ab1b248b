//! The static base-build to decoder registry.
//!
//! The set of supported builds is a closed table fixed at compile time;
//! it is not extensible at runtime by configuration. Resolving a build
//! that is not in the table is a normal, typed error
//! ([`ReplayError::UnsupportedProtocol`]) that callers surface to the
//! end user, since only a newer decoder release can help.

use crate::error::{ReplayError, Result};

use super::builds::BuildProtocol;
use super::ProtocolDecoder;

/// Every base build with a registered decoder, ascending.
pub const SUPPORTED_BUILDS: [u32; 6] = [29406, 30414, 30829, 31726, 32455, 34053];

/// One static decoder instance per supported build.
static PROTOCOLS: [BuildProtocol; 6] = [
    BuildProtocol::new(29406),
    BuildProtocol::new(30414),
    BuildProtocol::new(30829),
    BuildProtocol::new(31726),
    BuildProtocol::new(32455),
    BuildProtocol::new(34053),
];

/// Resolves a base build number to its protocol decoder.
///
/// Deterministic lookup with no side effects; the returned decoder is a
/// shared static, safe to use from any number of sessions.
///
/// # Errors
///
/// Returns `ReplayError::UnsupportedProtocol` carrying the offending
/// build number when no decoder is registered for it.
///
/// # Example
///
/// ```
/// use stormreplay::protocol::registry;
///
/// let decoder = registry::resolve(29406).unwrap();
/// assert_eq!(decoder.base_build(), 29406);
///
/// assert!(registry::resolve(1).is_err());
/// ```
pub fn resolve(base_build: u32) -> Result<&'static dyn ProtocolDecoder> {
    PROTOCOLS
        .iter()
        .find(|protocol| protocol.base_build() == base_build)
        .map(|protocol| protocol as &dyn ProtocolDecoder)
        .ok_or(ReplayError::UnsupportedProtocol { base_build })
}

/// Returns whether a base build has a registered decoder.
#[must_use]
pub fn is_supported(base_build: u32) -> bool {
    SUPPORTED_BUILDS.contains(&base_build)
}
