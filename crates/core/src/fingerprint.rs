//! Tamper-evident fingerprints for attendance sessions and exports.
//!
//! A fingerprint is a SHA-256 hex digest over a canonical, `|`-separated
//! rendering of the inputs. The field order and formatting are fixed and must
//! not change once sessions have been persisted: reconciliation relies on a
//! freshly computed fingerprint matching a stored one byte for byte.

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};

use crate::types::{DbId, Timestamp};

/// Version tag mixed into every session fingerprint.
const SESSION_FINGERPRINT_VERSION: &str = "attendance.v1";

/// Discriminator for sessions whose timestamps were never edited.
pub const MARKER_ORIGINAL: &str = "original";

/// Discriminator for sessions altered by a correction.
pub const MARKER_CORRECTED: &str = "corrected";

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Canonical text form of a timestamp inside fingerprint material.
///
/// Always UTC with a `Z` suffix and exactly six fractional digits.
pub fn canonical_ts(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Fingerprint the logical state of an attendance session.
///
/// A `None` check-out is rendered as the empty string. `corrected` selects the
/// discriminator so that a session corrected back to its original timestamps
/// still hashes differently from one that was never touched.
pub fn session_fingerprint(
    person_id: DbId,
    project_id: DbId,
    check_in_ts: &Timestamp,
    check_out_ts: Option<&Timestamp>,
    corrected: bool,
) -> String {
    let marker = if corrected {
        MARKER_CORRECTED
    } else {
        MARKER_ORIGINAL
    };
    let check_out = check_out_ts.map(canonical_ts).unwrap_or_default();

    let material = format!(
        "{SESSION_FINGERPRINT_VERSION}|{person_id}|{project_id}|{}|{check_out}|{marker}",
        canonical_ts(check_in_ts),
    );
    sha256_hex(material.as_bytes())
}
