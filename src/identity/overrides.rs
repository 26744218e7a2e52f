//! Manual corrections to the IP-proximity duplicate detection. The ladder
//! staff maintains this table; entries are added when the automatic
//! detection links strangers (shared LAN, internet cafe) or misses a known
//! smurf. Both directions are load-bearing for the published rankings.

use crate::domain::UserId;

/// Accounts known to belong to the same player even though the automatic
/// detection does not link them.
pub const KNOWN_EQUIVALENCES: [(UserId, &[UserId]); 3] = [
    (17221, &[58868]),
    (36141, &[60864, 55403]),
    (51203, &[58860]),
];

/// Accounts the automatic detection links to other players even though they
/// are known to be distinct. These caused the ratings to mess up in the
/// past; their edges are removed entirely.
pub const KNOWN_NON_EQUIVALENCES: [UserId; 3] = [21, 39603, 70820];
