pub mod tournament;

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use crate::domain::{Game, UserId};

/// Producer of the raw ladder history. Implementations fetch all games on a
/// ladder after its cutoff date; ordering is not required.
pub trait GameSource {
    fn fetch_games(&self, ladder: &str) -> Result<Vec<Game>>;
}

/// Identity side-channel used by the duplicate-account resolver.
pub trait IdentityHints {
    /// Accounts sharing the user's most recent IP address.
    fn hints(&self, user_id: UserId) -> Result<BTreeSet<UserId>>;

    /// The display alias of the account, if any.
    fn alias(&self, user_id: UserId) -> Result<Option<String>>;

    /// The plain account name. Purely cosmetic; used for logging and the
    /// alias fallback.
    fn account_name(&self, _user_id: UserId) -> Result<Option<String>> {
        Ok(None)
    }

    /// A precomputed primary-account mapping. Only consulted when the
    /// resolver runs with `DuplicatePolicy::UsePrimaryMapping`.
    fn primary_mapping(&self, user_ids: &[UserId]) -> Result<BTreeMap<UserId, UserId>>;
}

/// One row of the final rating table.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRow {
    pub user_id: UserId,
    pub ladder: String,
    pub elo: f64,
    pub deviation: f64,
    pub active_rank: Option<u32>,
    pub alltime_rank: Option<u32>,
    pub rated_games: u32,
    pub is_active: bool,
}

/// Consumer of the final ratings. The write must be transactional: delete
/// all existing rows for the ladder and insert the new set as a single unit.
pub trait RatingSink {
    fn write_ratings(&mut self, ladder: &str, rows: &[RatingRow]) -> Result<()>;
}
