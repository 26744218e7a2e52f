//! Duplicate-account resolution: builds an equivalence graph over the
//! accounts seen in the raw games and maps every member of a component onto
//! a single primary account.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use anyhow::Result;

use crate::domain::UserId;
use crate::identity::overrides;
use crate::sources::IdentityHints;

/// How duplicate accounts are folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Build the equivalence graph from IP-proximity hints plus the manual
    /// override table. The default.
    UseHints,
    /// Take the precomputed mapping from the source. Ids the mapping does
    /// not cover fall back to themselves.
    UsePrimaryMapping,
    /// Every account is its own primary. Diagnostic runs only.
    Ignore,
}

/// Compute `primary(user) -> user` for every account in `game_counts` (and
/// every account linked to one of them).
pub fn resolve_primaries(
    game_counts: &BTreeMap<UserId, u32>,
    hints: &dyn IdentityHints,
    policy: DuplicatePolicy,
) -> Result<BTreeMap<UserId, UserId>> {
    match policy {
        DuplicatePolicy::Ignore => {
            log::warn!("Duplicates will be ignored. The resulting ranks are meant for testing purposes only.");
            Ok(game_counts.keys().map(|&id| (id, id)).collect())
        }
        DuplicatePolicy::UsePrimaryMapping => resolve_from_mapping(game_counts, hints),
        DuplicatePolicy::UseHints => resolve_from_hints(game_counts, hints),
    }
}

fn resolve_from_mapping(
    game_counts: &BTreeMap<UserId, u32>,
    hints: &dyn IdentityHints,
) -> Result<BTreeMap<UserId, UserId>> {
    let user_ids: Vec<UserId> = game_counts.keys().copied().collect();
    let mapping = hints.primary_mapping(&user_ids)?;

    let mut primaries = BTreeMap::new();
    for &user_id in game_counts.keys() {
        let primary = match mapping.get(&user_id) {
            Some(&primary) => primary,
            None => {
                log::error!("User {user_id} is missing from the precomputed primary mapping.");
                user_id
            }
        };
        primaries.insert(user_id, primary);
    }

    Ok(primaries)
}

fn resolve_from_hints(
    game_counts: &BTreeMap<UserId, u32>,
    hints: &dyn IdentityHints,
) -> Result<BTreeMap<UserId, UserId>> {
    let mut edges: BTreeMap<UserId, BTreeSet<UserId>> = BTreeMap::new();

    fn link(edges: &mut BTreeMap<UserId, BTreeSet<UserId>>, a: UserId, b: UserId) {
        if a != b {
            edges.entry(a).or_default().insert(b);
            edges.entry(b).or_default().insert(a);
        }
    }

    // Pass 1: IP-proximity seed.
    for &user_id in game_counts.keys() {
        for duplicate in hints.hints(user_id)? {
            link(&mut edges, user_id, duplicate);
        }
    }

    // Pass 2: manual overrides. Known equivalences add edges, known
    // non-equivalences are cut out of the graph entirely.
    for (user_id, duplicates) in overrides::KNOWN_EQUIVALENCES {
        for &duplicate in duplicates {
            link(&mut edges, user_id, duplicate);
        }
    }

    for user_id in overrides::KNOWN_NON_EQUIVALENCES {
        if let Some(removed) = edges.remove(&user_id) {
            log::info!("Unlinking user {user_id} from {} suspected duplicates.", removed.len());
        }
        for neighbors in edges.values_mut() {
            neighbors.remove(&user_id);
        }
    }

    // Pass 3: transitive closure over the undirected graph.
    let mut primaries = BTreeMap::new();
    let mut visited: BTreeSet<UserId> = BTreeSet::new();

    let mut all_ids: BTreeSet<UserId> = game_counts.keys().copied().collect();
    all_ids.extend(edges.keys().copied());

    for &start in &all_ids {
        if visited.contains(&start) {
            continue;
        }

        let mut component = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            component.push(current);
            if let Some(neighbors) = edges.get(&current) {
                queue.extend(neighbors.iter().copied());
            }
        }
        component.sort_unstable();

        let representative = select_representative(&component, game_counts, hints)?;
        for member in component {
            primaries.insert(member, representative);
        }
    }

    Ok(primaries)
}

/// An account with an alias wins; otherwise the account with the most games.
/// Ties break towards the lowest id (components are sorted).
fn select_representative(
    component: &[UserId],
    game_counts: &BTreeMap<UserId, u32>,
    hints: &dyn IdentityHints,
) -> Result<UserId> {
    debug_assert!(!component.is_empty());

    for &member in component {
        if hints.alias(member)?.is_some_and(|alias| !alias.is_empty()) {
            return Ok(member);
        }
    }

    let mut best = component[0];
    let mut best_games = game_counts.get(&best).copied().unwrap_or(0);
    for &member in &component[1..] {
        let games = game_counts.get(&member).copied().unwrap_or(0);
        if games > best_games {
            best = member;
            best_games = games;
        }
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubHints {
        edges: BTreeMap<UserId, BTreeSet<UserId>>,
        aliases: BTreeMap<UserId, String>,
        mapping: BTreeMap<UserId, UserId>,
    }

    impl StubHints {
        fn new() -> StubHints {
            StubHints {
                edges: BTreeMap::new(),
                aliases: BTreeMap::new(),
                mapping: BTreeMap::new(),
            }
        }

        fn with_edge(mut self, from: UserId, to: UserId) -> StubHints {
            self.edges.entry(from).or_default().insert(to);
            self
        }

        fn with_alias(mut self, user_id: UserId, alias: &str) -> StubHints {
            self.aliases.insert(user_id, alias.to_string());
            self
        }
    }

    impl IdentityHints for StubHints {
        fn hints(&self, user_id: UserId) -> Result<BTreeSet<UserId>> {
            Ok(self.edges.get(&user_id).cloned().unwrap_or_default())
        }

        fn alias(&self, user_id: UserId) -> Result<Option<String>> {
            Ok(self.aliases.get(&user_id).cloned())
        }

        fn primary_mapping(&self, _user_ids: &[UserId]) -> Result<BTreeMap<UserId, UserId>> {
            Ok(self.mapping.clone())
        }
    }

    fn counts(entries: &[(UserId, u32)]) -> BTreeMap<UserId, u32> {
        entries.iter().copied().collect()
    }

    #[test]
    fn chained_duplicates_fold_onto_the_busiest_account() {
        let hints = StubHints::new().with_edge(10, 20).with_edge(20, 30);
        let counts = counts(&[(10, 5), (20, 15), (30, 2)]);

        let primaries = resolve_primaries(&counts, &hints, DuplicatePolicy::UseHints).unwrap();

        assert_eq!(primaries[&10], 20);
        assert_eq!(primaries[&20], 20);
        assert_eq!(primaries[&30], 20);
    }

    #[test]
    fn every_member_of_a_component_shares_its_primary() {
        let hints = StubHints::new().with_edge(1, 2).with_edge(3, 2).with_edge(7, 8);
        let counts = counts(&[(1, 1), (2, 1), (3, 1), (7, 4), (8, 9), (9, 1)]);

        let primaries = resolve_primaries(&counts, &hints, DuplicatePolicy::UseHints).unwrap();

        assert_eq!(primaries[&1], primaries[&2]);
        assert_eq!(primaries[&2], primaries[&3]);
        assert_eq!(primaries[&7], primaries[&8]);
        assert_ne!(primaries[&1], primaries[&7]);
        assert_eq!(primaries[&9], 9);
    }

    #[test]
    fn an_alias_beats_game_counts() {
        let hints = StubHints::new().with_edge(10, 20).with_alias(10, "Latof");
        let counts = counts(&[(10, 1), (20, 500)]);

        let primaries = resolve_primaries(&counts, &hints, DuplicatePolicy::UseHints).unwrap();

        assert_eq!(primaries[&10], 10);
        assert_eq!(primaries[&20], 10);
    }

    #[test]
    fn game_count_ties_break_to_the_lowest_id() {
        let hints = StubHints::new().with_edge(40, 30);
        let counts = counts(&[(30, 5), (40, 5)]);

        let primaries = resolve_primaries(&counts, &hints, DuplicatePolicy::UseHints).unwrap();
        assert_eq!(primaries[&30], 30);
        assert_eq!(primaries[&40], 30);
    }

    #[test]
    fn non_equivalence_overrides_cut_accounts_loose() {
        // 21 is in the non-equivalence table; its detected link must not
        // fold it into the other account.
        let hints = StubHints::new().with_edge(21, 5000);
        let counts = counts(&[(21, 10), (5000, 90)]);

        let primaries = resolve_primaries(&counts, &hints, DuplicatePolicy::UseHints).unwrap();
        assert_eq!(primaries[&21], 21);
        assert_eq!(primaries[&5000], 5000);
    }

    #[test]
    fn ignore_policy_is_the_identity() {
        let hints = StubHints::new().with_edge(1, 2);
        let counts = counts(&[(1, 3), (2, 4)]);

        let primaries = resolve_primaries(&counts, &hints, DuplicatePolicy::Ignore).unwrap();
        assert_eq!(primaries[&1], 1);
        assert_eq!(primaries[&2], 2);
    }

    #[test]
    fn mapping_policy_falls_back_to_identity_for_missing_ids() {
        let mut hints = StubHints::new();
        hints.mapping.insert(1, 9);
        let counts = counts(&[(1, 3), (2, 4)]);

        let primaries =
            resolve_primaries(&counts, &hints, DuplicatePolicy::UsePrimaryMapping).unwrap();
        assert_eq!(primaries[&1], 9);
        assert_eq!(primaries[&2], 2);
    }

    #[test]
    fn prefolded_input_with_ignore_matches_the_hints_run() {
        // Resolving with hints, then re-running the resolver on the folded
        // ids with Ignore, must agree with the original mapping.
        let hints = StubHints::new().with_edge(10, 20).with_edge(20, 30);
        let raw_counts = counts(&[(10, 5), (20, 15), (30, 2)]);
        let primaries =
            resolve_primaries(&raw_counts, &hints, DuplicatePolicy::UseHints).unwrap();

        let mut folded_counts: BTreeMap<UserId, u32> = BTreeMap::new();
        for (user, games) in &raw_counts {
            *folded_counts.entry(primaries[user]).or_default() += games;
        }

        let no_hints = StubHints::new();
        let folded =
            resolve_primaries(&folded_counts, &no_hints, DuplicatePolicy::Ignore).unwrap();
        for (user, primary) in &folded {
            assert_eq!(primaries[user], *primary);
        }
    }
}
