//! Running expected-vs-actual win tallies. Finalization grades the actual
//! win rate against the expected one by translating both into elo
//! differences via a precomputed lookup table.

use std::sync::OnceLock;

use chrono::NaiveDate;

use crate::rating::glicko::{Rating, INITIAL_DEVIATION, INITIAL_VOLATILITY};

const TABLE_SIZE: usize = 10_000;

/// Elo difference for each winning probability between 0.0000 and 0.9999,
/// measured against a baseline rating. Built once, immutable afterwards.
static ELO_DIFFERENCE: OnceLock<Vec<f64>> = OnceLock::new();

fn elo_difference_table() -> &'static [f64] {
    ELO_DIFFERENCE.get_or_init(|| {
        let mut table = vec![0.0; TABLE_SIZE];
        let baseline = Rating::default().to_array();

        let mut current = 0.0;
        while current <= 3000.0 {
            let rating = Rating::from_elo(current, INITIAL_DEVIATION, INITIAL_VOLATILITY);
            let winning_probability = rating.e_star(&baseline, 0.0);

            let slot = (winning_probability * TABLE_SIZE as f64 + 0.5) as usize;
            table[slot.min(TABLE_SIZE - 1)] = current - crate::rating::glicko::INITIAL_RATING;

            current += 0.01;
        }

        table
    })
}

fn lookup(probability: f64) -> f64 {
    let slot = (probability * TABLE_SIZE as f64 + 0.5) as usize;
    elo_difference_table()[slot.min(TABLE_SIZE - 1)]
}

/// Win probability against an even opponent that corresponds to performing
/// `actual` where `expected` was predicted.
fn normalize(expected: f64, actual: f64, wins: u32, games: u32) -> f64 {
    if games == wins {
        return 1.0;
    }
    if wins == 0 {
        return 0.0;
    }

    let elo_difference = lookup(actual) - lookup(expected);
    let baseline = Rating::default();
    baseline.e_star(&baseline.to_array(), elo_difference)
}

/// Snapshot of a tracker up to a given date.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbResult {
    pub games: u32,
    pub wins: u32,
    pub expected: f64,
    pub actual: f64,
    pub normalized: f64,
    pub last_game: Option<NaiveDate>,
}

/// Append-only list of (win probability, date, outcome) entries.
#[derive(Debug, Clone, Default)]
pub struct Probabilities {
    winning_probabilities: Vec<f64>,
    dates: Vec<NaiveDate>,
    win_flags: Vec<bool>,
    wins: u32,

    expected: f64,
    actual: f64,
    normalized: f64,
    finalized: bool,
}

impl Probabilities {
    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.count() - self.wins
    }

    pub fn count(&self) -> u32 {
        self.winning_probabilities.len() as u32
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Record one game with the expected winning probability at that time.
    pub fn add_game(&mut self, winning_probability: f64, date: NaiveDate, is_win: bool) {
        assert!(
            !self.finalized,
            "trying to add a game to a finalized tracker"
        );

        self.winning_probabilities.push(winning_probability);
        self.dates.push(date);
        self.win_flags.push(is_win);

        if is_win {
            self.wins += 1;
        }
    }

    /// The result restricted to games played up to (and including) `date`.
    pub fn result_up_to(&self, date: NaiveDate) -> ProbResult {
        let mut result = ProbResult::default();

        for (i, &probability) in self.winning_probabilities.iter().enumerate() {
            if self.dates[i] > date {
                break;
            }
            result.expected += probability;
            result.games += 1;
            result.wins += u32::from(self.win_flags[i]);
            result.last_game = Some(self.dates[i]);
        }

        if result.games == 0 {
            return result;
        }

        result.expected /= f64::from(result.games);
        result.actual = f64::from(result.wins) / f64::from(result.games);
        result.normalized = normalize(result.expected, result.actual, result.wins, result.games);

        result
    }

    pub fn finalize(&mut self) {
        self.finalized = true;

        if self.winning_probabilities.is_empty() {
            return;
        }

        self.expected = self.winning_probabilities.iter().sum::<f64>()
            / self.winning_probabilities.len() as f64;

        let games = self.count();
        self.actual = f64::from(self.wins) / f64::from(games);
        self.normalized = normalize(self.expected, self.actual, self.wins, games);
    }

    pub fn expected(&self) -> f64 {
        assert!(self.finalized, "tracker is not finalized");
        self.expected
    }

    pub fn actual(&self) -> f64 {
        assert!(self.finalized, "tracker is not finalized");
        self.actual
    }

    /// The normalized win rate against a median opponent.
    pub fn result(&self) -> f64 {
        assert!(self.finalized, "tracker is not finalized");
        self.normalized
    }

    /// The normalized result expressed as an elo difference.
    pub fn elo_difference(&self) -> f64 {
        assert!(self.finalized, "tracker is not finalized");
        -400.0 * ((1.0 / self.normalized) - 1.0).log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn table_is_anchored_at_even_odds() {
        // A 50% winning probability corresponds to no rating difference.
        assert!(lookup(0.5).abs() < 1.0);
        assert!(lookup(0.75) > 100.0);
        assert!(lookup(0.25) < -100.0);
    }

    #[test]
    fn all_wins_normalize_to_one_and_all_losses_to_zero() {
        let mut wins_only = Probabilities::default();
        let mut losses_only = Probabilities::default();
        for i in 1..=4 {
            wins_only.add_game(0.3, date(i), true);
            losses_only.add_game(0.7, date(i), false);
        }
        wins_only.finalize();
        losses_only.finalize();

        assert_eq!(wins_only.result(), 1.0);
        assert_eq!(losses_only.result(), 0.0);
    }

    #[test]
    fn overperforming_normalizes_above_half() {
        let mut probs = Probabilities::default();
        // Expected to win 40%, actually won 3 out of 4.
        for (i, win) in [true, true, true, false].iter().enumerate() {
            probs.add_game(0.4, date(i as u32 + 1), *win);
        }
        probs.finalize();

        assert!(probs.result() > 0.5);
        assert!(probs.result() < 1.0);
        assert!(probs.elo_difference() > 0.0);
    }

    #[test]
    fn normalized_stays_within_bounds() {
        let mut probs = Probabilities::default();
        for (i, win) in [false, true, false, false, true].iter().enumerate() {
            probs.add_game(0.8, date(i as u32 + 1), *win);
        }
        probs.finalize();

        assert!(probs.result() > 0.0 && probs.result() < 1.0);
        assert_eq!(probs.wins(), 2);
        assert_eq!(probs.losses(), 3);
    }

    #[test]
    fn point_in_time_query_restricts_by_date() {
        let mut probs = Probabilities::default();
        probs.add_game(0.5, date(1), true);
        probs.add_game(0.5, date(2), true);
        probs.add_game(0.5, date(10), false);

        let early = probs.result_up_to(date(2));
        assert_eq!(early.games, 2);
        assert_eq!(early.wins, 2);
        assert_eq!(early.normalized, 1.0);
        assert_eq!(early.last_game, Some(date(2)));

        let full = probs.result_up_to(date(20));
        assert_eq!(full.games, 3);
        assert!(full.normalized < 1.0);
    }

    #[test]
    fn empty_query_yields_zeroes() {
        let probs = Probabilities::default();
        let result = probs.result_up_to(date(1));
        assert_eq!(result.games, 0);
        assert_eq!(result.last_game, None);
    }

    #[test]
    #[should_panic]
    fn adding_after_finalize_panics() {
        let mut probs = Probabilities::default();
        probs.finalize();
        probs.add_game(0.5, date(1), true);
    }
}
