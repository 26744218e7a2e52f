//! Glicko-2 arithmetic with the ladder-specific extensions: a cold-start
//! search for one-sided opening batches, and a bounded custom decay curve.

use std::f64::consts::PI;

/// The default/initial rating value. 1500 works best, just like the paper
/// suggests.
pub const INITIAL_RATING: f64 = 1500.0;

/// The default/initial deviation value. Again, the suggested value of 350
/// works best.
pub const INITIAL_DEVIATION: f64 = 350.0;

/// The default/initial volatility value.
pub const INITIAL_VOLATILITY: f64 = 0.06;

/// Scale factor for conversion between Glicko-1 and Glicko-2 units.
pub const SCALE_FACTOR: f64 = 173.7178;

/// The paper states reasonable choices are between 0.3 and 1.2; 0.5 gave the
/// best prediction accuracy on ladder data.
pub const TAU: f64 = 0.5;

/// The convergence constant aka epsilon.
pub const CONVERGENCE: f64 = 0.000001;

/// Extension to make Glicko-2 work with team games: exponent determining a
/// player's share of a 2v2 win/loss. Tuned on thousands of games.
pub const TEAM_SHARE_EXPONENT: f64 = 1.11;

/// `(mu, phi, sigma)` in internal Glicko-2 units.
pub type RatingTriple = [f64; 3];

pub const MU: usize = 0;
pub const PHI: usize = 1;

/// How a rating update is computed. New players walk through
/// `Initial -> SingleStep -> Special -> Normal` depending on how one-sided
/// their opening batches are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationType {
    Initial,
    SingleStep,
    Special,
    Normal,
    AutoSelect,
}

/// Rating based on the Glicko-2 rating system. Updates land in a pending
/// triple which `apply` commits at the end of a rating period.
#[derive(Debug, Clone)]
pub struct Rating {
    rating: f64,
    deviation: f64,
    volatility: f64,

    pending_rating: f64,
    pending_deviation: f64,
    pending_volatility: f64,

    /// Games since the last decay check.
    games: u32,
    pending_games: u32,

    calculation_type: CalculationType,
}

impl Default for Rating {
    fn default() -> Rating {
        Rating::from_elo(INITIAL_RATING, INITIAL_DEVIATION, INITIAL_VOLATILITY)
    }
}

impl Rating {
    /// Create a rating from human-readable elo units.
    pub fn from_elo(elo: f64, elo_deviation: f64, volatility: f64) -> Rating {
        Rating::from_internal(
            (elo - INITIAL_RATING) / SCALE_FACTOR,
            elo_deviation / SCALE_FACTOR,
            volatility,
        )
    }

    /// Create a rating from internal Glicko-2 units.
    pub fn from_internal(rating: f64, deviation: f64, volatility: f64) -> Rating {
        Rating {
            rating,
            deviation,
            volatility,
            pending_rating: rating,
            pending_deviation: deviation,
            pending_volatility: volatility,
            games: 0,
            pending_games: 0,
            calculation_type: CalculationType::Initial,
        }
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn deviation(&self) -> f64 {
        self.deviation
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn elo(&self) -> f64 {
        self.rating * SCALE_FACTOR + INITIAL_RATING
    }

    pub fn pending_elo(&self) -> f64 {
        self.pending_rating * SCALE_FACTOR + INITIAL_RATING
    }

    pub fn elo_deviation(&self) -> f64 {
        self.deviation * SCALE_FACTOR
    }

    pub fn games(&self) -> u32 {
        self.games
    }

    pub fn pending_games(&self) -> u32 {
        self.pending_games
    }

    pub fn calculation_type(&self) -> CalculationType {
        self.calculation_type
    }

    pub fn to_array(&self) -> RatingTriple {
        [self.rating, self.deviation, self.volatility]
    }

    /// Weight factor g from the paper.
    fn g(&self, deviation: f64) -> f64 {
        let scale = deviation / PI;
        1.0 / (1.0 + 3.0 * scale * scale).sqrt()
    }

    /// Expectation value E with the opponent-deviation weighting applied.
    fn e(&self, opponent: &RatingTriple) -> f64 {
        let exponent = -1.0 * self.g(opponent[PHI]) * (self.rating - opponent[MU]);
        1.0 / (1.0 + exponent.exp())
    }

    /// Expected win rate without the deviation weighting. `elo_addition` is
    /// a rating handicap in elo units.
    pub fn e_star(&self, opponent: &RatingTriple, elo_addition: f64) -> f64 {
        let exponent = -1.0 * (self.rating + elo_addition / SCALE_FACTOR - opponent[MU]);
        1.0 / (1.0 + exponent.exp())
    }

    fn variance(&self, opponents: &[RatingTriple]) -> f64 {
        let mut variance = 0.0;
        for opponent in opponents {
            let e = self.e(opponent);
            variance += self.g(opponent[PHI]).powi(2) * e * (1.0 - e);
        }
        1.0 / variance
    }

    fn delta(&self, opponents: &[RatingTriple], results: &[f64], variance: f64) -> f64 {
        let mut delta = 0.0;
        for (opponent, result) in opponents.iter().zip(results) {
            delta += self.g(opponent[PHI]) * (result - self.e(opponent));
        }
        delta * variance
    }

    /// Step 5 of the paper: solve for the new volatility with the Illinois
    /// method. The iteration does not converge for some pathological
    /// batches, so epsilon is relaxed whenever the step count runs away.
    fn next_volatility(&self, opponents: &[RatingTriple], results: &[f64], variance: f64) -> f64 {
        let delta = self.delta(opponents, results, variance);
        let phi_sq = self.deviation * self.deviation;

        let a = self.volatility.powi(2).ln();
        let f = |x: f64| {
            x.exp() * (delta.powi(2) - phi_sq - variance - x.exp())
                / (2.0 * (phi_sq + variance + x.exp()).powi(2))
                - (x - a) / TAU.powi(2)
        };

        let mut big_a = a;
        let mut big_b = if delta.powi(2) > phi_sq + variance {
            (delta.powi(2) - phi_sq - variance).ln()
        } else {
            let mut k = 1.0;
            while f(a - k * TAU) < 0.0 {
                k += 1.0;
            }
            a - k * TAU
        };

        let mut f_a = f(big_a);
        let mut f_b = f(big_b);

        let mut steps: u32 = 0;
        let mut convergence = CONVERGENCE;

        while (big_b - big_a).abs() > convergence {
            let big_c = big_a + (big_a - big_b) * f_a / (f_b - f_a);
            let f_c = f(big_c);
            if f_c * f_b < 0.0 {
                big_a = big_b;
                f_a = f_b;
            } else {
                f_a /= 2.0;
            }
            big_b = big_c;
            f_b = f_c;
            steps += 1;
            if steps > 100_000 {
                steps = 0;
                convergence *= 10.0;
            }
        }

        (big_a / 2.0).exp()
    }

    /// One standard batched Glicko-2 step into the pending triple.
    fn update_batch(&mut self, opponents: &[RatingTriple], results: &[f64]) {
        let variance = self.variance(opponents);

        self.pending_volatility = self.next_volatility(opponents, results, variance);
        let pre_deviation =
            (self.deviation.powi(2) + self.pending_volatility.powi(2)).sqrt();
        self.pending_deviation =
            1.0 / ((1.0 / pre_deviation.powi(2)) + (1.0 / variance)).sqrt();

        let mut sum = 0.0;
        for (opponent, result) in opponents.iter().zip(results) {
            sum += self.g(opponent[PHI]) * (result - self.e(opponent));
        }

        self.pending_rating += self.pending_deviation.powi(2) * sum;

        self.pending_games += 1;
        self.games += 1;
    }

    /// Cold-start path for one-sided batches: apply the standard step once
    /// per game sequentially on a scratch copy. The batched update supplies
    /// the pending deviation and volatility; the sequential walk supplies the
    /// pending rating.
    fn update_single_steps(&mut self, opponents: &[RatingTriple], results: &[f64]) {
        debug_assert_eq!(opponents.len(), results.len());

        let mut sequential = self.clone();
        for (opponent, result) in opponents.iter().zip(results) {
            sequential.update_batch(&[*opponent], &[*result]);
            sequential.apply();
        }

        self.update_batch(opponents, results);
        self.pending_rating = sequential.pending_rating;
    }

    /// Transition path: run the batched update, then replace (or best-of)
    /// the pending rating with the search-refined opening rating.
    fn update_with_search(&mut self, opponents: &[RatingTriple], results: &[f64], use_best: bool) {
        debug_assert_eq!(opponents.len(), results.len());

        self.update_batch(opponents, results);

        log::debug!(
            "Try to find better rating than [{:.1};{:.1}].",
            self.pending_elo(),
            self.pending_deviation * SCALE_FACTOR
        );

        let better_elo = self.search_initial_elo(opponents, results);
        let candidate = (better_elo - INITIAL_RATING) / SCALE_FACTOR;

        self.pending_rating = if use_best {
            self.pending_rating.max(candidate)
        } else {
            candidate
        };

        log::debug!(
            "Better rating is [{:.1};{:.1}].",
            self.pending_elo(),
            self.pending_deviation * SCALE_FACTOR
        );
    }

    /// Find a decent opening rating for a player whose first batches are
    /// heavily one-sided; plain Glicko-2 converges too slowly there. Sweeps
    /// candidate elos coarse-to-fine and keeps the candidate whose
    /// post-update elo is closest to itself (fixed-point heuristic).
    fn search_initial_elo(&self, opponents: &[RatingTriple], results: &[f64]) -> f64 {
        let mut best_diff = f64::MAX;
        let mut improved_elo = INITIAL_RATING;

        let probe = |candidate: f64, best_diff: &mut f64, improved_elo: &mut f64| {
            let mut rating = Rating::from_elo(candidate, INITIAL_DEVIATION, INITIAL_VOLATILITY);
            rating.update_single_steps(opponents, results);
            rating.apply();

            let diff = (candidate - rating.elo()).abs();
            if diff < *best_diff {
                *best_diff = diff;
                *improved_elo = rating.elo();
            }
        };

        let mut current = 3000.0;
        while current > 100.0 {
            probe(current, &mut best_diff, &mut improved_elo);
            current -= 100.0;
        }

        let mut current = improved_elo + 50.0;
        let destination = improved_elo - 50.0;
        while current > destination {
            probe(current, &mut best_diff, &mut improved_elo);
            current -= 10.0;
        }

        let mut current = improved_elo + 5.0;
        let destination = improved_elo - 5.0;
        while current > destination {
            probe(current, &mut best_diff, &mut improved_elo);
            current -= 1.0;
        }

        improved_elo
    }

    /// Update the rating with a batch of games. The calculation mode is
    /// normally auto-selected from the current state and the batch shape.
    /// Returns the mode that was applied.
    pub fn update(
        &mut self,
        opponents: &[RatingTriple],
        results: &[f64],
        calculation_type: CalculationType,
    ) -> CalculationType {
        if self.elo_deviation() < 200.0 || calculation_type == CalculationType::Normal {
            self.update_batch(opponents, results);
            self.calculation_type = CalculationType::Normal;
            CalculationType::Normal
        } else if (self.elo_deviation() <= 200.0
            && self.calculation_type == CalculationType::SingleStep
            && has_wins_and_losses(results))
            || calculation_type == CalculationType::Special
        {
            // Moving from single-step to the transition calculation.
            self.update_with_search(opponents, results, false);
            self.calculation_type = CalculationType::Normal;
            CalculationType::Special
        } else if self.elo_deviation() > 200.0 && has_wins_and_losses(results) {
            self.update_with_search(opponents, results, true);
            self.calculation_type = CalculationType::Special;
            CalculationType::Special
        } else {
            self.update_single_steps(opponents, results);
            self.calculation_type = CalculationType::SingleStep;
            CalculationType::SingleStep
        }
    }

    /// Commit the pending triple.
    pub fn apply(&mut self) {
        self.volatility = self.pending_volatility;
        self.deviation = self.pending_deviation;
        self.rating = self.pending_rating;
        self.pending_games = 0;
    }

    /// Called after each rating period the faction played no games in.
    /// The first idle period only clears the game counter; after that the
    /// deviation grows along a bounded curve, slower than the canonical
    /// `sqrt(phi^2 + sigma^2)`.
    pub fn decay(&mut self, was_active: bool, factor: f64, max_deviation_after_active: f64) {
        if self.games == 0 {
            let cap = if was_active {
                max_deviation_after_active
            } else {
                INITIAL_DEVIATION
            };

            let mut true_deviation = self.deviation * SCALE_FACTOR;
            true_deviation = f64::min(
                cap,
                true_deviation + (true_deviation.ln() / factor.ln()).powf(factor) / 100.0,
            );

            self.deviation = true_deviation / SCALE_FACTOR;
        } else {
            self.games = 0;
        }
    }
}

/// Does the batch contain wins and losses? Draws count as neither.
pub fn has_wins_and_losses(results: &[f64]) -> bool {
    let has_wins = results.iter().any(|&r| r > 0.5);
    let has_losses = results.iter().any(|&r| r < 0.5);
    has_wins && has_losses
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_triple() -> RatingTriple {
        Rating::default().to_array()
    }

    #[test]
    fn even_opponents_expect_half() {
        let rating = Rating::default();
        assert!((rating.e_star(&default_triple(), 0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn e_star_handicap_shifts_expectation() {
        let rating = Rating::default();
        assert!(rating.e_star(&default_triple(), 200.0) > 0.5);
        assert!(rating.e_star(&default_triple(), -200.0) < 0.5);
    }

    #[test]
    fn a_win_and_a_loss_are_symmetric_for_equal_players() {
        let mut winner = Rating::default();
        let mut loser = Rating::default();

        winner.update(&[default_triple()], &[1.0], CalculationType::Normal);
        loser.update(&[default_triple()], &[0.0], CalculationType::Normal);
        winner.apply();
        loser.apply();

        assert!(winner.elo() > INITIAL_RATING);
        assert!(loser.elo() < INITIAL_RATING);
        assert!((winner.elo() - INITIAL_RATING - (INITIAL_RATING - loser.elo())).abs() < 1e-6);
        assert!(winner.elo_deviation() < INITIAL_DEVIATION);
        assert!(loser.elo_deviation() < INITIAL_DEVIATION);
        assert!(winner.elo().is_finite() && winner.elo_deviation().is_finite());
    }

    #[test]
    fn losses_only_stay_in_single_step_and_descend() {
        let mut rating = Rating::default();
        let mut previous_elo = rating.elo();

        // Two rounds of four losses keep the deviation above the 200
        // threshold, so both rounds stay on the single-step path.
        for _ in 0..2 {
            let batch = vec![default_triple(); 4];
            let results = vec![0.0; 4];
            let applied = rating.update(&batch, &results, CalculationType::AutoSelect);
            assert_eq!(applied, CalculationType::SingleStep);
            rating.apply();
            assert!(rating.elo() < previous_elo);
            previous_elo = rating.elo();
        }

        assert_eq!(rating.calculation_type(), CalculationType::SingleStep);
    }

    #[test]
    fn cold_start_losses_settle_in_a_plausible_band() {
        let mut rating = Rating::default();
        let batch = vec![default_triple(); 10];
        let results = vec![0.0; 10];

        let applied = rating.update(&batch, &results, CalculationType::AutoSelect);
        rating.apply();

        assert_eq!(applied, CalculationType::SingleStep);
        assert!(rating.elo_deviation() > 100.0 && rating.elo_deviation() < 250.0);
        assert!(rating.elo() > 900.0 && rating.elo() < 1300.0);
    }

    #[test]
    fn cold_start_is_deterministic() {
        let run = || {
            let mut rating = Rating::default();
            rating.update(&vec![default_triple(); 10], &vec![0.0; 10], CalculationType::AutoSelect);
            rating.apply();
            (rating.elo().to_bits(), rating.elo_deviation().to_bits())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn mixed_batch_at_high_deviation_takes_the_special_path() {
        let mut rating = Rating::default();
        let batch = vec![default_triple(); 4];
        let results = vec![1.0, 0.0, 1.0, 0.0];

        let applied = rating.update(&batch, &results, CalculationType::AutoSelect);
        assert_eq!(applied, CalculationType::Special);
        assert_eq!(rating.calculation_type(), CalculationType::Special);
    }

    #[test]
    fn decay_grows_deviation_after_a_grace_period() {
        let mut rating = Rating::from_elo(1500.0, 80.0, INITIAL_VOLATILITY);
        rating.update(&[default_triple()], &[1.0], CalculationType::Normal);
        rating.apply();

        // First idle period only clears the counter.
        let before = rating.elo_deviation();
        rating.decay(true, 3.5, 175.0);
        assert_eq!(rating.elo_deviation(), before);

        // From then on the deviation grows monotonically towards the cap.
        let mut previous = rating.elo_deviation();
        for _ in 0..2000 {
            rating.decay(true, 3.5, 175.0);
            assert!(rating.elo_deviation() >= previous);
            previous = rating.elo_deviation();
        }
        assert!(rating.elo_deviation() <= 175.0);
    }

    #[test]
    fn decay_without_prior_activity_caps_at_initial_deviation() {
        let mut rating = Rating::from_elo(1500.0, 340.0, INITIAL_VOLATILITY);
        for _ in 0..5000 {
            rating.decay(false, 3.5, 175.0);
        }
        assert!(rating.elo_deviation() <= INITIAL_DEVIATION);
    }

    #[test]
    fn wins_and_losses_detection_ignores_draws() {
        assert!(has_wins_and_losses(&[1.0, 0.0]));
        assert!(!has_wins_and_losses(&[1.0, 1.0]));
        assert!(!has_wins_and_losses(&[0.5, 0.5]));
        assert!(!has_wins_and_losses(&[0.5, 1.0]));
    }
}
