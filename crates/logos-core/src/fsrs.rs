//! Free Spaced Repetition Scheduler
//!
//! The 19-parameter FSRS memory model: per-card difficulty, stability and
//! retrievability, the canonical stability/difficulty update equations,
//! and review scheduling against a requested retention level.
//!
//! Retrievability follows the exponential forgetting curve
//! R(t) = 0.9^(t/S), which makes the documented interval formula
//! S * ln(request_retention) / ln(0.9) exact: a card reviewed after
//! exactly one stability worth of days sits at 90% recall.

use chrono::{DateTime, Duration, Utc};
use logos_types::{CardState, LogosError, Rating, Result};
use serde::{Deserialize, Serialize};

/// Published default weight vector of the 19-parameter model
pub const DEFAULT_WEIGHTS: [f64; 19] = [
    0.40255, 1.18385, 3.173, 15.69105, 7.1949, 0.5345, 1.4604, 0.0046, 1.54575, 0.1192, 1.01925,
    1.9395, 0.11, 0.29605, 2.2698, 0.2315, 2.9898, 0.51655, 0.6621,
];

/// Lower clamp on stability; keeps intervals and the forgetting curve
/// well-defined after pathological rating sequences
pub const STABILITY_MIN: f64 = 0.01;

const DIFFICULTY_MIN: f64 = 1.0;
const DIFFICULTY_MAX: f64 = 10.0;

/// The scheduler weight vector, serialized as a fixed-order array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FsrsWeights(pub [f64; 19]);

impl Default for FsrsWeights {
    fn default() -> Self {
        Self(DEFAULT_WEIGHTS)
    }
}

impl FsrsWeights {
    pub fn new(weights: [f64; 19]) -> Result<Self> {
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(LogosError::InvalidInput(
                "FSRS weights must be finite".to_string(),
            ));
        }
        Ok(Self(weights))
    }

    fn w(&self, index: usize) -> f64 {
        self.0[index]
    }
}

/// One scheduled memory item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsrsCard {
    /// Item difficulty in [1, 10]
    pub difficulty: f64,
    /// Memory stability in days, >= 0
    pub stability: f64,
    /// Count of non-Again reviews
    pub reps: u32,
    /// Count of Again ratings from the review state
    pub lapses: u32,
    pub state: CardState,
    pub last_review: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
}

impl FsrsCard {
    pub fn new() -> Self {
        Self {
            difficulty: 0.0,
            stability: 0.0,
            reps: 0,
            lapses: 0,
            state: CardState::New,
            last_review: None,
            next_review: None,
        }
    }

    /// Days elapsed since the last review, zero for unseen cards
    pub fn elapsed_days(&self, now: DateTime<Utc>) -> f64 {
        match self.last_review {
            Some(last) => ((now - last).num_seconds() as f64 / 86_400.0).max(0.0),
            None => 0.0,
        }
    }
}

impl Default for FsrsCard {
    fn default() -> Self {
        Self::new()
    }
}

/// FSRS scheduler configured for a retention target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsrsScheduler {
    pub weights: FsrsWeights,
    /// Retention probability the schedule aims at when a review comes due
    pub request_retention: f64,
    /// Hard ceiling on any scheduled interval, in days
    pub maximum_interval_days: f64,
    /// Successful Good-ratings needed to graduate from learning
    pub learning_steps: u32,
}

impl Default for FsrsScheduler {
    fn default() -> Self {
        Self {
            weights: FsrsWeights::default(),
            request_retention: 0.9,
            maximum_interval_days: 36_500.0,
            learning_steps: 2,
        }
    }
}

impl FsrsScheduler {
    pub fn new(weights: FsrsWeights, request_retention: f64, maximum_interval_days: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&request_retention) || request_retention <= 0.0 {
            return Err(LogosError::InvalidInput(format!(
                "request_retention {} outside (0, 1)",
                request_retention
            )));
        }
        if maximum_interval_days < 1.0 {
            return Err(LogosError::InvalidInput(
                "maximum_interval_days must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            weights,
            request_retention,
            maximum_interval_days,
            learning_steps: 2,
        })
    }

    /// Probability of recalling the card after `elapsed` days at
    /// stability S: R(t) = 0.9^(t/S)
    pub fn retrievability(&self, card: &FsrsCard, now: DateTime<Utc>) -> f64 {
        if card.stability <= 0.0 {
            return 0.0;
        }
        let elapsed = card.elapsed_days(now);
        0.9f64.powf(elapsed / card.stability)
    }

    /// Days until retrievability decays to the requested retention
    pub fn interval_days(&self, stability: f64) -> f64 {
        let raw = stability * self.request_retention.ln() / 0.9f64.ln();
        raw.clamp(1.0, self.maximum_interval_days)
    }

    fn initial_stability(&self, rating: Rating) -> f64 {
        self.weights.w(rating.grade() as usize - 1).max(STABILITY_MIN)
    }

    fn initial_difficulty(&self, rating: Rating) -> f64 {
        let g = rating.grade() as f64;
        (self.weights.w(4) - (self.weights.w(5) * (g - 1.0)).exp() + 1.0)
            .clamp(DIFFICULTY_MIN, DIFFICULTY_MAX)
    }

    /// Difficulty update with mean reversion toward the Easy baseline
    fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let g = rating.grade() as f64;
        let delta = -self.weights.w(6) * (g - 3.0);
        let damped = difficulty + delta * (DIFFICULTY_MAX - difficulty) / 9.0;
        let target = self.initial_difficulty(Rating::Easy);
        (self.weights.w(7) * target + (1.0 - self.weights.w(7)) * damped)
            .clamp(DIFFICULTY_MIN, DIFFICULTY_MAX)
    }

    /// Stability growth after a successful review
    fn stability_after_recall(
        &self,
        difficulty: f64,
        stability: f64,
        retrievability: f64,
        rating: Rating,
    ) -> f64 {
        let hard_penalty = if rating == Rating::Hard {
            self.weights.w(15)
        } else {
            1.0
        };
        let easy_bonus = if rating == Rating::Easy {
            self.weights.w(16)
        } else {
            1.0
        };
        let growth = self.weights.w(8).exp()
            * (11.0 - difficulty)
            * stability.powf(-self.weights.w(9))
            * ((self.weights.w(10) * (1.0 - retrievability)).exp() - 1.0)
            * hard_penalty
            * easy_bonus;
        (stability * (1.0 + growth)).max(STABILITY_MIN)
    }

    /// Post-lapse stability, never above the pre-lapse value
    fn stability_after_forget(
        &self,
        difficulty: f64,
        stability: f64,
        retrievability: f64,
    ) -> f64 {
        let forgotten = self.weights.w(11)
            * difficulty.powf(-self.weights.w(12))
            * ((stability + 1.0).powf(self.weights.w(13)) - 1.0)
            * (self.weights.w(14) * (1.0 - retrievability)).exp();
        forgotten.min(stability).max(STABILITY_MIN)
    }

    /// Same-day stability adjustment used while a card sits in
    /// learning or relearning
    fn stability_short_term(&self, stability: f64, rating: Rating) -> f64 {
        let g = rating.grade() as f64;
        (stability * (self.weights.w(17) * (g - 3.0 + self.weights.w(18))).exp())
            .max(STABILITY_MIN)
    }

    /// Apply one rating to a card, returning the updated card.
    ///
    /// State machine: new cards enter learning on their first rating;
    /// learning graduates to review on Good (after `learning_steps`
    /// successes) or immediately on Easy; a review-state Again lapses the
    /// card into relearning; relearning returns to review on Good or
    /// Easy. Lapses count Again ratings from review; reps count non-Again
    /// ratings. Stability is non-negative after every update.
    pub fn review(&self, card: &FsrsCard, rating: Rating, now: DateTime<Utc>) -> Result<FsrsCard> {
        if let Some(last) = card.last_review {
            if now < last {
                return Err(LogosError::InvalidInput(
                    "review timestamp precedes the card's last review".to_string(),
                ));
            }
        }

        let mut next = card.clone();
        if rating != Rating::Again {
            next.reps = card.reps.saturating_add(1);
        }

        match card.state {
            CardState::New => {
                next.stability = self.initial_stability(rating);
                next.difficulty = self.initial_difficulty(rating);
                next.state = if rating == Rating::Easy {
                    CardState::Review
                } else {
                    CardState::Learning
                };
            }
            CardState::Learning | CardState::Relearning => {
                next.stability = self.stability_short_term(card.stability, rating);
                next.difficulty = self.next_difficulty(card.difficulty, rating);
                next.state = match rating {
                    Rating::Again | Rating::Hard => card.state,
                    Rating::Good => {
                        let graduated = card.state == CardState::Relearning
                            || next.reps >= self.learning_steps;
                        if graduated {
                            CardState::Review
                        } else {
                            CardState::Learning
                        }
                    }
                    Rating::Easy => CardState::Review,
                };
            }
            CardState::Review => {
                let retrievability = self.retrievability(card, now);
                next.difficulty = self.next_difficulty(card.difficulty, rating);
                if rating == Rating::Again {
                    next.stability =
                        self.stability_after_forget(card.difficulty, card.stability, retrievability);
                    next.lapses = card.lapses.saturating_add(1);
                    next.state = CardState::Relearning;
                } else {
                    next.stability = self.stability_after_recall(
                        card.difficulty,
                        card.stability,
                        retrievability,
                        rating,
                    );
                    next.state = CardState::Review;
                }
            }
        }

        next.last_review = Some(now);
        next.next_review = Some(match next.state {
            // Review-state cards wait a full retention interval
            CardState::Review => {
                now + Duration::seconds((self.interval_days(next.stability) * 86_400.0) as i64)
            }
            // Learning and relearning cards stay due within the session
            _ => now,
        });

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> FsrsScheduler {
        FsrsScheduler::default()
    }

    #[test]
    fn test_new_card_enters_learning() {
        let card = FsrsCard::new();
        let now = Utc::now();
        let after = scheduler().review(&card, Rating::Good, now).unwrap();
        assert_eq!(after.state, CardState::Learning);
        assert_eq!(after.reps, 1);
        assert_eq!(after.lapses, 0);
        assert!((after.stability - DEFAULT_WEIGHTS[2]).abs() < 1e-12);
        assert!(after.difficulty >= 1.0 && after.difficulty <= 10.0);
    }

    #[test]
    fn test_easy_graduates_immediately() {
        let card = FsrsCard::new();
        let now = Utc::now();
        let after = scheduler().review(&card, Rating::Easy, now).unwrap();
        assert_eq!(after.state, CardState::Review);
        assert!(after.next_review.unwrap() > now);
    }

    #[test]
    fn test_good_graduates_after_learning_steps() {
        let sched = scheduler();
        let now = Utc::now();
        let step1 = sched.review(&FsrsCard::new(), Rating::Good, now).unwrap();
        assert_eq!(step1.state, CardState::Learning);
        let step2 = sched.review(&step1, Rating::Good, now).unwrap();
        assert_eq!(step2.state, CardState::Review);
        assert_eq!(step2.reps, 2);
    }

    #[test]
    fn test_again_from_review_lapses() {
        let sched = scheduler();
        let now = Utc::now();
        let mut card = sched.review(&FsrsCard::new(), Rating::Easy, now).unwrap();
        let stability_before = card.stability;
        card = sched
            .review(&card, Rating::Again, now + Duration::days(3))
            .unwrap();
        assert_eq!(card.state, CardState::Relearning);
        assert_eq!(card.lapses, 1);
        assert!(card.stability <= stability_before);
        assert!(card.stability >= 0.0);
    }

    #[test]
    fn test_relearning_returns_on_good() {
        let sched = scheduler();
        let now = Utc::now();
        let mut card = sched.review(&FsrsCard::new(), Rating::Easy, now).unwrap();
        card = sched
            .review(&card, Rating::Again, now + Duration::days(3))
            .unwrap();
        card = sched
            .review(&card, Rating::Good, now + Duration::days(3))
            .unwrap();
        assert_eq!(card.state, CardState::Review);
    }

    #[test]
    fn test_stability_grows_on_spaced_success() {
        let sched = scheduler();
        let mut now = Utc::now();
        let mut card = sched.review(&FsrsCard::new(), Rating::Easy, now).unwrap();
        for _ in 0..5 {
            let due = card.next_review.unwrap();
            now = due;
            let before = card.stability;
            card = sched.review(&card, Rating::Good, now).unwrap();
            assert!(card.stability > before, "stability should grow on success");
        }
    }

    #[test]
    fn test_stability_never_negative() {
        let sched = scheduler();
        let mut now = Utc::now();
        let mut card = FsrsCard::new();
        let ratings = [
            Rating::Again,
            Rating::Again,
            Rating::Hard,
            Rating::Again,
            Rating::Good,
            Rating::Again,
        ];
        for rating in ratings {
            card = sched.review(&card, rating, now).unwrap();
            assert!(card.stability >= 0.0);
            assert!(card.difficulty >= 1.0 && card.difficulty <= 10.0);
            now += Duration::hours(6);
        }
    }

    #[test]
    fn test_interval_formula() {
        let sched = scheduler();
        // At the default 0.9 retention the interval equals the stability
        assert!((sched.interval_days(17.0) - 17.0).abs() < 1e-9);
        // Clamped below by one day and above by the maximum
        assert_eq!(sched.interval_days(0.001), 1.0);
        assert_eq!(sched.interval_days(1e9), sched.maximum_interval_days);
    }

    #[test]
    fn test_retrievability_at_stability_is_retention() {
        let sched = scheduler();
        let now = Utc::now();
        let card = FsrsCard {
            stability: 10.0,
            difficulty: 5.0,
            last_review: Some(now - Duration::days(10)),
            ..FsrsCard::new()
        };
        let r = sched.retrievability(&card, now);
        assert!((r - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_backwards_clock() {
        let sched = scheduler();
        let now = Utc::now();
        let card = sched.review(&FsrsCard::new(), Rating::Good, now).unwrap();
        assert!(sched
            .review(&card, Rating::Good, now - Duration::days(1))
            .is_err());
    }

    #[test]
    fn test_weights_serialize_as_fixed_vector() {
        let weights = FsrsWeights::default();
        let json = serde_json::to_string(&weights).unwrap();
        let parsed: FsrsWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(weights, parsed);
        assert!(json.starts_with('['));
    }
}
