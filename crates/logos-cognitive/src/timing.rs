//! Response-timing classification
//!
//! Maps response latency onto a speed class given the task's timing
//! category, the object's mastery stage and its length, then derives the
//! FSRS rating the scheduler consumes. Slow correctness is not rewarded,
//! and implausibly fast correct answers on selected-response tasks are
//! treated as probable guesses. A separate detector flags suspicious
//! response sequences that must not reach the estimators.

use logos_types::{MasteryStage, Rating, TaskType, TimingCategory};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Speed classification of one response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingClass {
    TooFast,
    Fast,
    Good,
    Slow,
    VerySlow,
}

/// Millisecond boundaries for one timing category; responses beyond
/// `slow` classify as very slow
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingThresholds {
    pub too_fast: f64,
    pub fast: f64,
    pub good: f64,
    pub slow: f64,
}

/// The authoritative base thresholds: recognition is expected faster
/// than recall, recall faster than production
pub const BASE_THRESHOLDS: [(TimingCategory, TimingThresholds); 3] = [
    (
        TimingCategory::Recognition,
        TimingThresholds {
            too_fast: 400.0,
            fast: 1200.0,
            good: 3000.0,
            slow: 6000.0,
        },
    ),
    (
        TimingCategory::Recall,
        TimingThresholds {
            too_fast: 500.0,
            fast: 1500.0,
            good: 4000.0,
            slow: 8000.0,
        },
    ),
    (
        TimingCategory::Production,
        TimingThresholds {
            too_fast: 600.0,
            fast: 2000.0,
            good: 6000.0,
            slow: 12000.0,
        },
    ),
];

fn base_thresholds(category: TimingCategory) -> TimingThresholds {
    BASE_THRESHOLDS
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, t)| *t)
        .unwrap_or(BASE_THRESHOLDS[0].1)
}

/// Expected-speed multiplier per mastery stage: novices get twice the
/// time, automatic-stage learners a fifth less
pub fn mastery_modifier(stage: MasteryStage) -> f64 {
    match stage {
        MasteryStage::Unknown => 2.0,
        MasteryStage::Recognition => 1.5,
        MasteryStage::Recall => 1.2,
        MasteryStage::Production => 1.0,
        MasteryStage::Automatic => 0.8,
    }
}

/// Longer targets earn proportionally more time, capped at 1.5x
pub fn word_length_factor(word_length: usize) -> f64 {
    (1.0 + 0.05 * word_length.saturating_sub(5) as f64).min(1.5)
}

/// Timing category a task type is judged against
pub fn timing_category(task: TaskType) -> TimingCategory {
    use TaskType::*;
    match task {
        Recognition | DefinitionMatch | MultipleChoice | CollocationMatch
        | ListeningDiscrimination => TimingCategory::Recognition,
        Cloze | WordFormation | SentenceCompletion | TranslationSpot | PronunciationContrast => {
            TimingCategory::Recall
        }
        ErrorCorrection | Paraphrase | RegisterShift | SentenceCombining | FreeProduction
        | DialogueCompletion | GenreTransform => TimingCategory::Production,
    }
}

/// Classify a response time against the adjusted thresholds
pub fn classify_response_time(
    response_time_ms: u32,
    category: TimingCategory,
    stage: MasteryStage,
    word_length: usize,
) -> TimingClass {
    let thresholds = base_thresholds(category);
    let factor = mastery_modifier(stage) * word_length_factor(word_length);
    let ms = response_time_ms as f64;
    if ms < thresholds.too_fast * factor {
        TimingClass::TooFast
    } else if ms < thresholds.fast * factor {
        TimingClass::Fast
    } else if ms < thresholds.good * factor {
        TimingClass::Good
    } else if ms < thresholds.slow * factor {
        TimingClass::Slow
    } else {
        TimingClass::VerySlow
    }
}

/// Derive the FSRS rating from correctness and speed.
///
/// Policy: incorrect very-slow responses rate Again, other incorrect
/// responses Hard; correct too-fast responses rate Hard (probable
/// guess); correct fast responses rate Easy, except before the
/// automatic stage where fluency is not yet credited (Good); correct
/// good-speed responses rate Good; correct slow responses rate Hard.
pub fn suggest_rating(class: TimingClass, correct: bool, stage: MasteryStage) -> Rating {
    if !correct {
        return match class {
            TimingClass::VerySlow => Rating::Again,
            _ => Rating::Hard,
        };
    }
    match class {
        TimingClass::TooFast => Rating::Hard,
        TimingClass::Fast => {
            if stage < MasteryStage::Production {
                Rating::Good
            } else {
                Rating::Easy
            }
        }
        TimingClass::Good => Rating::Good,
        TimingClass::Slow | TimingClass::VerySlow => Rating::Hard,
    }
}

/// Classify and rate in one call
pub fn rate_response(
    response_time_ms: u32,
    task: TaskType,
    stage: MasteryStage,
    word_length: usize,
    correct: bool,
) -> (TimingClass, Rating) {
    let class = classify_response_time(
        response_time_ms,
        timing_category(task),
        stage,
        word_length,
    );
    (class, suggest_rating(class, correct, stage))
}

/// Suspicious response-sequence patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuspiciousPattern {
    /// All response times land in the same 100 ms bucket
    RoboticTiming,
    /// Everything under 500 ms with over 90% accuracy
    BotPattern,
    /// Everything under 300 ms with under 30% accuracy
    RandomClicking,
}

/// Minimum responses before the pattern detector judges a sequence
pub const SUSPICION_MIN_RESPONSES: usize = 5;

/// Scan a response sequence of (milliseconds, correct) pairs. Sequences
/// shorter than [`SUSPICION_MIN_RESPONSES`] are never flagged. Flagged
/// sessions are recorded but their responses must not mutate ability or
/// scheduling state.
pub fn detect_suspicious_patterns(responses: &[(u32, bool)]) -> Vec<SuspiciousPattern> {
    if responses.len() < SUSPICION_MIN_RESPONSES {
        return Vec::new();
    }
    let mut patterns = Vec::new();

    let first_bucket = responses[0].0 / 100;
    if responses.iter().all(|(ms, _)| ms / 100 == first_bucket) {
        patterns.push(SuspiciousPattern::RoboticTiming);
    }

    let accuracy = responses.iter().filter(|(_, correct)| *correct).count() as f64
        / responses.len() as f64;

    if responses.iter().all(|(ms, _)| *ms < 500) && accuracy > 0.9 {
        patterns.push(SuspiciousPattern::BotPattern);
    }

    if responses.iter().all(|(ms, _)| *ms < 300) && accuracy < 0.3 {
        patterns.push(SuspiciousPattern::RandomClicking);
    }

    if !patterns.is_empty() {
        warn!(?patterns, count = responses.len(), "suspicious response pattern");
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ordering_of_thresholds() {
        let recognition = base_thresholds(TimingCategory::Recognition);
        let recall = base_thresholds(TimingCategory::Recall);
        let production = base_thresholds(TimingCategory::Production);
        assert!(recognition.fast < recall.fast);
        assert!(recall.fast < production.fast);
        assert!(recognition.good < recall.good);
    }

    #[test]
    fn test_mcq_too_fast_scenario() {
        // Correct MCQ on a six-letter word at stage 3, 350 ms: the
        // recognition too-fast bound is 400 * 1.0 * 1.05 = 420, so this
        // classifies as a probable guess and rates Hard
        let (class, rating) = rate_response(
            350,
            TaskType::MultipleChoice,
            MasteryStage::Production,
            6,
            true,
        );
        assert_eq!(class, TimingClass::TooFast);
        assert_eq!(rating, Rating::Hard);

        // The same response at stage 4: the bound shrinks to 336, the
        // response classifies as fast, and automaticity earns Easy
        let (class, rating) = rate_response(
            350,
            TaskType::MultipleChoice,
            MasteryStage::Automatic,
            6,
            true,
        );
        assert_eq!(class, TimingClass::Fast);
        assert_eq!(rating, Rating::Easy);
    }

    #[test]
    fn test_incorrect_ratings() {
        assert_eq!(
            suggest_rating(TimingClass::VerySlow, false, MasteryStage::Recall),
            Rating::Again
        );
        assert_eq!(
            suggest_rating(TimingClass::Good, false, MasteryStage::Recall),
            Rating::Hard
        );
        assert_eq!(
            suggest_rating(TimingClass::TooFast, false, MasteryStage::Recall),
            Rating::Hard
        );
    }

    #[test]
    fn test_slow_correctness_not_rewarded() {
        assert_eq!(
            suggest_rating(TimingClass::Slow, true, MasteryStage::Automatic),
            Rating::Hard
        );
        assert_eq!(
            suggest_rating(TimingClass::VerySlow, true, MasteryStage::Production),
            Rating::Hard
        );
    }

    #[test]
    fn test_fast_before_automaticity_is_good() {
        assert_eq!(
            suggest_rating(TimingClass::Fast, true, MasteryStage::Recall),
            Rating::Good
        );
        assert_eq!(
            suggest_rating(TimingClass::Fast, true, MasteryStage::Production),
            Rating::Easy
        );
    }

    #[test]
    fn test_novice_gets_more_time() {
        // 2200 ms on recognition: slow for an automatic-stage learner,
        // comfortable for a novice
        let novice = classify_response_time(2200, TimingCategory::Recognition, MasteryStage::Unknown, 5);
        let expert =
            classify_response_time(2200, TimingCategory::Recognition, MasteryStage::Automatic, 5);
        assert_eq!(novice, TimingClass::Fast);
        assert_eq!(expert, TimingClass::Good);
    }

    #[test]
    fn test_word_length_factor_caps() {
        assert_eq!(word_length_factor(5), 1.0);
        assert!(word_length_factor(3) >= 1.0);
        assert_eq!(word_length_factor(40), 1.5);
    }

    #[test]
    fn test_short_sequences_never_flagged() {
        let responses = [(250, true); 4];
        assert!(detect_suspicious_patterns(&responses).is_empty());
    }

    #[test]
    fn test_robotic_timing_detection() {
        let responses = [(420, true), (450, false), (410, true), (480, true), (499, true)];
        let patterns = detect_suspicious_patterns(&responses);
        assert!(patterns.contains(&SuspiciousPattern::RoboticTiming));
    }

    #[test]
    fn test_bot_pattern_detection() {
        let responses = [(300, true), (320, true), (250, true), (400, true), (350, true)];
        let patterns = detect_suspicious_patterns(&responses);
        assert!(patterns.contains(&SuspiciousPattern::BotPattern));
    }

    #[test]
    fn test_random_clicking_detection() {
        let responses = [
            (120, false),
            (180, false),
            (250, true),
            (140, false),
            (200, false),
        ];
        let patterns = detect_suspicious_patterns(&responses);
        assert!(patterns.contains(&SuspiciousPattern::RandomClicking));
    }

    #[test]
    fn test_normal_sequence_clean() {
        let responses = [
            (1200, true),
            (2500, false),
            (1800, true),
            (3200, true),
            (900, true),
        ];
        assert!(detect_suspicious_patterns(&responses).is_empty());
    }
}
