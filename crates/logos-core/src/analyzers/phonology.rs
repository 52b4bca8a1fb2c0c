//! Grapheme-to-phoneme ambiguity analysis
//!
//! English orthography maps many graphemes onto several phonemes; the
//! entropy of that mapping is a strong predictor of decoding difficulty
//! for learners whose L1 is orthographically shallow. The table below
//! lists, per ambiguous grapheme, the number of common phoneme
//! realizations; unlisted single-letter consonants are treated as
//! unambiguous.

use serde::{Deserialize, Serialize};

/// Multi-letter graphemes matched before single letters, with the count
/// of common phoneme realizations
const DIGRAPHS: [(&str, usize); 14] = [
    ("ough", 6),
    ("augh", 2),
    ("tion", 1),
    ("sion", 2),
    ("ch", 3),
    ("sh", 1),
    ("th", 2),
    ("ph", 1),
    ("gh", 3),
    ("ea", 4),
    ("oo", 3),
    ("ou", 4),
    ("ow", 2),
    ("ai", 2),
];

/// Ambiguity of single graphemes: vowels dominate
fn single_grapheme_ambiguity(c: char) -> usize {
    match c {
        'a' => 4,
        'e' => 3,
        'i' => 3,
        'o' => 4,
        'u' => 3,
        'y' => 3,
        'c' => 2,
        'g' => 2,
        's' => 2,
        'x' => 2,
        _ => 1,
    }
}

/// Result of grapheme-to-phoneme analysis for one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonologicalAnalysis {
    /// Graphemes in surface order
    pub graphemes: Vec<String>,
    /// Total decoding uncertainty in bits: sum over graphemes of
    /// log2(realization count), assuming uniform alternatives
    pub g2p_entropy: f64,
    /// Heuristic syllable count, at least 1 for non-empty input
    pub syllable_count: usize,
    /// Decoding difficulty in [0, 1]
    pub difficulty: f64,
}

/// Segment a token into graphemes (longest digraph first) and score its
/// decoding ambiguity
pub fn analyze_phonology(content: &str) -> PhonologicalAnalysis {
    let word: String = content
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();

    let mut graphemes = Vec::new();
    let mut ambiguities = Vec::new();
    let bytes = word.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let rest = &word[i..];
        let mut consumed = 1;
        let mut ambiguity = single_grapheme_ambiguity(rest.chars().next().unwrap_or(' '));
        for (digraph, count) in DIGRAPHS {
            if rest.starts_with(digraph) {
                consumed = digraph.len();
                ambiguity = count;
                break;
            }
        }
        graphemes.push(rest[..consumed].to_string());
        ambiguities.push(ambiguity as f64);
        i += consumed;
    }

    let g2p_entropy: f64 = ambiguities.iter().map(|a| a.log2()).sum();
    let syllable_count = count_syllables(&word);

    // Six bits of total ambiguity saturate the scale; syllables
    // contribute a smaller secondary load
    let entropy_load = (g2p_entropy / 6.0).min(1.0);
    let syllable_load = ((syllable_count.saturating_sub(1)) as f64 / 5.0).min(1.0);
    let difficulty = (0.7 * entropy_load + 0.3 * syllable_load).clamp(0.0, 1.0);

    PhonologicalAnalysis {
        graphemes,
        g2p_entropy,
        syllable_count,
        difficulty,
    }
}

/// Vowel-group syllable heuristic with silent-e correction
fn count_syllables(word: &str) -> usize {
    if word.is_empty() {
        return 0;
    }
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut in_group = false;
    for c in word.chars() {
        if is_vowel(c) {
            if !in_group {
                count += 1;
            }
            in_group = true;
        } else {
            in_group = false;
        }
    }
    if word.ends_with('e') && !word.ends_with("le") && count > 1 {
        count -= 1;
    }
    count.max(1)
}
