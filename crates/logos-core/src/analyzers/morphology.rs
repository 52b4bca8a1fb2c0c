//! Morphological segmentation
//!
//! Affix stripping over the common English derivational and inflectional
//! inventories. The segmentation is a surface heuristic: it peels known
//! prefixes and suffixes greedily while a plausible stem remains, which
//! is enough to grade decomposability for task selection without a full
//! morphological lexicon.

use serde::{Deserialize, Serialize};

const PREFIXES: [&str; 18] = [
    "anti", "auto", "counter", "de", "dis", "hyper", "hypo", "inter", "mis", "non", "over",
    "post", "pre", "re", "sub", "trans", "un", "under",
];

const SUFFIXES: [&str; 24] = [
    "ization", "ability", "fulness", "ousness", "ically", "ation", "ition", "ment", "ness",
    "tion", "sion", "ance", "ence", "able", "ible", "less", "ful", "ing", "ity", "ive", "ous",
    "ed", "er", "ly",
];

/// Minimum stem length preserved while stripping affixes
const MIN_STEM: usize = 3;

/// Result of segmenting a word into morphemes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphologicalAnalysis {
    /// Segments in surface order: prefixes, stem, suffixes
    pub morphemes: Vec<String>,
    pub prefix_count: usize,
    pub suffix_count: usize,
    /// Decomposability in [0, 1]; monomorphemic words score 0
    pub complexity: f64,
}

impl MorphologicalAnalysis {
    pub fn morpheme_count(&self) -> usize {
        self.morphemes.len()
    }
}

/// Segment a single word; multi-word input is analyzed on its longest
/// token so that patterns like "blood pressure" grade by their head
pub fn analyze_morphology(content: &str) -> MorphologicalAnalysis {
    let word = content
        .split_whitespace()
        .max_by_key(|token| token.len())
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphabetic())
        .to_ascii_lowercase();

    if word.len() < MIN_STEM {
        return MorphologicalAnalysis {
            morphemes: if word.is_empty() { Vec::new() } else { vec![word] },
            prefix_count: 0,
            suffix_count: 0,
            complexity: 0.0,
        };
    }

    let mut stem = word.as_str();
    let mut prefixes = Vec::new();
    let mut suffixes = Vec::new();

    // Peel prefixes, longest match first
    while let Some(prefix) = PREFIXES
        .iter()
        .filter(|p| stem.len() >= p.len() + MIN_STEM && stem.starts_with(**p))
        .max_by_key(|p| p.len())
    {
        prefixes.push(prefix.to_string());
        stem = &stem[prefix.len()..];
    }

    // Peel suffixes, longest match first, innermost last
    while let Some(suffix) = SUFFIXES
        .iter()
        .filter(|s| stem.len() >= s.len() + MIN_STEM && stem.ends_with(**s))
        .max_by_key(|s| s.len())
    {
        suffixes.push(suffix.to_string());
        stem = &stem[..stem.len() - suffix.len()];
    }
    suffixes.reverse();

    let mut morphemes = prefixes.clone();
    morphemes.push(stem.to_string());
    morphemes.extend(suffixes.iter().cloned());

    let affix_count = prefixes.len() + suffixes.len();
    // Three affixes saturate the scale
    let complexity = (affix_count as f64 / 3.0).min(1.0);

    MorphologicalAnalysis {
        morphemes,
        prefix_count: prefixes.len(),
        suffix_count: suffixes.len(),
        complexity,
    }
}
