//! L1-to-L2 transfer model
//!
//! A static table of cross-linguistic transfer coefficients per L1 family
//! and linguistic dimension, domain-specific bonuses, the cost and
//! difficulty adjustments they drive, and a surface-pattern cognate
//! detector. Coefficients live in [-1, +1]; negative values mark
//! interference rather than facilitation.

use logos_types::Domain;
use serde::{Deserialize, Serialize};

/// Language families the transfer table distinguishes for L2 English
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum L1Family {
    Romance,
    Germanic,
    Slavic,
    SinoTibetan,
    Japonic,
    Koreanic,
    Semitic,
    Turkic,
    Other,
}

impl L1Family {
    /// Derive the family from a BCP 47 language tag's primary subtag
    pub fn from_language_tag(tag: &str) -> Self {
        let primary = tag
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match primary.as_str() {
            "es" | "fr" | "pt" | "it" | "ro" | "ca" | "gl" => L1Family::Romance,
            "de" | "nl" | "sv" | "no" | "nb" | "nn" | "da" | "is" | "af" => L1Family::Germanic,
            "ru" | "pl" | "uk" | "cs" | "sk" | "sr" | "hr" | "bg" | "sl" => L1Family::Slavic,
            "zh" | "yue" | "cmn" | "bo" | "my" => L1Family::SinoTibetan,
            "ja" => L1Family::Japonic,
            "ko" => L1Family::Koreanic,
            "ar" | "he" | "am" | "mt" => L1Family::Semitic,
            "tr" | "az" | "kk" | "ky" | "uz" => L1Family::Turkic,
            _ => L1Family::Other,
        }
    }
}

/// Dimensions along which transfer operates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferDimension {
    Phonological,
    Orthographic,
    Morphological,
    Lexical,
    Syntactic,
    Pragmatic,
}

impl TransferDimension {
    pub const ALL: [TransferDimension; 6] = [
        TransferDimension::Phonological,
        TransferDimension::Orthographic,
        TransferDimension::Morphological,
        TransferDimension::Lexical,
        TransferDimension::Syntactic,
        TransferDimension::Pragmatic,
    ];
}

/// Transfer coefficient for (L1 family, dimension) into English.
///
/// Values summarize the contrastive-analysis literature at the family
/// level: Romance speakers inherit a large Latinate vocabulary
/// (lexical +0.7) but fight phonological interference (-0.2); logographic
/// and non-alphabetic L1s carry orthographic interference; SOV L1s carry
/// syntactic interference.
pub fn transfer_coefficient(family: L1Family, dimension: TransferDimension) -> f64 {
    use L1Family::*;
    use TransferDimension::*;
    match (family, dimension) {
        (Romance, Phonological) => -0.2,
        (Romance, Orthographic) => 0.5,
        (Romance, Morphological) => 0.4,
        (Romance, Lexical) => 0.7,
        (Romance, Syntactic) => 0.3,
        (Romance, Pragmatic) => 0.2,

        (Germanic, Phonological) => 0.3,
        (Germanic, Orthographic) => 0.4,
        (Germanic, Morphological) => 0.5,
        (Germanic, Lexical) => 0.5,
        (Germanic, Syntactic) => 0.5,
        (Germanic, Pragmatic) => 0.3,

        (Slavic, Phonological) => -0.1,
        (Slavic, Orthographic) => 0.1,
        (Slavic, Morphological) => 0.2,
        (Slavic, Lexical) => 0.1,
        (Slavic, Syntactic) => -0.2,
        (Slavic, Pragmatic) => 0.0,

        (SinoTibetan, Phonological) => -0.5,
        (SinoTibetan, Orthographic) => -0.6,
        (SinoTibetan, Morphological) => -0.4,
        (SinoTibetan, Lexical) => -0.1,
        (SinoTibetan, Syntactic) => -0.3,
        (SinoTibetan, Pragmatic) => -0.2,

        (Japonic, Phonological) => -0.6,
        (Japonic, Orthographic) => -0.5,
        (Japonic, Morphological) => -0.3,
        (Japonic, Lexical) => 0.0,
        (Japonic, Syntactic) => -0.5,
        (Japonic, Pragmatic) => -0.3,

        (Koreanic, Phonological) => -0.5,
        (Koreanic, Orthographic) => -0.3,
        (Koreanic, Morphological) => -0.3,
        (Koreanic, Lexical) => -0.1,
        (Koreanic, Syntactic) => -0.5,
        (Koreanic, Pragmatic) => -0.3,

        (Semitic, Phonological) => -0.3,
        (Semitic, Orthographic) => -0.5,
        (Semitic, Morphological) => -0.2,
        (Semitic, Lexical) => 0.0,
        (Semitic, Syntactic) => -0.1,
        (Semitic, Pragmatic) => -0.1,

        (Turkic, Phonological) => -0.2,
        (Turkic, Orthographic) => 0.1,
        (Turkic, Morphological) => -0.1,
        (Turkic, Lexical) => -0.1,
        (Turkic, Syntactic) => -0.4,
        (Turkic, Pragmatic) => -0.1,

        (Other, _) => 0.0,
    }
}

/// Domain bonus added on top of the family coefficient when the object's
/// domain concentrates vocabulary the family already owns
pub fn domain_bonus(family: L1Family, dimension: TransferDimension, domain: Domain) -> f64 {
    use TransferDimension::Lexical;
    match (family, dimension, domain) {
        // Medical, legal and academic English are heavily Latinate
        (L1Family::Romance, Lexical, Domain::Medical) => 0.2,
        (L1Family::Romance, Lexical, Domain::Legal) => 0.2,
        (L1Family::Romance, Lexical, Domain::Academic) => 0.15,
        (L1Family::Germanic, Lexical, Domain::Business) => 0.1,
        _ => 0.0,
    }
}

/// Combined transfer for an object: family coefficient plus domain bonus,
/// clamped to [-1, +1]
pub fn effective_transfer(
    family: L1Family,
    dimension: TransferDimension,
    domain: Domain,
) -> f64 {
    (transfer_coefficient(family, dimension) + domain_bonus(family, dimension, domain))
        .clamp(-1.0, 1.0)
}

/// Priority-cost adjustment in logit units: positive transfer lowers the
/// learning cost by up to 0.5
pub fn cost_adjustment(transfer: f64) -> f64 {
    -0.5 * transfer.clamp(-1.0, 1.0)
}

/// Extra phonological difficulty from interference: up to +0.5 when
/// transfer is negative, zero otherwise
pub fn phonological_difficulty_adjustment(transfer: f64) -> f64 {
    if transfer < 0.0 {
        0.5 * (-transfer.clamp(-1.0, 0.0))
    } else {
        0.0
    }
}

/// Surface pattern a word's spelling suggests about its etymology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CognatePattern {
    Latinate,
    Germanic,
}

const LATINATE_SUFFIXES: [&str; 12] = [
    "tion", "sion", "ment", "ance", "ence", "ity", "ous", "ive", "ate", "ize", "ify", "al",
];

const GERMANIC_PATTERNS: [&str; 8] = ["ght", "th", "ck", "sh", "ow", "oo", "ee", "ea"];

/// Tag a word whose surface shape marks probable Latinate or Germanic
/// origin. Latinate suffixes are checked first; they are the stronger
/// signal for the professional registers this engine targets.
pub fn detect_cognate_pattern(word: &str) -> Option<CognatePattern> {
    let lower = word.trim().to_ascii_lowercase();
    if lower.len() < 4 {
        return None;
    }
    if LATINATE_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        return Some(CognatePattern::Latinate);
    }
    if GERMANIC_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(CognatePattern::Germanic);
    }
    None
}

/// Extra lexical transfer when the learner's family matches the word's
/// surface etymology
pub fn cognate_boost(family: L1Family, word: &str) -> f64 {
    match (family, detect_cognate_pattern(word)) {
        (L1Family::Romance, Some(CognatePattern::Latinate)) => 0.3,
        (L1Family::Germanic, Some(CognatePattern::Germanic)) => 0.3,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_tag() {
        assert_eq!(L1Family::from_language_tag("es-MX"), L1Family::Romance);
        assert_eq!(L1Family::from_language_tag("de"), L1Family::Germanic);
        assert_eq!(L1Family::from_language_tag("zh-Hans"), L1Family::SinoTibetan);
        assert_eq!(L1Family::from_language_tag("ja"), L1Family::Japonic);
        assert_eq!(L1Family::from_language_tag("xx"), L1Family::Other);
    }

    #[test]
    fn test_coefficients_stay_in_range() {
        let families = [
            L1Family::Romance,
            L1Family::Germanic,
            L1Family::Slavic,
            L1Family::SinoTibetan,
            L1Family::Japonic,
            L1Family::Koreanic,
            L1Family::Semitic,
            L1Family::Turkic,
            L1Family::Other,
        ];
        for family in families {
            for dimension in TransferDimension::ALL {
                for domain in Domain::ALL {
                    let value = effective_transfer(family, dimension, domain);
                    assert!((-1.0..=1.0).contains(&value));
                }
            }
        }
    }

    #[test]
    fn test_romance_medical_lexical_bonus() {
        let base = effective_transfer(L1Family::Romance, TransferDimension::Lexical, Domain::General);
        let medical =
            effective_transfer(L1Family::Romance, TransferDimension::Lexical, Domain::Medical);
        assert!(medical > base);
    }

    #[test]
    fn test_cost_adjustment_direction() {
        assert!(cost_adjustment(1.0) < 0.0);
        assert!((cost_adjustment(1.0) + 0.5).abs() < 1e-12);
        assert!(cost_adjustment(-0.6) > 0.0);
        assert_eq!(cost_adjustment(0.0), 0.0);
    }

    #[test]
    fn test_phonological_adjustment_only_on_interference() {
        assert_eq!(phonological_difficulty_adjustment(0.4), 0.0);
        assert!((phonological_difficulty_adjustment(-1.0) - 0.5).abs() < 1e-12);
        assert!(phonological_difficulty_adjustment(-0.3) > 0.0);
    }

    #[test]
    fn test_cognate_detection() {
        assert_eq!(
            detect_cognate_pattern("administration"),
            Some(CognatePattern::Latinate)
        );
        assert_eq!(
            detect_cognate_pattern("thought"),
            Some(CognatePattern::Germanic)
        );
        assert_eq!(detect_cognate_pattern("cat"), None);
    }

    #[test]
    fn test_cognate_boost_requires_family_match() {
        assert!(cognate_boost(L1Family::Romance, "infection") > 0.0);
        assert_eq!(cognate_boost(L1Family::Japonic, "infection"), 0.0);
        assert!(cognate_boost(L1Family::Germanic, "brook") > 0.0);
    }
}
