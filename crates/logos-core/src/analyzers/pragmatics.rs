//! Pragmatic and text-type analysis
//!
//! Marker-density scoring of register: formality, hedging and
//! speech-act signals, plus a coarse text-type classification. The
//! register load feeds the PRAG component of z(w); the text type feeds
//! genre-sensitive task generation.

use serde::{Deserialize, Serialize};

const FORMAL_MARKERS: [&str; 14] = [
    "hereby", "pursuant", "notwithstanding", "aforementioned", "henceforth", "therein",
    "thereof", "whereas", "shall", "furthermore", "moreover", "consequently", "accordingly",
    "respectively",
];

const HEDGING_MARKERS: [&str; 12] = [
    "perhaps", "possibly", "apparently", "presumably", "arguably", "somewhat", "relatively",
    "suggest", "indicate", "may", "might", "could",
];

const SPEECH_ACT_MARKERS: [&str; 10] = [
    "please", "request", "recommend", "advise", "propose", "apologize", "thank", "insist",
    "urge", "warn",
];

const INSTRUCTIONAL_MARKERS: [&str; 8] = [
    "first", "next", "then", "finally", "step", "ensure", "apply", "insert",
];

const NARRATIVE_MARKERS: [&str; 7] = [
    "yesterday", "afterwards", "suddenly", "eventually", "once", "later", "meanwhile",
];

const ARGUMENTATIVE_MARKERS: [&str; 8] = [
    "however", "therefore", "thus", "although", "contend", "argue", "claim", "evidence",
];

/// Coarse text types used by genre-sensitive tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextType {
    Instructional,
    Narrative,
    Argumentative,
    Expository,
    Conversational,
}

/// Result of pragmatic analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PragmaticAnalysis {
    /// Formal-marker density in [0, 1]
    pub formality: f64,
    /// Hedging-marker density in [0, 1]
    pub hedging: f64,
    /// Speech-act-marker density in [0, 1]
    pub speech_act_density: f64,
    pub text_type: TextType,
    /// Combined pragmatic load in [0, 1]
    pub register_load: f64,
}

fn density(tokens: &[String], markers: &[&str]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let hits = tokens
        .iter()
        .filter(|t| markers.contains(&t.as_str()))
        .count();
    // One marker per five tokens saturates
    (hits as f64 * 5.0 / tokens.len() as f64).min(1.0)
}

/// Analyze register markers and classify the text type
pub fn analyze_pragmatics(content: &str) -> PragmaticAnalysis {
    let tokens: Vec<String> = content
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_ascii_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect();

    let formality = density(&tokens, &FORMAL_MARKERS);
    let hedging = density(&tokens, &HEDGING_MARKERS);
    let speech_act_density = density(&tokens, &SPEECH_ACT_MARKERS);

    let instructional = density(&tokens, &INSTRUCTIONAL_MARKERS);
    let narrative = density(&tokens, &NARRATIVE_MARKERS);
    let argumentative = density(&tokens, &ARGUMENTATIVE_MARKERS);

    let text_type = if tokens.len() <= 3 && speech_act_density == 0.0 && formality == 0.0 {
        // Bare tokens carry no genre signal
        TextType::Expository
    } else if instructional >= narrative
        && instructional >= argumentative
        && instructional > 0.0
    {
        TextType::Instructional
    } else if narrative >= argumentative && narrative > 0.0 {
        TextType::Narrative
    } else if argumentative > 0.0 {
        TextType::Argumentative
    } else if speech_act_density > 0.0 {
        TextType::Conversational
    } else {
        TextType::Expository
    };

    let register_load =
        (0.5 * formality + 0.3 * hedging + 0.2 * speech_act_density).clamp(0.0, 1.0);

    PragmaticAnalysis {
        formality,
        hedging,
        speech_act_density,
        text_type,
        register_load,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_register_scores_formal() {
        let legal = analyze_pragmatics(
            "The parties shall hereby indemnify the aforementioned contractor pursuant to the agreement",
        );
        let casual = analyze_pragmatics("the meeting went fine");
        assert!(legal.formality > casual.formality);
        assert!(legal.register_load > casual.register_load);
    }

    #[test]
    fn test_hedged_academic_prose() {
        let analysis = analyze_pragmatics(
            "The results may suggest that the effect is relatively modest and could possibly vary",
        );
        assert!(analysis.hedging > 0.0);
    }

    #[test]
    fn test_text_type_instructional() {
        let analysis =
            analyze_pragmatics("First insert the cannula, then ensure the line is clear");
        assert_eq!(analysis.text_type, TextType::Instructional);
    }

    #[test]
    fn test_text_type_argumentative() {
        let analysis = analyze_pragmatics(
            "The defense will argue that the evidence is weak; however the precedent holds",
        );
        assert_eq!(analysis.text_type, TextType::Argumentative);
    }

    #[test]
    fn test_bare_token_is_expository() {
        let analysis = analyze_pragmatics("stethoscope");
        assert_eq!(analysis.text_type, TextType::Expository);
        assert!((0.0..=1.0).contains(&analysis.register_load));
    }
}
