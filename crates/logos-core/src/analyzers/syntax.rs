//! Syntactic complexity analysis
//!
//! Grades a sentence or pattern by clause structure: subordination,
//! coordination, passive voice and length. The analysis is marker-based;
//! it does not parse, it counts the signals a parse would be built from,
//! which tracks perceived difficulty well enough for task selection.

use serde::{Deserialize, Serialize};

const SUBORDINATORS: [&str; 16] = [
    "although", "because", "since", "unless", "whereas", "while", "whether", "if", "that",
    "which", "who", "whom", "whose", "when", "where", "why",
];

const COORDINATORS: [&str; 5] = ["and", "but", "or", "nor", "yet"];

const PASSIVE_AUXILIARIES: [&str; 6] = ["is", "are", "was", "were", "been", "being"];

/// Result of marker-based syntactic analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntacticAnalysis {
    pub token_count: usize,
    /// Estimated clause count: one plus subordination and coordination
    pub clause_count: usize,
    pub subordination_count: usize,
    pub passive_count: usize,
    /// Complexity in [0, 1]
    pub complexity: f64,
}

/// Analyze a sentence or syntactic pattern
pub fn analyze_syntax(content: &str) -> SyntacticAnalysis {
    let tokens: Vec<String> = content
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_ascii_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect();

    let subordination_count = tokens
        .iter()
        .filter(|t| SUBORDINATORS.contains(&t.as_str()))
        .count();
    let coordination_count = tokens
        .iter()
        .filter(|t| COORDINATORS.contains(&t.as_str()))
        .count();

    // Passive: auxiliary followed within two tokens by a participle shape
    let mut passive_count = 0;
    for (i, token) in tokens.iter().enumerate() {
        if PASSIVE_AUXILIARIES.contains(&token.as_str()) {
            let window = &tokens[(i + 1)..tokens.len().min(i + 3)];
            if window
                .iter()
                .any(|t| t.ends_with("ed") || t.ends_with("en"))
            {
                passive_count += 1;
            }
        }
    }

    let clause_count = 1 + subordination_count + coordination_count;

    let length_load = (tokens.len() as f64 / 30.0).min(1.0);
    let clause_load = ((clause_count - 1) as f64 / 4.0).min(1.0);
    let passive_load = (passive_count as f64 / 2.0).min(1.0);
    let complexity = (0.35 * length_load + 0.45 * clause_load + 0.2 * passive_load).clamp(0.0, 1.0);

    SyntacticAnalysis {
        token_count: tokens.len(),
        clause_count,
        subordination_count,
        passive_count,
        complexity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_clause() {
        let analysis = analyze_syntax("The doctor examined the patient");
        assert_eq!(analysis.clause_count, 1);
        assert_eq!(analysis.passive_count, 0);
        assert!(analysis.complexity < 0.3);
    }

    #[test]
    fn test_subordination_raises_complexity() {
        let simple = analyze_syntax("The trial ended early");
        let complex = analyze_syntax(
            "Although the trial ended early because enrollment stalled, the committee, which had warned the sponsor, published findings that were disputed",
        );
        assert!(complex.subordination_count >= 3);
        assert!(complex.complexity > simple.complexity);
    }

    #[test]
    fn test_passive_detection() {
        let analysis = analyze_syntax("The samples were analyzed by the laboratory");
        assert!(analysis.passive_count >= 1);
    }

    #[test]
    fn test_single_word_pattern() {
        let analysis = analyze_syntax("notwithstanding");
        assert_eq!(analysis.token_count, 1);
        assert!((0.0..=1.0).contains(&analysis.complexity));
    }

    #[test]
    fn test_empty_input() {
        let analysis = analyze_syntax("");
        assert_eq!(analysis.token_count, 0);
        assert_eq!(analysis.clause_count, 1);
    }
}
