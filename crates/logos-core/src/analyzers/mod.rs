//! Linguistic analyzers
//!
//! Pure text analyzers that turn a language object's surface form into
//! the normalized feature material the z(w) vector and the difficulty
//! models consume. Each analyzer is deterministic, table-driven and
//! allocation-light; none of them touch I/O.

pub mod morphology;
pub mod phonology;
pub mod pragmatics;
pub mod semantics;
pub mod syntax;

pub use morphology::{analyze_morphology, MorphologicalAnalysis};
pub use phonology::{analyze_phonology, PhonologicalAnalysis};
pub use pragmatics::{analyze_pragmatics, PragmaticAnalysis, TextType};
pub use semantics::{NetworkNeighbor, SemanticNetwork};
pub use syntax::{analyze_syntax, SyntacticAnalysis};

use crate::corpus::CorpusStats;
use crate::entities::ZVector;
use crate::irt::ItemParams;
use logos_types::{THETA_MAX, THETA_MIN};

/// Assemble a z(w) vector for a content string from the corpus, the
/// collocation neighbourhood and the item's calibrated difficulty.
///
/// F comes from log-normalized corpus frequency, R from the caller's
/// relational density (collocation NPMI mass), D from the IRT difficulty
/// rescaled to [0, 1], and M, P, PRAG, SYNT from the respective
/// analyzers.
pub fn build_z_vector(
    content: &str,
    corpus: &CorpusStats,
    relational_density: f64,
    params: &ItemParams,
) -> ZVector {
    let morphology = analyze_morphology(content);
    let phonology = analyze_phonology(content);
    let pragmatics = analyze_pragmatics(content);
    let syntax = analyze_syntax(content);

    ZVector::new(
        corpus.normalized_frequency(content),
        relational_density,
        (params.b - THETA_MIN) / (THETA_MAX - THETA_MIN),
        morphology.complexity,
        phonology.difficulty,
        pragmatics.register_load,
        syntax.complexity,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_build_z_vector_stays_normalized() {
        let mut frequencies = HashMap::new();
        frequencies.insert("unquestionably".to_string(), 3);
        frequencies.insert("the".to_string(), 900);
        let corpus = CorpusStats::from_counts(frequencies, Vec::new()).unwrap();
        let params = ItemParams::new(1.2, 1.5, 0.0).unwrap();
        let z = build_z_vector("unquestionably", &corpus, 0.4, &params);
        for value in z.as_array() {
            assert!((0.0..=1.0).contains(&value), "component {} out of range", value);
        }
    }
}
