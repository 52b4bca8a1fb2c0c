//! Corpus statistics
//!
//! Frequency normalization, the frequency-to-difficulty mapping used to
//! seed IRT item parameters, and pointwise mutual information for
//! collocation strength. A goal's corpus statistics are loaded once and
//! read-only afterwards; everything here is plain arithmetic over the
//! counts the ingestion pipeline produced.

use logos_types::{LogosError, Result, THETA_MAX, THETA_MIN};
use std::collections::HashMap;

/// Co-occurrence count at which a collocation reaches full significance
const SIGNIFICANCE_SATURATION: u64 = 50;

/// Log-normalized frequency in [0, 1]: ln(1 + count) / ln(1 + max_count)
pub fn log_normalized_frequency(count: u64, max_count: u64) -> f64 {
    if max_count == 0 {
        return 0.0;
    }
    let value = (1.0 + count as f64).ln() / (1.0 + max_count as f64).ln();
    value.clamp(0.0, 1.0)
}

/// Map a normalized frequency onto an IRT difficulty: the most frequent
/// token lands at THETA_MIN (easiest), a hapax near THETA_MAX
pub fn frequency_to_difficulty(normalized_frequency: f64) -> f64 {
    let f = normalized_frequency.clamp(0.0, 1.0);
    THETA_MAX - f * (THETA_MAX - THETA_MIN)
}

/// Pointwise mutual information in bits
pub fn pmi(pair_count: u64, count_a: u64, count_b: u64, total: u64) -> Result<f64> {
    if total == 0 || count_a == 0 || count_b == 0 {
        return Err(LogosError::InvalidInput(
            "PMI needs non-zero marginal counts".to_string(),
        ));
    }
    if pair_count == 0 {
        return Ok(f64::NEG_INFINITY);
    }
    let p_ab = pair_count as f64 / total as f64;
    let p_a = count_a as f64 / total as f64;
    let p_b = count_b as f64 / total as f64;
    Ok((p_ab / (p_a * p_b)).log2())
}

/// Normalized PMI in [-1, +1]: pmi / -log2(p(a, b)); a pair that always
/// co-occurs scores +1
pub fn npmi(pair_count: u64, count_a: u64, count_b: u64, total: u64) -> Result<f64> {
    let raw = pmi(pair_count, count_a, count_b, total)?;
    if raw == f64::NEG_INFINITY {
        return Ok(-1.0);
    }
    let p_ab = pair_count as f64 / total as f64;
    if p_ab >= 1.0 {
        return Ok(1.0);
    }
    Ok((raw / -p_ab.log2()).clamp(-1.0, 1.0))
}

/// Significance of a co-occurrence count in [0, 1], saturating
pub fn cooccurrence_significance(pair_count: u64) -> f64 {
    log_normalized_frequency(pair_count, SIGNIFICANCE_SATURATION)
}

/// Read-only frequency and co-occurrence statistics for one goal's
/// corpus. Loaded once from ingestion output and queried in place; not
/// itself a persisted format.
#[derive(Debug, Clone)]
pub struct CorpusStats {
    total_tokens: u64,
    max_frequency: u64,
    frequencies: HashMap<String, u64>,
    pair_counts: HashMap<(String, String), u64>,
}

impl CorpusStats {
    /// Build from raw counts; pair keys are canonicalized so that the
    /// unordered pair (a, b) and (b, a) share one entry
    pub fn from_counts(
        frequencies: HashMap<String, u64>,
        pairs: impl IntoIterator<Item = ((String, String), u64)>,
    ) -> Result<Self> {
        let total_tokens: u64 = frequencies.values().sum();
        if total_tokens == 0 {
            return Err(LogosError::InvalidInput(
                "corpus has no tokens".to_string(),
            ));
        }
        let max_frequency = frequencies.values().copied().max().unwrap_or(0);
        let mut pair_counts = HashMap::new();
        for ((a, b), count) in pairs {
            if a == b {
                continue;
            }
            let key = if a <= b { (a, b) } else { (b, a) };
            *pair_counts.entry(key).or_insert(0) += count;
        }
        Ok(Self {
            total_tokens,
            max_frequency,
            frequencies,
            pair_counts,
        })
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn frequency_of(&self, token: &str) -> u64 {
        self.frequencies.get(token).copied().unwrap_or(0)
    }

    /// Log-normalized frequency of a token against the corpus maximum
    pub fn normalized_frequency(&self, token: &str) -> f64 {
        log_normalized_frequency(self.frequency_of(token), self.max_frequency)
    }

    /// Difficulty seed for a token, frequent tokens mapping easy
    pub fn difficulty_seed(&self, token: &str) -> f64 {
        frequency_to_difficulty(self.normalized_frequency(token))
    }

    pub fn pair_count(&self, a: &str, b: &str) -> u64 {
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        self.pair_counts.get(&key).copied().unwrap_or(0)
    }

    /// NPMI of a token pair, None when either token is unseen
    pub fn npmi_of(&self, a: &str, b: &str) -> Option<f64> {
        let count_a = self.frequency_of(a);
        let count_b = self.frequency_of(b);
        if count_a == 0 || count_b == 0 {
            return None;
        }
        npmi(self.pair_count(a, b), count_a, count_b, self.total_tokens).ok()
    }

    /// All stored pairs involving a token, with NPMI and significance
    pub fn collocates_of(&self, token: &str) -> Vec<(String, f64, f64)> {
        self.pair_counts
            .iter()
            .filter_map(|((a, b), &count)| {
                let other = if a == token {
                    b
                } else if b == token {
                    a
                } else {
                    return None;
                };
                let npmi = self.npmi_of(token, other)?;
                Some((other.clone(), npmi, cooccurrence_significance(count)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> CorpusStats {
        let mut frequencies = HashMap::new();
        frequencies.insert("myocardial".to_string(), 40);
        frequencies.insert("infarction".to_string(), 35);
        frequencies.insert("patient".to_string(), 200);
        frequencies.insert("acute".to_string(), 80);
        CorpusStats::from_counts(
            frequencies,
            vec![
                (("myocardial".to_string(), "infarction".to_string()), 30),
                (("acute".to_string(), "patient".to_string()), 5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_log_normalized_frequency_bounds() {
        assert_eq!(log_normalized_frequency(0, 100), 0.0);
        assert!((log_normalized_frequency(100, 100) - 1.0).abs() < 1e-12);
        let mid = log_normalized_frequency(10, 100);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_frequency_to_difficulty_endpoints() {
        assert_eq!(frequency_to_difficulty(1.0), THETA_MIN);
        assert_eq!(frequency_to_difficulty(0.0), THETA_MAX);
        assert_eq!(frequency_to_difficulty(0.5), 0.0);
    }

    #[test]
    fn test_npmi_strong_collocation() {
        let stats = sample_stats();
        let strong = stats.npmi_of("myocardial", "infarction").unwrap();
        let weak = stats.npmi_of("acute", "patient").unwrap();
        assert!(strong > weak);
        assert!(strong > 0.0 && strong <= 1.0);
    }

    #[test]
    fn test_npmi_unseen_pair_is_minus_one() {
        let stats = sample_stats();
        let value = stats.npmi_of("myocardial", "patient").unwrap();
        assert_eq!(value, -1.0);
    }

    #[test]
    fn test_pmi_rejects_zero_marginals() {
        assert!(pmi(1, 0, 5, 100).is_err());
        assert!(pmi(1, 5, 5, 0).is_err());
    }

    #[test]
    fn test_pair_order_is_canonical() {
        let stats = sample_stats();
        assert_eq!(
            stats.pair_count("infarction", "myocardial"),
            stats.pair_count("myocardial", "infarction")
        );
    }

    #[test]
    fn test_significance_saturates() {
        assert!(cooccurrence_significance(1) > 0.0);
        assert!((cooccurrence_significance(50) - 1.0).abs() < 1e-12);
        assert_eq!(cooccurrence_significance(500), 1.0);
    }

    #[test]
    fn test_collocates_of_lists_neighbors() {
        let stats = sample_stats();
        let collocates = stats.collocates_of("myocardial");
        assert_eq!(collocates.len(), 1);
        assert_eq!(collocates[0].0, "infarction");
    }
}
