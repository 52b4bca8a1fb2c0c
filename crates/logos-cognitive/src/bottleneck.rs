//! Bottleneck and cascade detection
//!
//! Classifies recent errors by linguistic component, tracks per-component
//! error rates and trends over a rolling window, and walks the
//! PHON -> MORPH -> LEX -> SYNT -> PRAG cascade to re-root a downstream
//! bottleneck onto the upstream component that co-occurs with it. The
//! resulting evidence feeds both learner-facing recommendations and the
//! priority boost.

use logos_types::{LinguisticComponent, CASCADE_ORDER};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use uuid::Uuid;

/// Detector tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleneckConfig {
    /// Rolling window size per component
    pub window: usize,
    /// Error rate above which a component qualifies as a bottleneck
    pub error_threshold: f64,
    /// Minimum responses before a component is judged at all
    pub min_responses: usize,
    /// Jaccard co-occurrence above which an upstream component is held
    /// responsible for downstream errors
    pub jaccard_threshold: f64,
    /// Error patterns reported per component
    pub top_patterns: usize,
}

impl Default for BottleneckConfig {
    fn default() -> Self {
        Self {
            window: 20,
            error_threshold: 0.3,
            min_responses: 5,
            jaccard_threshold: 0.5,
            top_patterns: 3,
        }
    }
}

/// One component-classified outcome from a scored response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentOutcome {
    pub response_id: Uuid,
    pub component: LinguisticComponent,
    pub correct: bool,
    /// Label of the observed error pattern, when one was identified
    pub error_pattern: Option<String>,
}

/// Evidence for one component in a detection report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentEvidence {
    pub error_rate: f64,
    pub sample_size: usize,
    /// Most frequent error patterns, descending
    pub error_patterns: Vec<String>,
    /// Components whose errors co-occur with this one's above threshold
    pub co_occurring: Vec<LinguisticComponent>,
    /// Signed slope of the error indicator over the window; negative
    /// means improving
    pub improvement_trend: f64,
}

/// A detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleneckReport {
    pub primary: LinguisticComponent,
    /// Component that had the raw maximum error rate before cascade
    /// re-rooting
    pub surface: LinguisticComponent,
    pub confidence: f64,
    pub evidence: BTreeMap<LinguisticComponent, ComponentEvidence>,
}

/// Rolling-window detector over component-classified outcomes
#[derive(Debug, Clone)]
pub struct BottleneckDetector {
    config: BottleneckConfig,
    windows: BTreeMap<LinguisticComponent, VecDeque<ComponentOutcome>>,
}

impl BottleneckDetector {
    pub fn new(config: BottleneckConfig) -> Self {
        Self {
            config,
            windows: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, outcome: ComponentOutcome) {
        let window = self.windows.entry(outcome.component).or_default();
        window.push_back(outcome);
        if window.len() > self.config.window {
            window.pop_front();
        }
    }

    pub fn sample_size(&self, component: LinguisticComponent) -> usize {
        self.windows.get(&component).map_or(0, VecDeque::len)
    }

    pub fn error_rate(&self, component: LinguisticComponent) -> f64 {
        let Some(window) = self.windows.get(&component) else {
            return 0.0;
        };
        if window.is_empty() {
            return 0.0;
        }
        let errors = window.iter().filter(|o| !o.correct).count();
        errors as f64 / window.len() as f64
    }

    /// Least-squares slope of the error indicator over window position;
    /// positive means errors are becoming more frequent
    pub fn improvement_trend(&self, component: LinguisticComponent) -> f64 {
        let Some(window) = self.windows.get(&component) else {
            return 0.0;
        };
        let n = window.len();
        if n < 2 {
            return 0.0;
        }
        let mean_x = (n - 1) as f64 / 2.0;
        let mean_y = self.error_rate(component);
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, outcome) in window.iter().enumerate() {
            let x = i as f64 - mean_x;
            let y = if outcome.correct { 0.0 } else { 1.0 };
            numerator += x * (y - mean_y);
            denominator += x * x;
        }
        if denominator <= 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }

    fn error_ids(&self, component: LinguisticComponent) -> HashSet<Uuid> {
        self.windows
            .get(&component)
            .map(|window| {
                window
                    .iter()
                    .filter(|o| !o.correct)
                    .map(|o| o.response_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Jaccard index of the error response-id sets of two components
    pub fn error_jaccard(&self, a: LinguisticComponent, b: LinguisticComponent) -> f64 {
        let errors_a = self.error_ids(a);
        let errors_b = self.error_ids(b);
        let intersection = errors_a.intersection(&errors_b).count();
        let union = errors_a.union(&errors_b).count();
        if union == 0 {
            0.0
        } else {
            intersection as f64 / union as f64
        }
    }

    fn top_patterns(&self, component: LinguisticComponent) -> Vec<String> {
        let Some(window) = self.windows.get(&component) else {
            return Vec::new();
        };
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for outcome in window.iter().filter(|o| !o.correct) {
            if let Some(pattern) = &outcome.error_pattern {
                *counts.entry(pattern.as_str()).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(self.config.top_patterns)
            .map(|(pattern, _)| pattern.to_string())
            .collect()
    }

    fn evidence_for(&self, component: LinguisticComponent) -> ComponentEvidence {
        let co_occurring = CASCADE_ORDER
            .iter()
            .filter(|other| {
                **other != component
                    && self.error_jaccard(component, **other) >= self.config.jaccard_threshold
            })
            .copied()
            .collect();
        ComponentEvidence {
            error_rate: self.error_rate(component),
            sample_size: self.sample_size(component),
            error_patterns: self.top_patterns(component),
            co_occurring,
            improvement_trend: self.improvement_trend(component),
        }
    }

    /// Run detection over the current windows. Returns None while no
    /// component clears the error threshold with enough samples.
    pub fn analyze(&self) -> Option<BottleneckReport> {
        // Surface bottleneck: raw maximum error rate among qualified
        // components
        let surface = CASCADE_ORDER
            .iter()
            .filter(|c| {
                self.sample_size(**c) >= self.config.min_responses
                    && self.error_rate(**c) > self.config.error_threshold
            })
            .max_by(|a, b| {
                self.error_rate(**a)
                    .partial_cmp(&self.error_rate(**b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()?;

        // Cascade re-rooting: the most upstream qualified component whose
        // errors strongly co-occur with the surface component's
        let mut primary = surface;
        for upstream in surface.upstream() {
            let qualified = self.sample_size(*upstream) >= self.config.min_responses
                && self.error_rate(*upstream) > self.config.error_threshold;
            if qualified && self.error_jaccard(surface, *upstream) >= self.config.jaccard_threshold
            {
                primary = *upstream;
                break;
            }
        }

        let rate = self.error_rate(primary);
        let sample_share =
            (self.sample_size(primary) as f64 / self.config.window as f64).min(1.0);
        let co_strength = CASCADE_ORDER
            .iter()
            .filter(|c| **c != primary)
            .map(|c| self.error_jaccard(primary, *c))
            .fold(0.0_f64, f64::max);
        let confidence = (0.5 * rate + 0.3 * sample_share + 0.2 * co_strength).clamp(0.0, 1.0);

        let evidence = CASCADE_ORDER
            .iter()
            .filter(|c| self.sample_size(**c) > 0)
            .map(|c| (*c, self.evidence_for(*c)))
            .collect();

        Some(BottleneckReport {
            primary,
            surface,
            confidence,
            evidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(
        component: LinguisticComponent,
        correct: bool,
        response_id: Uuid,
        pattern: Option<&str>,
    ) -> ComponentOutcome {
        ComponentOutcome {
            response_id,
            component,
            correct,
            error_pattern: pattern.map(|p| p.to_string()),
        }
    }

    #[test]
    fn test_no_report_below_threshold() {
        let mut detector = BottleneckDetector::new(BottleneckConfig::default());
        for _ in 0..10 {
            detector.record(outcome(
                LinguisticComponent::Lexis,
                true,
                Uuid::new_v4(),
                None,
            ));
        }
        assert!(detector.analyze().is_none());
    }

    #[test]
    fn test_no_report_below_min_responses() {
        let mut detector = BottleneckDetector::new(BottleneckConfig::default());
        for _ in 0..3 {
            detector.record(outcome(
                LinguisticComponent::Lexis,
                false,
                Uuid::new_v4(),
                None,
            ));
        }
        assert!(detector.analyze().is_none());
    }

    #[test]
    fn test_simple_primary_detection() {
        let mut detector = BottleneckDetector::new(BottleneckConfig::default());
        for i in 0..10 {
            detector.record(outcome(
                LinguisticComponent::Morphology,
                i % 2 == 0,
                Uuid::new_v4(),
                Some("affix-misuse"),
            ));
            detector.record(outcome(
                LinguisticComponent::Lexis,
                i != 0,
                Uuid::new_v4(),
                None,
            ));
        }
        let report = detector.analyze().unwrap();
        assert_eq!(report.primary, LinguisticComponent::Morphology);
        assert!(report.confidence > 0.0);
        let evidence = &report.evidence[&LinguisticComponent::Morphology];
        assert_eq!(evidence.error_patterns, vec!["affix-misuse".to_string()]);
    }

    #[test]
    fn test_cascade_scenario() {
        // PHON error rate 0.5, MORPH 0.4 sharing response ids with PHON
        // (Jaccard ~0.7), LEX 0.1; the surface maximum is PHON and MORPH
        // lists PHON as co-occurring
        let mut detector = BottleneckDetector::new(BottleneckConfig::default());
        let ids: Vec<Uuid> = (0..20).map(|_| Uuid::new_v4()).collect();

        // PHON: errors on responses 0..10 (rate 0.5)
        for (i, id) in ids.iter().enumerate() {
            detector.record(outcome(
                LinguisticComponent::Phonology,
                i >= 10,
                *id,
                Some("vowel-contrast"),
            ));
        }
        // MORPH: errors on responses 0..8, all shared with PHON errors
        // (Jaccard 8/10 = 0.8), rate 0.4
        for (i, id) in ids.iter().enumerate() {
            detector.record(outcome(LinguisticComponent::Morphology, i >= 8, *id, None));
        }
        // LEX: one error in twenty
        for i in 0..20 {
            detector.record(outcome(
                LinguisticComponent::Lexis,
                i != 0,
                Uuid::new_v4(),
                None,
            ));
        }

        let report = detector.analyze().unwrap();
        assert_eq!(report.primary, LinguisticComponent::Phonology);
        let morph_evidence = &report.evidence[&LinguisticComponent::Morphology];
        assert!(
            morph_evidence
                .co_occurring
                .contains(&LinguisticComponent::Phonology),
            "MORPH evidence must list PHON as co-occurring: {:?}",
            morph_evidence.co_occurring
        );
    }

    #[test]
    fn test_cascade_reroots_to_upstream() {
        // Surface maximum in MORPH, but its errors co-occur with a
        // qualified PHON window: PHON becomes primary
        let config = BottleneckConfig {
            window: 10,
            ..BottleneckConfig::default()
        };
        let mut detector = BottleneckDetector::new(config);
        let shared: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();

        for i in 0..10 {
            // PHON: 5 errors, all shared ids
            let correct = i >= 5;
            let id = if !correct { shared[i] } else { Uuid::new_v4() };
            detector.record(outcome(LinguisticComponent::Phonology, correct, id, None));
        }
        for i in 0..10 {
            // MORPH: 6 errors, 5 shared with PHON errors
            let correct = i >= 6;
            let id = if !correct && i < 5 { shared[i] } else { Uuid::new_v4() };
            detector.record(outcome(LinguisticComponent::Morphology, correct, id, None));
        }

        let report = detector.analyze().unwrap();
        assert_eq!(report.surface, LinguisticComponent::Morphology);
        assert_eq!(report.primary, LinguisticComponent::Phonology);
    }

    #[test]
    fn test_window_rolls() {
        let config = BottleneckConfig {
            window: 5,
            min_responses: 3,
            ..BottleneckConfig::default()
        };
        let mut detector = BottleneckDetector::new(config);
        for _ in 0..5 {
            detector.record(outcome(
                LinguisticComponent::Syntax,
                false,
                Uuid::new_v4(),
                None,
            ));
        }
        assert_eq!(detector.error_rate(LinguisticComponent::Syntax), 1.0);
        for _ in 0..5 {
            detector.record(outcome(
                LinguisticComponent::Syntax,
                true,
                Uuid::new_v4(),
                None,
            ));
        }
        // Old errors rolled out of the window
        assert_eq!(detector.error_rate(LinguisticComponent::Syntax), 0.0);
        assert_eq!(detector.sample_size(LinguisticComponent::Syntax), 5);
    }

    #[test]
    fn test_improvement_trend_sign() {
        let mut detector = BottleneckDetector::new(BottleneckConfig::default());
        // Errors early, successes late: improving, negative slope
        for i in 0..10 {
            detector.record(outcome(
                LinguisticComponent::Pragmatics,
                i >= 5,
                Uuid::new_v4(),
                None,
            ));
        }
        assert!(detector.improvement_trend(LinguisticComponent::Pragmatics) < 0.0);
    }
}
