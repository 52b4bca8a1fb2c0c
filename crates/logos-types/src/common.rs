//! Closed-set vocabulary shared across the LOGOS crates
//!
//! Linguistic components, mastery stages, modalities, task types, FSRS
//! ratings and card states are all closed sets; they are modeled as plain
//! enums and behavior is attached via pattern matching at the use sites.

use serde::{Deserialize, Serialize};

/// Lower clamp for ability estimates on the logit scale.
///
/// Widened from the conventional [-3, +3] so that novice and expert tails
/// of professional ESL populations remain representable without saturating
/// the estimator.
pub const THETA_MIN: f64 = -4.0;

/// Upper clamp for ability estimates on the logit scale. See [`THETA_MIN`].
pub const THETA_MAX: f64 = 4.0;

/// Clamp an ability value to the supported logit range.
pub fn clamp_theta(theta: f64) -> f64 {
    theta.clamp(THETA_MIN, THETA_MAX)
}

/// Linguistic components tracked by the ability profile and the
/// bottleneck detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinguisticComponent {
    Phonology,
    Morphology,
    Lexis,
    Syntax,
    Pragmatics,
}

/// Processing order used by the cascade detector: errors upstream tend to
/// surface as errors downstream.
pub const CASCADE_ORDER: [LinguisticComponent; 5] = [
    LinguisticComponent::Phonology,
    LinguisticComponent::Morphology,
    LinguisticComponent::Lexis,
    LinguisticComponent::Syntax,
    LinguisticComponent::Pragmatics,
];

impl LinguisticComponent {
    /// Position of this component in the cascade, 0 = most upstream
    pub fn cascade_index(&self) -> usize {
        CASCADE_ORDER
            .iter()
            .position(|c| c == self)
            .unwrap_or(CASCADE_ORDER.len())
    }

    /// Components strictly upstream of this one in the cascade
    pub fn upstream(&self) -> &'static [LinguisticComponent] {
        &CASCADE_ORDER[..self.cascade_index()]
    }
}

impl std::fmt::Display for LinguisticComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinguisticComponent::Phonology => write!(f, "PHON"),
            LinguisticComponent::Morphology => write!(f, "MORPH"),
            LinguisticComponent::Lexis => write!(f, "LEX"),
            LinguisticComponent::Syntax => write!(f, "SYNT"),
            LinguisticComponent::Pragmatics => write!(f, "PRAG"),
        }
    }
}

/// Kinds of language objects a goal can own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Lexical,
    Morphological,
    GraphemePhoneme,
    Syntactic,
    Pragmatic,
}

impl ObjectType {
    /// Linguistic component this object type exercises
    pub fn component(&self) -> LinguisticComponent {
        match self {
            ObjectType::Lexical => LinguisticComponent::Lexis,
            ObjectType::Morphological => LinguisticComponent::Morphology,
            ObjectType::GraphemePhoneme => LinguisticComponent::Phonology,
            ObjectType::Syntactic => LinguisticComponent::Syntax,
            ObjectType::Pragmatic => LinguisticComponent::Pragmatics,
        }
    }
}

/// Language-use modalities a goal can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modality {
    Reading,
    Listening,
    Writing,
    Speaking,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Reading,
        Modality::Listening,
        Modality::Writing,
        Modality::Speaking,
    ];
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modality::Reading => write!(f, "reading"),
            Modality::Listening => write!(f, "listening"),
            Modality::Writing => write!(f, "writing"),
            Modality::Speaking => write!(f, "speaking"),
        }
    }
}

/// Presentation channel chosen for a generated task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskModality {
    Visual,
    Auditory,
    Mixed,
}

/// Professional domains a goal can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    Medical,
    Legal,
    Business,
    Academic,
    General,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Medical,
        Domain::Legal,
        Domain::Business,
        Domain::Academic,
        Domain::General,
    ];
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Medical => write!(f, "medical"),
            Domain::Legal => write!(f, "legal"),
            Domain::Business => write!(f, "business"),
            Domain::Academic => write!(f, "academic"),
            Domain::General => write!(f, "general"),
        }
    }
}

/// Mastery stages from first exposure to automatic use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MasteryStage {
    Unknown = 0,
    Recognition = 1,
    Recall = 2,
    Production = 3,
    Automatic = 4,
}

impl MasteryStage {
    pub fn index(&self) -> u8 {
        *self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(MasteryStage::Unknown),
            1 => Some(MasteryStage::Recognition),
            2 => Some(MasteryStage::Recall),
            3 => Some(MasteryStage::Production),
            4 => Some(MasteryStage::Automatic),
            _ => None,
        }
    }

    /// Next stage up, saturating at Automatic
    pub fn next(&self) -> MasteryStage {
        MasteryStage::from_index(self.index() + 1).unwrap_or(MasteryStage::Automatic)
    }

    /// Previous stage down, saturating at Unknown
    pub fn prev(&self) -> MasteryStage {
        match self {
            MasteryStage::Unknown => MasteryStage::Unknown,
            other => MasteryStage::from_index(other.index() - 1).unwrap_or(MasteryStage::Unknown),
        }
    }
}

impl std::fmt::Display for MasteryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasteryStage::Unknown => write!(f, "unknown"),
            MasteryStage::Recognition => write!(f, "recognition"),
            MasteryStage::Recall => write!(f, "recall"),
            MasteryStage::Production => write!(f, "production"),
            MasteryStage::Automatic => write!(f, "automatic"),
        }
    }
}

/// The full task-type palette available at stage 4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskType {
    Recognition,
    DefinitionMatch,
    MultipleChoice,
    Cloze,
    CollocationMatch,
    WordFormation,
    SentenceCompletion,
    ErrorCorrection,
    Paraphrase,
    RegisterShift,
    SentenceCombining,
    TranslationSpot,
    ListeningDiscrimination,
    PronunciationContrast,
    FreeProduction,
    DialogueCompletion,
    GenreTransform,
}

impl TaskType {
    pub const ALL: [TaskType; 17] = [
        TaskType::Recognition,
        TaskType::DefinitionMatch,
        TaskType::MultipleChoice,
        TaskType::Cloze,
        TaskType::CollocationMatch,
        TaskType::WordFormation,
        TaskType::SentenceCompletion,
        TaskType::ErrorCorrection,
        TaskType::Paraphrase,
        TaskType::RegisterShift,
        TaskType::SentenceCombining,
        TaskType::TranslationSpot,
        TaskType::ListeningDiscrimination,
        TaskType::PronunciationContrast,
        TaskType::FreeProduction,
        TaskType::DialogueCompletion,
        TaskType::GenreTransform,
    ];
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Recognition => write!(f, "recognition"),
            TaskType::DefinitionMatch => write!(f, "definition_match"),
            TaskType::MultipleChoice => write!(f, "multiple_choice"),
            TaskType::Cloze => write!(f, "cloze"),
            TaskType::CollocationMatch => write!(f, "collocation_match"),
            TaskType::WordFormation => write!(f, "word_formation"),
            TaskType::SentenceCompletion => write!(f, "sentence_completion"),
            TaskType::ErrorCorrection => write!(f, "error_correction"),
            TaskType::Paraphrase => write!(f, "paraphrase"),
            TaskType::RegisterShift => write!(f, "register_shift"),
            TaskType::SentenceCombining => write!(f, "sentence_combining"),
            TaskType::TranslationSpot => write!(f, "translation_spot"),
            TaskType::ListeningDiscrimination => write!(f, "listening_discrimination"),
            TaskType::PronunciationContrast => write!(f, "pronunciation_contrast"),
            TaskType::FreeProduction => write!(f, "free_production"),
            TaskType::DialogueCompletion => write!(f, "dialogue_completion"),
            TaskType::GenreTransform => write!(f, "genre_transform"),
        }
    }
}

/// Response format a task asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskFormat {
    SelectedResponse,
    ConstructedResponse,
    Production,
}

/// Amount of scaffolding shown with a task, 0 (none) to 3 (maximum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CueLevel {
    None = 0,
    Minimal = 1,
    Moderate = 2,
    Maximum = 3,
}

impl CueLevel {
    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(CueLevel::None),
            1 => Some(CueLevel::Minimal),
            2 => Some(CueLevel::Moderate),
            3 => Some(CueLevel::Maximum),
            _ => None,
        }
    }
}

/// FSRS review rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub fn grade(&self) -> u8 {
        *self as u8
    }
}

/// FSRS card lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardState {
    New,
    Learning,
    Review,
    Relearning,
}

/// Session modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    Learning,
    Training,
    Evaluation,
}

/// Speed expectation class of a task, used by the response-timing
/// classifier. Distinct from [`InteractionCategory`], which classifies
/// what an encounter exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingCategory {
    Recognition,
    Recall,
    Production,
}

/// Whether an encounter exercised interpretation (input) or production
/// (output). Distinct from [`TimingCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InteractionCategory {
    Interpretation,
    Production,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theta_clamping() {
        assert_eq!(clamp_theta(5.2), THETA_MAX);
        assert_eq!(clamp_theta(-7.0), THETA_MIN);
        assert_eq!(clamp_theta(1.25), 1.25);
    }

    #[test]
    fn test_cascade_order_upstream() {
        assert!(LinguisticComponent::Phonology.upstream().is_empty());
        assert_eq!(
            LinguisticComponent::Lexis.upstream(),
            &[
                LinguisticComponent::Phonology,
                LinguisticComponent::Morphology
            ]
        );
        assert_eq!(LinguisticComponent::Pragmatics.upstream().len(), 4);
    }

    #[test]
    fn test_stage_roundtrip_and_saturation() {
        for i in 0..=4u8 {
            assert_eq!(MasteryStage::from_index(i).unwrap().index(), i);
        }
        assert!(MasteryStage::from_index(5).is_none());
        assert_eq!(MasteryStage::Automatic.next(), MasteryStage::Automatic);
        assert_eq!(MasteryStage::Unknown.prev(), MasteryStage::Unknown);
        assert_eq!(MasteryStage::Recall.prev(), MasteryStage::Recognition);
    }

    #[test]
    fn test_task_palette_size() {
        assert_eq!(TaskType::ALL.len(), 17);
    }

    #[test]
    fn test_object_type_component_mapping() {
        assert_eq!(
            ObjectType::GraphemePhoneme.component(),
            LinguisticComponent::Phonology
        );
        assert_eq!(ObjectType::Lexical.component(), LinguisticComponent::Lexis);
    }
}
