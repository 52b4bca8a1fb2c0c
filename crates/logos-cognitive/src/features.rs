//! z(w) task matching
//!
//! Maps a language object's seven-component feature vector onto the task
//! palette through a static affinity matrix, restricted by mastery-stage
//! availability, and chooses the presentation modality from the dominant
//! component. Tasks a stage has not unlocked are damped rather than
//! excluded so that the ranking keeps a gradient toward them.

use logos_core::entities::{ZComponent, ZVector};
use logos_types::{MasteryStage, TaskFormat, TaskModality, TaskType};

/// Damping applied to tasks outside the stage's availability set
const UNAVAILABLE_DAMPING: f64 = 0.1;

/// Affinity row for one task type, in z(w) persistence order
/// (F, R, D, M, P, PRAG, SYNT)
fn affinity_row(task: TaskType) -> [f64; 7] {
    match task {
        TaskType::Recognition => [0.9, 0.2, 0.3, 0.1, 0.3, 0.1, 0.1],
        TaskType::DefinitionMatch => [0.8, 0.3, 0.4, 0.2, 0.1, 0.2, 0.1],
        TaskType::MultipleChoice => [0.7, 0.3, 0.5, 0.2, 0.2, 0.2, 0.2],
        TaskType::Cloze => [0.6, 0.6, 0.5, 0.3, 0.1, 0.3, 0.4],
        TaskType::CollocationMatch => [0.4, 0.9, 0.3, 0.2, 0.1, 0.2, 0.2],
        TaskType::WordFormation => [0.3, 0.2, 0.4, 0.9, 0.2, 0.1, 0.2],
        TaskType::SentenceCompletion => [0.5, 0.5, 0.4, 0.3, 0.1, 0.3, 0.6],
        TaskType::ErrorCorrection => [0.3, 0.3, 0.5, 0.5, 0.2, 0.3, 0.7],
        TaskType::Paraphrase => [0.4, 0.5, 0.5, 0.3, 0.1, 0.5, 0.6],
        TaskType::RegisterShift => [0.2, 0.3, 0.4, 0.2, 0.1, 0.9, 0.4],
        TaskType::SentenceCombining => [0.2, 0.3, 0.4, 0.2, 0.1, 0.3, 0.9],
        TaskType::TranslationSpot => [0.5, 0.4, 0.6, 0.4, 0.2, 0.4, 0.4],
        TaskType::ListeningDiscrimination => [0.4, 0.2, 0.3, 0.2, 0.9, 0.2, 0.2],
        TaskType::PronunciationContrast => [0.3, 0.1, 0.3, 0.3, 0.95, 0.1, 0.1],
        TaskType::FreeProduction => [0.4, 0.5, 0.4, 0.3, 0.2, 0.6, 0.6],
        TaskType::DialogueCompletion => [0.3, 0.4, 0.3, 0.2, 0.3, 0.8, 0.4],
        TaskType::GenreTransform => [0.2, 0.3, 0.4, 0.2, 0.1, 0.85, 0.5],
    }
}

/// Affinity of one z component for one task type
pub fn affinity(task: TaskType, component: ZComponent) -> f64 {
    let row = affinity_row(task);
    let index = ZComponent::ORDER
        .iter()
        .position(|c| *c == component)
        .unwrap_or(0);
    row[index]
}

/// Task types practicable at a mastery stage. Each stage adds to the
/// previous one; stage 4 unlocks the full 17-type palette.
pub fn stage_availability(stage: MasteryStage) -> &'static [TaskType] {
    use TaskType::*;
    match stage {
        MasteryStage::Unknown => &[Recognition, DefinitionMatch],
        MasteryStage::Recognition => &[
            Recognition,
            DefinitionMatch,
            MultipleChoice,
            Cloze,
            CollocationMatch,
            ListeningDiscrimination,
        ],
        MasteryStage::Recall => &[
            Recognition,
            DefinitionMatch,
            MultipleChoice,
            Cloze,
            CollocationMatch,
            ListeningDiscrimination,
            WordFormation,
            SentenceCompletion,
            TranslationSpot,
            PronunciationContrast,
        ],
        MasteryStage::Production => &[
            Recognition,
            DefinitionMatch,
            MultipleChoice,
            Cloze,
            CollocationMatch,
            ListeningDiscrimination,
            WordFormation,
            SentenceCompletion,
            TranslationSpot,
            PronunciationContrast,
            ErrorCorrection,
            Paraphrase,
            FreeProduction,
            DialogueCompletion,
        ],
        MasteryStage::Automatic => &TaskType::ALL,
    }
}

/// Suitability of a task for an object's feature vector: the
/// affinity-weighted mean of the z components
pub fn suitability(task: TaskType, z: &ZVector) -> f64 {
    let row = affinity_row(task);
    let weighted: f64 = ZComponent::ORDER
        .iter()
        .zip(row.iter())
        .map(|(component, weight)| weight * z.component(*component))
        .sum();
    let mass: f64 = row.iter().sum();
    if mass <= 0.0 {
        0.0
    } else {
        weighted / mass
    }
}

/// All task types ranked for an object at a stage, best first.
/// Unavailable tasks stay in the ranking at a tenth of their score.
pub fn rank_tasks(z: &ZVector, stage: MasteryStage) -> Vec<(TaskType, f64)> {
    let available = stage_availability(stage);
    let mut ranked: Vec<(TaskType, f64)> = TaskType::ALL
        .iter()
        .map(|task| {
            let base = suitability(*task, z);
            let score = if available.contains(task) {
                base
            } else {
                base * UNAVAILABLE_DAMPING
            };
            (*task, score)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Best task for an object at a stage
pub fn select_task(z: &ZVector, stage: MasteryStage) -> TaskType {
    rank_tasks(z, stage)
        .first()
        .map(|(task, _)| *task)
        .unwrap_or(TaskType::Recognition)
}

/// Presentation modality from the dominant z component: phonological
/// objects go auditory, pragmatic objects mixed, everything else visual
pub fn select_modality(z: &ZVector) -> TaskModality {
    match z.dominant() {
        ZComponent::Phonological => TaskModality::Auditory,
        ZComponent::Pragmatic => TaskModality::Mixed,
        _ => TaskModality::Visual,
    }
}

/// Response format a task type asks for
pub fn task_format(task: TaskType) -> TaskFormat {
    use TaskType::*;
    match task {
        Recognition | DefinitionMatch | MultipleChoice | CollocationMatch
        | ListeningDiscrimination => TaskFormat::SelectedResponse,
        Cloze | WordFormation | SentenceCompletion | ErrorCorrection | TranslationSpot
        | PronunciationContrast => TaskFormat::ConstructedResponse,
        Paraphrase | RegisterShift | SentenceCombining | FreeProduction | DialogueCompletion
        | GenreTransform => TaskFormat::Production,
    }
}

/// Enforce batch variety: no more than `max_per_type` consecutive tasks
/// of one type. Each queue position offers its ranked alternatives; when
/// the best choice would extend a run past the cap, the best alternative
/// of a different type is substituted.
pub fn enforce_variety(
    ranked_per_item: &[Vec<(TaskType, f64)>],
    max_per_type: usize,
) -> Vec<TaskType> {
    let mut chosen = Vec::with_capacity(ranked_per_item.len());
    let mut run_type: Option<TaskType> = None;
    let mut run_length = 0usize;

    for alternatives in ranked_per_item {
        let mut pick = alternatives.first().map(|(task, _)| *task);
        if let (Some(best), Some(current)) = (pick, run_type) {
            if best == current && run_length >= max_per_type {
                pick = alternatives
                    .iter()
                    .map(|(task, _)| *task)
                    .find(|task| *task != current)
                    .or(pick);
            }
        }
        let task = pick.unwrap_or(TaskType::Recognition);
        if run_type == Some(task) {
            run_length += 1;
        } else {
            run_type = Some(task);
            run_length = 1;
        }
        chosen.push(task);
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_formation_heavy() -> ZVector {
        ZVector::new(0.2, 0.1, 0.3, 0.95, 0.1, 0.1, 0.1)
    }

    #[test]
    fn test_stage_zero_restricts_palette() {
        let available = stage_availability(MasteryStage::Unknown);
        assert_eq!(available, &[TaskType::Recognition, TaskType::DefinitionMatch]);
        assert_eq!(stage_availability(MasteryStage::Automatic).len(), 17);
    }

    #[test]
    fn test_availability_grows_monotonically() {
        let mut previous = 0;
        for stage in [
            MasteryStage::Unknown,
            MasteryStage::Recognition,
            MasteryStage::Recall,
            MasteryStage::Production,
            MasteryStage::Automatic,
        ] {
            let count = stage_availability(stage).len();
            assert!(count >= previous);
            previous = count;
        }
    }

    #[test]
    fn test_morphology_heavy_object_prefers_word_formation() {
        let z = word_formation_heavy();
        assert_eq!(select_task(&z, MasteryStage::Recall), TaskType::WordFormation);
    }

    #[test]
    fn test_unavailable_task_damped_not_excluded() {
        let z = word_formation_heavy();
        // At stage 0 word formation is locked; it must still appear in
        // the ranking with a non-zero score
        let ranked = rank_tasks(&z, MasteryStage::Unknown);
        let word_formation = ranked
            .iter()
            .find(|(task, _)| *task == TaskType::WordFormation)
            .unwrap();
        assert!(word_formation.1 > 0.0);
        let best = ranked.first().unwrap();
        assert!(stage_availability(MasteryStage::Unknown).contains(&best.0));
    }

    #[test]
    fn test_modality_selection() {
        let phonological = ZVector::new(0.2, 0.1, 0.3, 0.2, 0.9, 0.1, 0.1);
        assert_eq!(select_modality(&phonological), TaskModality::Auditory);
        let pragmatic = ZVector::new(0.2, 0.1, 0.3, 0.2, 0.1, 0.9, 0.1);
        assert_eq!(select_modality(&pragmatic), TaskModality::Mixed);
        let lexical = ZVector::new(0.9, 0.1, 0.3, 0.2, 0.1, 0.2, 0.1);
        assert_eq!(select_modality(&lexical), TaskModality::Visual);
    }

    #[test]
    fn test_variety_cap_substitutes_alternatives() {
        let z = word_formation_heavy();
        let ranked = rank_tasks(&z, MasteryStage::Automatic);
        let per_item: Vec<_> = (0..8).map(|_| ranked.clone()).collect();
        let chosen = enforce_variety(&per_item, 2);
        assert_eq!(chosen.len(), 8);

        let mut run = 1;
        for window in chosen.windows(2) {
            if window[0] == window[1] {
                run += 1;
                assert!(run <= 2, "variety cap violated: {:?}", chosen);
            } else {
                run = 1;
            }
        }
        // The dominant type still appears, just not more than twice in a row
        assert!(chosen.contains(&TaskType::WordFormation));
    }

    #[test]
    fn test_suitability_bounded() {
        let z = ZVector::new(1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
        for task in TaskType::ALL {
            let s = suitability(task, &z);
            assert!((0.0..=1.0).contains(&s));
        }
    }
}
