//! Execution state machine tests
//!
//! Transition table checks plus properties of the phase machine and of
//! progress reporting across skipped files.

use proptest::prelude::*;
use scene_batch_core::manager::progress_after;
use scene_batch_core::prelude::*;
use scene_batch_core::state::{allowed_transitions, validate_transition};
use scene_batch_core::ExecutionPhase;
use scene_batch_test_utils::{RecordingScene, SpyLog, SpyTask};
use std::path::PathBuf;
use std::sync::Arc;

fn phase() -> impl Strategy<Value = ExecutionPhase> {
    prop_oneof![
        Just(ExecutionPhase::Idle),
        Just(ExecutionPhase::Opening),
        Just(ExecutionPhase::Checkout),
        (0usize..4).prop_map(ExecutionPhase::RunningTask),
    ]
}

#[test]
fn test_idle_transitions() {
    assert!(validate_transition(ExecutionPhase::Idle, ExecutionPhase::Opening).is_ok());
    assert!(validate_transition(ExecutionPhase::Idle, ExecutionPhase::Checkout).is_ok());
    assert!(validate_transition(ExecutionPhase::Idle, ExecutionPhase::Idle).is_ok());

    // Tasks only run after the document step
    assert!(validate_transition(ExecutionPhase::Idle, ExecutionPhase::RunningTask(0)).is_err());
}

#[test]
fn test_running_task_transitions() {
    assert!(
        validate_transition(ExecutionPhase::RunningTask(2), ExecutionPhase::RunningTask(3)).is_ok()
    );
    assert!(validate_transition(ExecutionPhase::RunningTask(2), ExecutionPhase::Idle).is_ok());

    assert!(
        validate_transition(ExecutionPhase::RunningTask(2), ExecutionPhase::RunningTask(2)).is_err()
    );
    assert!(validate_transition(ExecutionPhase::RunningTask(2), ExecutionPhase::Opening).is_err());
}

proptest! {
    #[test]
    fn prop_all_transitions_are_subset_of_allowed(from in phase(), to in phase()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
            let err = res.unwrap_err();
            prop_assert_eq!(err.from, from);
            prop_assert_eq!(err.to, to);
        }
    }

    #[test]
    fn prop_every_phase_can_return_to_idle(from in phase()) {
        prop_assert!(validate_transition(from, ExecutionPhase::Idle).is_ok());
    }

    #[test]
    fn prop_progress_skips_keep_denominator(
        present in prop::collection::vec(any::<bool>(), 1..12)
    ) {
        let files: Vec<PathBuf> = (0..present.len())
            .map(|i| PathBuf::from(format!("file_{i}.ma")))
            .collect();
        let existing: Vec<PathBuf> = files
            .iter()
            .zip(&present)
            .filter(|(_, exists)| **exists)
            .map(|(path, _)| path.clone())
            .collect();

        let scene = Arc::new(RecordingScene::default().with_files(existing.clone()));
        let manager = TaskManager::new(scene, &TaskRegistry::global());
        let log = SpyLog::default();
        manager.push(make_task(SpyTask::new("p", &log)).unwrap()).unwrap();

        let mut reported = Vec::new();
        let summary = manager.execute(
            &files,
            ExecuteOptions::new()
                .with_post_callback(|path, p| reported.push((path.to_path_buf(), p))),
        );

        prop_assert_eq!(summary.total(), files.len());
        prop_assert_eq!(summary.skipped(), files.len() - existing.len());
        prop_assert_eq!(log.lock().len(), existing.len());
        prop_assert_eq!(reported.len(), existing.len());

        for (path, progress) in &reported {
            let index = files.iter().position(|f| f == path).unwrap();
            prop_assert!((progress - progress_after(index, files.len())).abs() < 1e-9);
        }
        for pair in reported.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].1);
        }
        if present.last() == Some(&true) {
            prop_assert!((reported.last().unwrap().1 - 100.0).abs() < 1e-9);
        }
        prop_assert!(manager.phase().is_idle());
    }
}
