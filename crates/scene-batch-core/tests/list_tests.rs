//! Task list tests
//!
//! Back-reference wiring under arbitrary list mutation, registry lookups
//! and task-list documents built from the test package.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use scene_batch_core::persistence;
use scene_batch_core::prelude::*;
use scene_batch_core::registry::TaskPackage;
use scene_batch_core::tasks::core_package;
use scene_batch_core::{BatchConfig, ManagerError, PersistenceError, RegistryError};
use scene_batch_test_utils::{testing_package, AppendSuffixTask, RecordingScene};
use std::sync::Arc;

fn registry() -> Arc<TaskRegistry> {
    Arc::new(TaskRegistry::new(vec![core_package(), testing_package()]))
}

fn fields(value: serde_json::Value) -> TaskFields {
    value.as_object().cloned().unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Push(usize),
    Insert(usize, usize),
    Remove(usize),
    RemoveTask(usize),
    Move(usize, usize),
    Clear,
    Set(Vec<usize>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..5).prop_map(Op::Push),
        (0usize..8, 0usize..5).prop_map(|(i, t)| Op::Insert(i, t)),
        (0usize..8).prop_map(Op::Remove),
        (0usize..5).prop_map(Op::RemoveTask),
        (0usize..8, 0usize..8).prop_map(|(a, b)| Op::Move(a, b)),
        Just(Op::Clear),
        prop::collection::vec(0usize..5, 0..4).prop_map(Op::Set),
    ]
}

proptest! {
    #[test]
    fn prop_exactly_listed_tasks_are_attached(ops in prop::collection::vec(op(), 0..30)) {
        let registry = registry();
        let manager = TaskManager::new(Arc::new(RecordingScene::default()), &registry);
        let pool: Vec<TaskHandle> = (0..5)
            .map(|i| make_task(AppendSuffixTask::new(format!("-{i}"))).unwrap())
            .collect();

        for op in ops {
            // Out-of-range indices are rejected without side effects.
            let _ = match op {
                Op::Push(t) => manager.push(Arc::clone(&pool[t])),
                Op::Insert(i, t) => manager.insert(i, Arc::clone(&pool[t])),
                Op::Remove(i) => manager.remove(i).map(|_| ()),
                Op::RemoveTask(t) => {
                    manager.remove_task(&pool[t]);
                    Ok(())
                }
                Op::Move(a, b) => manager.move_task(a, b),
                Op::Clear => {
                    manager.clear();
                    Ok(())
                }
                Op::Set(ts) => manager.set_tasks(ts.into_iter().map(|t| Arc::clone(&pool[t]))),
            };

            for task in &pool {
                prop_assert_eq!(task.link().is_attached_to(&manager), manager.contains(task));
                prop_assert_eq!(task.link().is_attached(), manager.contains(task));
            }
        }
    }
}

#[test]
fn test_removed_task_never_points_at_manager() {
    let registry = registry();
    let manager = TaskManager::new(Arc::new(RecordingScene::default()), &registry);
    let first = make_task(AppendSuffixTask::new("-a")).unwrap();
    let second = make_task(AppendSuffixTask::new("-b")).unwrap();

    manager.push(Arc::clone(&first)).unwrap();
    manager.remove(0).unwrap();
    manager.push(Arc::clone(&second)).unwrap();

    assert!(first.manager().is_none());
    assert!(Arc::ptr_eq(&second.manager().unwrap(), &manager));
}

#[test]
fn test_unknown_kind_leaves_list_unchanged() {
    let registry = registry();
    let manager = TaskManager::new(Arc::new(RecordingScene::default()), &registry);
    manager.add_task("AppendSuffixTask", &fields(serde_json::json!({"suffix": "-A"}))).unwrap();

    let err = registry.lookup("Nonexistent").unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));

    let err = manager.add_task("Nonexistent", &TaskFields::new()).unwrap_err();
    assert!(matches!(err, ManagerError::Registry(RegistryError::NotFound(_))));
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_invalid_fields_fail_at_construction() {
    let registry = registry();
    let manager = TaskManager::new(Arc::new(RecordingScene::default()), &registry);

    let err = manager
        .add_task("AppendSuffixTask", &fields(serde_json::json!({"suffix": "a/b"})))
        .unwrap_err();
    assert!(matches!(err, ManagerError::Registry(RegistryError::Config(_))));
    assert!(manager.is_empty());
}

#[test]
fn test_registry_from_config_with_extra_package() {
    let config = BatchConfig::new().with_packages(["core", "testing"]);
    let registry = TaskRegistry::from_config(&config.registry, &[testing_package()]).unwrap();
    assert_eq!(registry.len(), 8);
    assert!(registry.contains("SpyTask"));
    assert_eq!(registry.lookup("FailingTask").unwrap().title, "Failing");

    let packages: Vec<&str> = registry.packages().iter().map(|p| p.name).collect();
    assert_eq!(packages, vec!["core", "testing"]);
}

#[test]
fn test_document_round_trip_with_test_kinds() {
    let registry = registry();
    let manager = TaskManager::new(Arc::new(RecordingScene::default()), &registry);
    manager.add_task("AppendSuffixTask", &fields(serde_json::json!({"suffix": "-A"}))).unwrap();
    manager
        .add_task(
            "RenameNodeTask",
            &fields(serde_json::json!({"search": "a", "replace": "b"})),
        )
        .unwrap();
    manager.add_task("AppendSuffixTask", &fields(serde_json::json!({"suffix": "-B"}))).unwrap();

    let document = persistence::serialize(&manager);
    let json = serde_json::to_value(&document).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "version": 1,
            "tasks": [
                {"$type": "AppendSuffixTask", "suffix": "-A"},
                {"$type": "RenameNodeTask", "search": "a", "replace": "b"},
                {"$type": "AppendSuffixTask", "suffix": "-B"},
            ]
        })
    );

    let rebuilt =
        persistence::deserialize(&document, &registry, Arc::new(RecordingScene::default()))
            .unwrap();
    let kinds: Vec<&str> = rebuilt.tasks().iter().map(|t| t.kind()).collect();
    assert_eq!(kinds, vec!["AppendSuffixTask", "RenameNodeTask", "AppendSuffixTask"]);
    assert_eq!(persistence::serialize(&rebuilt), document);
}

#[test]
fn test_document_needs_registered_kinds() {
    let registry = Arc::new(TaskRegistry::new(vec![core_package()]));
    let document = persistence::from_json(
        r#"{"version": 1, "tasks": [{"$type": "AppendSuffixTask", "suffix": "-A"}]}"#,
    )
    .unwrap();

    let err = persistence::deserialize(&document, &registry, Arc::new(RecordingScene::default()))
        .unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Record {
            index: 0,
            source: RegistryError::NotFound(_)
        }
    ));
}

#[test]
fn test_custom_package_registration() {
    fn register(registrar: &mut scene_batch_core::TaskRegistrar) {
        registrar.register::<AppendSuffixTask>();
    }

    let registry = TaskRegistry::new(vec![TaskPackage::new("append", register)]);
    let task = registry
        .create("AppendSuffixTask", &fields(serde_json::json!({"suffix": "!"})))
        .unwrap();
    assert_eq!(task.title(), "Append Suffix");
    assert_eq!(task.fields()["suffix"], serde_json::json!("!"));
}
