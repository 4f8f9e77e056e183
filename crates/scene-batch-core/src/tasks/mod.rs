//! Built-in task kinds
//!
//! Registered by the `core` [`TaskPackage`]. Each kind only delegates to the
//! abstract [`SceneHandle`](crate::scene::SceneHandle) capabilities.

mod custom_script;
mod new_scene;
mod open_scene;
mod rename_node;
mod save_scene;

pub use custom_script::CustomScriptTask;
pub use new_scene::NewSceneTask;
pub use open_scene::OpenSceneTask;
pub use rename_node::RenameNodeTask;
pub use save_scene::SaveSceneTask;

use crate::registry::{TaskPackage, TaskRegistrar};

/// Name of the built-in package
pub const CORE_PACKAGE: &str = "core";

/// Package registering the built-in task kinds
#[must_use]
pub fn core_package() -> TaskPackage {
    TaskPackage::new(CORE_PACKAGE, register_core)
}

fn register_core(registrar: &mut TaskRegistrar) {
    registrar
        .register::<NewSceneTask>()
        .register::<OpenSceneTask>()
        .register::<SaveSceneTask>()
        .register::<RenameNodeTask>()
        .register::<CustomScriptTask>();
}
