//! Thread-safe handle to a spawned scene for rspec fixtures.

use bevy::prelude::App;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use test_utils::Scene;

/// App wrapper that forwards `Send` and `Sync` because access is mutex-guarded.
#[derive(Debug)]
pub struct ThreadSafeApp(pub App);

impl Deref for ThreadSafeApp {
    type Target = App;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ThreadSafeApp {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

// SAFETY: rspec fixtures must be `Clone + Send + Sync`. The suite runs
// serially and every access goes through the mutex below.
unsafe impl Send for ThreadSafeApp {}
unsafe impl Sync for ThreadSafeApp {}

/// A scene and the app that owns it, shareable across rspec closures.
#[derive(Debug, Clone)]
pub struct SharedScene {
    app: Arc<Mutex<ThreadSafeApp>>,
    scene: Scene,
}

impl SharedScene {
    /// Wraps an app whose scene has already been spawned.
    pub fn new(app: App, scene: Scene) -> Self {
        Self {
            app: Arc::new(Mutex::new(ThreadSafeApp(app))),
            scene,
        }
    }

    /// Spawned entity handles.
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Locks the app, recovering from a poisoned mutex.
    pub fn app(&self) -> MutexGuard<'_, ThreadSafeApp> {
        self.app.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
