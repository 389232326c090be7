//! Interactive chat session: terminal setup, the event loop, and the
//! background tasks that talk to the server.

mod event_loop;
pub mod executors;
pub mod keybindings;
mod lifecycle;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::app::App;

pub use event_loop::{run_chat, UiEvent};

/// Shared access to the [`App`] for the loop and its helpers.
#[derive(Clone)]
pub struct AppHandle {
    inner: Arc<Mutex<App>>,
}

impl AppHandle {
    pub fn new(app: App) -> Self {
        Self {
            inner: Arc::new(Mutex::new(app)),
        }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&App) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut App) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }
}
