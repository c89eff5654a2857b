//! Collaborator interfaces the engine depends on.
//!
//! The audio daemon, window tracker, virtual keyboard, clipboard, and bus
//! client are external services. The engine only ever sees them through
//! the traits here; every one of them is optional, and a missing
//! collaborator degrades the dependent capability instead of failing the
//! run.

use std::{result::Result as StdResult, sync::Arc};

use thiserror::Error;

use crate::spawn::CommandSpawner;

/// Error reported by a collaborator service call.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

/// Convenient result type for collaborator calls.
pub type ServiceResult = StdResult<(), ServiceError>;

/// One of the four discrete audio-system change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioChange {
    /// The default playback sink changed.
    SinkChanged,
    /// The default capture source changed.
    SourceChanged,
    /// The default sink's mute flag changed.
    SinkMuteChanged,
    /// The default source's mute flag changed.
    SourceMuteChanged,
}

/// Descriptor of the currently focused window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWindow {
    /// Window resource class.
    pub class: String,
    /// Window title.
    pub title: String,
    /// Opaque window id, stable for the window's lifetime.
    pub id: u32,
}

/// Notification from the window-tracking collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// A window gained focus.
    Activated(ActiveWindow),
    /// A window was closed.
    Closed {
        /// Id of the closed window.
        id: u32,
    },
}

/// Query/set surface of the audio daemon client.
pub trait AudioControl: Send + Sync {
    /// Name of the current default playback sink.
    fn default_sink(&self) -> Option<String>;
    /// Name of the current default capture source.
    fn default_source(&self) -> Option<String>;
    /// Mute flag of the default sink.
    fn sink_muted(&self) -> Option<bool>;
    /// Mute flag of the default source.
    fn source_muted(&self) -> Option<bool>;
    /// Make `name` the default sink.
    fn set_default_sink(&self, name: &str) -> ServiceResult;
    /// Make `name` the default source.
    fn set_default_source(&self, name: &str) -> ServiceResult;
    /// Toggle the default sink's mute flag.
    fn toggle_sink_mute(&self) -> ServiceResult;
    /// Toggle the default source's mute flag.
    fn toggle_source_mute(&self) -> ServiceResult;
}

/// Virtual keyboard used for synthetic key input.
pub trait KeyInjector: Send + Sync {
    /// Press `code` and hold it.
    fn key_down(&self, code: u16) -> ServiceResult;
    /// Release a held `code`.
    fn key_up(&self, code: u16) -> ServiceResult;
    /// Press and release `code`.
    fn tap(&self, code: u16) -> ServiceResult;
}

/// System clipboard writer.
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents with `text`.
    fn set_text(&self, text: &str) -> ServiceResult;
}

/// Inter-process (bus) method invocation.
pub trait IpcCall: Send + Sync {
    /// Call `method` (fully qualified, `interface.Member`) on the object
    /// at `path` owned by `destination`, with an optional string argument.
    fn call(
        &self,
        destination: &str,
        path: &str,
        method: &str,
        value: Option<&str>,
    ) -> ServiceResult;
}

/// Window-management operations needed by widgets.
pub trait WindowOps: Send + Sync {
    /// Bring the window with `id` to the foreground.
    fn activate(&self, id: u32) -> ServiceResult;
}

/// Groups the long-lived collaborator handles handed to the engine and
/// to widgets at deck-load time.
#[derive(Clone)]
pub struct Services {
    /// Audio daemon client, if available.
    pub audio: Option<Arc<dyn AudioControl>>,
    /// Virtual keyboard, if available.
    pub injector: Option<Arc<dyn KeyInjector>>,
    /// Clipboard writer, if available.
    pub clipboard: Option<Arc<dyn Clipboard>>,
    /// Bus client, if available.
    pub ipc: Option<Arc<dyn IpcCall>>,
    /// Window-management client, if available.
    pub window_ops: Option<Arc<dyn WindowOps>>,
    /// Spawner for external commands (always present).
    pub spawner: CommandSpawner,
}

impl Services {
    /// Services with no collaborators and an ungrouped spawner; every
    /// dependent capability is disabled.
    pub fn detached() -> Self {
        Self {
            audio: None,
            injector: None,
            clipboard: None,
            ipc: None,
            window_ops: None,
            spawner: CommandSpawner::detached(),
        }
    }
}
