//! Video surfaces: the host's volume controls as seen by the sync client.
//!
//! The host document owns its surfaces. The client only holds shared handles
//! and installs one observer per surface that feeds changes back into the
//! client's event queue.

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::types::ClientEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Callback a surface invokes whenever its volume changes.
#[derive(Debug, Clone)]
pub struct VolumeObserver {
    surface: SurfaceId,
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl VolumeObserver {
    pub fn new(surface: SurfaceId, tx: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self { surface, tx }
    }

    pub fn notify(&self, volume: f64) {
        // The client is gone once the receiver drops; nothing left to tell.
        let _ = self.tx.send(ClientEvent::LocalVolumeChanged {
            surface: self.surface,
            volume,
        });
    }
}

/// A controllable, observable video element.
pub trait VideoSurface: Send + Sync {
    fn id(&self) -> SurfaceId;

    fn volume(&self) -> f64;

    /// Set the volume. Surfaces report the change to their observer like any
    /// other change.
    fn set_volume(&self, volume: f64);

    /// Install `observer`, replacing any previous one.
    fn observe(&self, observer: VolumeObserver);
}

/// The document hosting the surfaces.
pub trait SurfaceHost: Send + Sync {
    /// Surfaces present right now.
    fn surfaces(&self) -> Vec<Arc<dyn VideoSurface>>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

struct MemoryState {
    volume: f64,
    observer: Option<VolumeObserver>,
}

/// A surface backed by plain memory. Raises a change only when the value
/// actually changes, like a media element's `volumechange`.
pub struct MemorySurface {
    id: SurfaceId,
    state: Mutex<MemoryState>,
}

impl MemorySurface {
    pub fn new(id: SurfaceId, volume: f64) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: Mutex::new(MemoryState {
                volume,
                observer: None,
            }),
        })
    }

    pub fn is_observed(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.observer.is_some())
            .unwrap_or(false)
    }
}

impl VideoSurface for MemorySurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn volume(&self) -> f64 {
        self.state.lock().map(|s| s.volume).unwrap_or(0.0)
    }

    fn set_volume(&self, volume: f64) {
        let observer = match self.state.lock() {
            Ok(mut state) if state.volume != volume => {
                state.volume = volume;
                state.observer.clone()
            }
            _ => None,
        };
        if let Some(observer) = observer {
            observer.notify(volume);
        }
    }

    fn observe(&self, observer: VolumeObserver) {
        if let Ok(mut state) = self.state.lock() {
            state.observer = Some(observer);
        }
    }
}

/// A host whose surfaces are registered by hand.
#[derive(Default)]
pub struct MemoryHost {
    surfaces: Mutex<Vec<Arc<dyn VideoSurface>>>,
}

impl MemoryHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, surface: Arc<dyn VideoSurface>) {
        if let Ok(mut surfaces) = self.surfaces.lock() {
            surfaces.push(surface);
        }
    }
}

impl SurfaceHost for MemoryHost {
    fn surfaces(&self) -> Vec<Arc<dyn VideoSurface>> {
        self.surfaces
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}
