//! A surface that reports remote volume changes on stdout.

use std::sync::Arc;

use volsock_client::{MemorySurface, SurfaceId, VideoSurface, VolumeObserver};

pub struct ConsoleSurface {
    inner: Arc<MemorySurface>,
}

impl ConsoleSurface {
    pub fn new(id: SurfaceId, volume: f64) -> Arc<Self> {
        Arc::new(Self {
            inner: MemorySurface::new(id, volume),
        })
    }

    /// A change made by the person at this tab.
    pub fn user_set_volume(&self, volume: f64) {
        self.inner.set_volume(volume);
    }
}

impl VideoSurface for ConsoleSurface {
    fn id(&self) -> SurfaceId {
        self.inner.id()
    }

    fn volume(&self) -> f64 {
        self.inner.volume()
    }

    /// Only the sync client calls this, so every call is a remote change.
    fn set_volume(&self, volume: f64) {
        println!("remote volume -> {volume:.2}");
        self.inner.set_volume(volume);
    }

    fn observe(&self, observer: VolumeObserver) {
        self.inner.observe(observer);
    }
}
