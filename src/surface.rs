//! Display surface binding
//!
//! The presentation layer registers a [`DisplaySurface`] per peer (plus one
//! for the local sentinel); the registry routes each peer's stream handle to
//! its surface. Binding and media arrival race freely: whichever side shows
//! up first is stored, and the attach happens as soon as both are present.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::peer::PeerId;

/// Opaque, cheaply cloneable handle to a playable media stream
///
/// Drivers put their own stream type inside; the orchestration core never
/// looks past the handle. Consumers that know the driver downcast it back.
#[derive(Clone)]
pub struct StreamHandle {
    inner: Arc<dyn Any + Send + Sync>,
}

impl StreamHandle {
    /// Wrap a driver stream object
    pub fn new<T: Any + Send + Sync>(stream: T) -> Self {
        Self {
            inner: Arc::new(stream),
        }
    }

    /// Borrow the wrapped object if it is a `T`
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StreamHandle")
    }
}

/// One render target for one peer's media
pub trait DisplaySurface: Send + Sync {
    /// Present the given stream on this surface
    fn attach(&self, stream: StreamHandle);

    /// Stop presenting; called when the peer departs or the surface is
    /// unbound
    fn detach(&self);
}

#[derive(Default)]
struct SurfaceState {
    surfaces: HashMap<PeerId, Arc<dyn DisplaySurface>>,
    streams: HashMap<PeerId, StreamHandle>,
}

/// Routes stream handles to whichever surface is bound for each peer
///
/// Cheaply cloneable handle; all clones share one table. Attach/detach calls
/// run outside the registry lock, so surfaces may call back into the
/// registry.
#[derive(Clone, Default)]
pub struct SurfaceRegistry {
    state: Arc<Mutex<SurfaceState>>,
}

impl SurfaceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `surface` as the render target for `peer_id`
    ///
    /// Rebinding replaces the previous surface (after detaching it). If the
    /// peer's stream has already arrived it is attached immediately;
    /// otherwise the attach happens when the stream is delivered.
    pub fn bind(&self, peer_id: PeerId, surface: Arc<dyn DisplaySurface>) {
        let (previous, stream) = {
            let mut state = self.state.lock().unwrap();
            let previous = state.surfaces.insert(peer_id.clone(), Arc::clone(&surface));
            (previous, state.streams.get(&peer_id).cloned())
        };
        if let Some(previous) = previous {
            previous.detach();
        }
        if let Some(stream) = stream {
            debug!(peer = %peer_id, "attaching stored stream to newly bound surface");
            surface.attach(stream);
        }
    }

    /// Remove the surface bound for `peer_id`, detaching it first
    ///
    /// The peer's stream, if any, stays stored for a later rebind.
    pub fn unbind(&self, peer_id: &PeerId) {
        let removed = self.state.lock().unwrap().surfaces.remove(peer_id);
        if let Some(surface) = removed {
            surface.detach();
        }
    }

    /// Deliver `stream` as the current media for `peer_id`
    ///
    /// Attaches immediately when a surface is bound; otherwise the stream is
    /// stored and attached on the next `bind`.
    pub fn deliver(&self, peer_id: &PeerId, stream: StreamHandle) {
        let surface = {
            let mut state = self.state.lock().unwrap();
            state.streams.insert(peer_id.clone(), stream.clone());
            state.surfaces.get(peer_id).cloned()
        };
        match surface {
            Some(surface) => surface.attach(stream),
            None => debug!(peer = %peer_id, "stream delivered before surface bind, storing"),
        }
    }

    /// Drop both the surface binding and the stored stream for `peer_id`
    pub fn release(&self, peer_id: &PeerId) {
        let removed = {
            let mut state = self.state.lock().unwrap();
            state.streams.remove(peer_id);
            state.surfaces.remove(peer_id)
        };
        if let Some(surface) = removed {
            surface.detach();
        }
    }

    /// Release every binding and stored stream
    pub fn clear(&self) {
        let surfaces: Vec<_> = {
            let mut state = self.state.lock().unwrap();
            state.streams.clear();
            state.surfaces.drain().map(|(_, s)| s).collect()
        };
        for surface in surfaces {
            surface.detach();
        }
    }

    /// Whether a surface is currently bound for `peer_id`
    pub fn is_bound(&self, peer_id: &PeerId) -> bool {
        self.state.lock().unwrap().surfaces.contains_key(peer_id)
    }
}
