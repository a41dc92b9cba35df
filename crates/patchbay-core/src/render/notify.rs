//! Render notifications.
//!
//! Callbacks registered with [`Graph::add_render_notify`](crate::Graph::add_render_notify)
//! run on the render thread before and after every rendered cycle. A
//! registration is identified by the pair (callback pointer, refcon), so the
//! same callback may be registered several times with different refcons.
//!
//! The registration list lives in an [`ArcSwap`]: writers clone-and-replace it
//! under a mutex, the render thread only performs a lock-free load.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::failure::RenderFailure;

/// Opaque value passed back to a callback, chosen at registration.
pub type RefCon = usize;

/// Which side of the cycle a notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// Before any node renders.
    PreRender,
    /// After the output has been written.
    PostRender,
}

/// Data passed to a [`RenderNotify`] callback.
#[derive(Debug, Clone, Copy)]
pub struct RenderNotification<'a> {
    /// Pre- or post-render.
    pub phase: RenderPhase,
    /// Render cycle counter.
    pub cycle: u64,
    /// Frames in this cycle.
    pub frames: usize,
    /// Rendered output. `None` for pre-render.
    pub output: Option<&'a [f32]>,
    /// Failures recorded this cycle. Empty for pre-render.
    pub failures: &'a [RenderFailure],
    /// True if this cycle rendered an older topology because the lock was busy.
    pub stale_topology: bool,
}

/// Callback invoked on the render thread around each cycle.
///
/// Implementations must follow the render-thread rules: no allocation, no
/// blocking, no I/O.
pub trait RenderNotify: Send + Sync {
    /// Called once per phase per rendered cycle.
    fn notify(&self, notification: &RenderNotification<'_>, refcon: RefCon);
}

impl<F> RenderNotify for F
where
    F: Fn(&RenderNotification<'_>, RefCon) + Send + Sync,
{
    fn notify(&self, notification: &RenderNotification<'_>, refcon: RefCon) {
        self(notification, refcon);
    }
}

#[derive(Clone)]
struct Registration {
    callback: Arc<dyn RenderNotify>,
    refcon: RefCon,
}

impl Registration {
    fn is(&self, callback: &Arc<dyn RenderNotify>, refcon: RefCon) -> bool {
        self.refcon == refcon && std::ptr::addr_eq(Arc::as_ptr(&self.callback), Arc::as_ptr(callback))
    }
}

/// Registered callbacks.
pub(crate) struct NotifyList {
    current: ArcSwap<Vec<Registration>>,
    writer: Mutex<()>,
}

impl Default for NotifyList {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
        }
    }
}

impl NotifyList {
    /// Adds a registration. False if the same pair is already registered.
    pub fn add(&self, callback: Arc<dyn RenderNotify>, refcon: RefCon) -> bool {
        let _writer = self.writer.lock();
        let current = self.current.load();
        if current.iter().any(|r| r.is(&callback, refcon)) {
            return false;
        }
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(Registration { callback, refcon });
        self.current.store(Arc::new(next));
        true
    }

    /// Removes the matching registration, or every registration when
    /// `callback` is `None`. Returns how many were removed.
    pub fn remove(&self, callback: Option<&Arc<dyn RenderNotify>>, refcon: RefCon) -> usize {
        let _writer = self.writer.lock();
        let current = self.current.load();
        let next: Vec<Registration> = match callback {
            Some(cb) => current.iter().filter(|r| !r.is(cb, refcon)).cloned().collect(),
            None => Vec::new(),
        };
        let removed = current.len() - next.len();
        if removed > 0 {
            self.current.store(Arc::new(next));
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every callback. Render thread.
    pub fn dispatch(&self, notification: &RenderNotification<'_>) {
        let registrations = self.current.load();
        for r in registrations.iter() {
            r.callback.notify(notification, r.refcon);
        }
    }
}
