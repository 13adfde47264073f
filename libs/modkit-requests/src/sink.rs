use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Caller-owned slot the pipeline writes into as a side effect.
///
/// Used for output bindings (`to_text`, `to_json`) and for request/response
/// dumps. Clones share the same slot, so the caller keeps one handle and
/// passes another into the call options.
///
/// ```ignore
/// let text = Sink::new();
/// client.get(url).to_text(&text).send().await?;
/// println!("{}", text.take().unwrap_or_default());
/// ```
pub struct Sink<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Sink<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Take the written value, leaving the sink empty
    #[must_use]
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub(crate) fn put(&self, value: T) {
        *self.slot.lock() = Some(value);
    }
}

impl<T: Clone> Sink<T> {
    /// Copy of the written value, if any
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.slot.lock().clone()
    }
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Sink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("filled", &self.is_filled())
            .finish()
    }
}
