//! A UI value that can be updated in place, then finalized once.

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::{Result, SyncError};

/// Latest published value of a [`StreamableUi`].
#[derive(Debug, Clone, PartialEq)]
pub struct UiFrame<T> {
    pub value: T,
    /// Set by [`StreamableUi::done`]; no frame follows a done frame.
    pub done: bool,
}

/// Producer side of an incrementally updated UI value.
///
/// Consumers hold a [`watch::Receiver`] and always see the latest value;
/// intermediate values may be skipped, the final one never is.
#[derive(Debug)]
pub struct StreamableUi<T> {
    tx: watch::Sender<UiFrame<T>>,
}

impl<T: Clone + Send + Sync + 'static> StreamableUi<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(UiFrame {
            value: initial,
            done: false,
        });
        Self { tx }
    }

    /// Replace the current value.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidState`] once [`done`](Self::done) was called.
    pub fn update(&self, value: T) -> Result<()> {
        self.publish(value, false)
    }

    /// Publish the final value and close the handle.
    pub fn done(&self, value: T) -> Result<()> {
        self.publish(value, true)
    }

    pub fn is_done(&self) -> bool {
        self.tx.borrow().done
    }

    pub fn current(&self) -> T {
        self.tx.borrow().value.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiFrame<T>> {
        self.tx.subscribe()
    }

    /// Frames as a stream, starting with the current one.
    pub fn stream(&self) -> WatchStream<UiFrame<T>> {
        WatchStream::new(self.subscribe())
    }

    fn publish(&self, value: T, done: bool) -> Result<()> {
        let mut accepted = false;
        self.tx.send_if_modified(|frame| {
            if frame.done {
                return false;
            }
            *frame = UiFrame { value, done };
            accepted = true;
            true
        });
        if accepted {
            Ok(())
        } else {
            Err(SyncError::InvalidState("UI handle already finalized".into()))
        }
    }
}
