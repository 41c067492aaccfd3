// src/watch/notifier.rs

//! Fan-out of detected changes to channels and callbacks.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace};

/// Buffer size of every channel handed out by [`ChangeNotifier::channel`].
pub const CHANGE_CHANNEL_CAPACITY: usize = 20;

/// Async callback invoked once per detected change.
pub type ChangeCallback =
    Arc<dyn Fn(PathBuf) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Broadcasts changed paths to every registered consumer.
///
/// Publishing never blocks: a full channel drops that notification, and
/// each callback runs on its own Tokio task.
#[derive(Default)]
pub struct ChangeNotifier {
    channels: Mutex<Vec<mpsc::Sender<PathBuf>>>,
    callbacks: Mutex<Vec<ChangeCallback>>,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("channels", &lock(&self.channels).len())
            .field("callbacks", &lock(&self.callbacks).len())
            .finish()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh, independent receiver of every future change.
    pub fn channel(&self) -> mpsc::Receiver<PathBuf> {
        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        lock(&self.channels).push(tx);
        rx
    }

    pub fn add_callback(&self, callback: ChangeCallback) {
        lock(&self.callbacks).push(callback);
    }

    /// Deliver `path` to all consumers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn publish(&self, path: &Path) {
        debug!(?path, "change detected");

        let callbacks: Vec<ChangeCallback> = lock(&self.callbacks).clone();
        for cb in callbacks {
            tokio::spawn(cb(path.to_path_buf()));
        }

        lock(&self.channels).retain(|tx| match tx.try_send(path.to_path_buf()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(?path, "change channel full; dropping notification");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Drop every channel sender so receivers observe the end of the stream.
    pub fn close_channels(&self) {
        lock(&self.channels).clear();
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

/// Wrap an async closure as a [`ChangeCallback`].
pub fn callback<F, Fut>(f: F) -> ChangeCallback
where
    F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |path| Box::pin(f(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn every_channel_gets_every_change() {
        let notifier = ChangeNotifier::new();
        let mut a = notifier.channel();
        let mut b = notifier.channel();

        notifier.publish(Path::new("/x/a.go"));

        assert_eq!(a.recv().await, Some(PathBuf::from("/x/a.go")));
        assert_eq!(b.recv().await, Some(PathBuf::from("/x/a.go")));
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_blocking() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.channel();

        for i in 0..CHANGE_CHANNEL_CAPACITY + 5 {
            notifier.publish(Path::new(&format!("/x/{i}")));
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, CHANGE_CHANNEL_CAPACITY);
    }

    #[tokio::test]
    async fn callbacks_run_once_per_change() {
        let notifier = ChangeNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        notifier.add_callback(callback(move |_path| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        notifier.publish(Path::new("/x/a"));
        notifier.publish(Path::new("/x/b"));

        for _ in 0..100 {
            if hits.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned() {
        let notifier = ChangeNotifier::new();
        drop(notifier.channel());
        let mut live = notifier.channel();

        notifier.publish(Path::new("/x/a"));

        assert_eq!(lock(&notifier.channels).len(), 1);
        assert!(live.recv().await.is_some());
    }
}
