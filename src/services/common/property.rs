use std::fmt::Debug;

use tokio::sync::watch;

/// A value owned by one writer and observed by many readers.
///
/// Readers get the latest value synchronously or wait for one that matches.
#[derive(Clone)]
pub struct Property<T: Clone + Send + Sync + 'static> {
    tx: watch::Sender<T>,
    rx: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(initial: T) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { tx, rx }
    }

    /// Store a new value, notifying watchers only if it differs.
    pub(crate) fn set(&self, new_value: T)
    where
        T: PartialEq,
    {
        self.tx.send_if_modified(|current| {
            if *current == new_value {
                return false;
            }
            *current = new_value;
            true
        });
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait until the value satisfies `predicate` and return it.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&T) -> bool) -> T {
        let mut rx = self.rx.clone();
        match rx.wait_for(|value| predicate(value)).await {
            Ok(value) => value.clone(),
            Err(_) => self.get(),
        }
    }
}

impl<T: Clone + Send + Sync + Debug + 'static> Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}
