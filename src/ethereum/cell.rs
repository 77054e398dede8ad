use std::fmt;
use std::sync::{Arc, RwLock};

pub type Observer<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Where a cell keeps its value
pub enum Store<T> {
    /// Owned by the cell
    Local(T),
    /// Owned by the caller, who can read it through its own handle
    Shared(Arc<RwLock<T>>),
}

/// A value that is either held locally or bound to an external store,
/// with an optional observer notified after every write
pub struct StateCell<T> {
    store: Store<T>,
    observer: Option<Observer<T>>,
}

impl<T: Clone> StateCell<T> {
    pub fn local(value: T) -> Self {
        Self {
            store: Store::Local(value),
            observer: None,
        }
    }

    pub fn shared(handle: Arc<RwLock<T>>) -> Self {
        Self {
            store: Store::Shared(handle),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn get(&self) -> T {
        match &self.store {
            Store::Local(value) => value.clone(),
            Store::Shared(handle) => handle
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
        }
    }

    pub fn set(&mut self, value: T) {
        match &mut self.store {
            Store::Local(current) => *current = value.clone(),
            Store::Shared(handle) => {
                let mut guard = handle
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *guard = value.clone();
            }
        }
        if let Some(observer) = &self.observer {
            observer(&value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("StateCell");
        match &self.store {
            Store::Local(value) => s.field("local", value),
            Store::Shared(handle) => s.field("shared", handle),
        };
        s.field("observed", &self.observer.is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_local_cell() {
        let mut cell = StateCell::local(1u32);
        cell.set(5);
        assert_eq!(cell.get(), 5);
    }

    #[test]
    fn test_shared_cell_writes_through() {
        let handle = Arc::new(RwLock::new(String::new()));
        let mut cell = StateCell::shared(handle.clone());
        cell.set("0x1234".to_string());
        assert_eq!(*handle.read().unwrap(), "0x1234");

        *handle.write().unwrap() = "0xabcd".to_string();
        assert_eq!(cell.get(), "0xabcd");
    }

    #[test]
    fn test_observer_sees_every_write() {
        let writes = Arc::new(AtomicUsize::new(0));
        let counter = writes.clone();
        let handle = Arc::new(RwLock::new(0u64));
        let mut cell = StateCell::shared(handle.clone()).with_observer(move |value| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });

        cell.set(11);
        cell.set(4);
        assert_eq!(*handle.read().unwrap(), 4);
        assert_eq!(writes.load(Ordering::SeqCst), 15);
    }
}
