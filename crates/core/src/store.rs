use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Exclusive hold on one filename; released on drop.
#[derive(Debug)]
pub struct FilenameLease {
    filename: String,
    _guard: OwnedMutexGuard<()>,
}

impl FilenameLease {
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// Registry of per-filename async locks shared by a store's callers.
#[derive(Debug, Default)]
pub struct FilenameLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FilenameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, filename: &str) -> FilenameLease {
        let lock = {
            let mut locks = self.locks.lock().await;
            // entries nobody holds or waits on
            locks.retain(|name, lock| name == filename || Arc::strong_count(lock) > 1);
            locks
                .entry(filename.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        FilenameLease {
            filename: filename.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    #[cfg(test)]
    pub(crate) async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
