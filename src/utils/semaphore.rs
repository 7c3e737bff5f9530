use parking_lot::{Condvar, Mutex};

/// Counting semaphore built on a mutex-guarded permit count.
#[derive(Debug, Default)]
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Blocks until a permit is available and takes it.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    pub fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.available.notify_one();
    }

    /// Drops every outstanding permit.
    pub fn reset(&self) {
        *self.permits.lock() = 0;
    }
}
