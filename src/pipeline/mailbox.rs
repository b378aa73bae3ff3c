//! Single-slot, last-write-wins handoff between the producer side and the
//! render loop.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    closed: bool,
    overwritten: u64,
}

/// Holds at most one value. A `put` replaces whatever is unread.
#[derive(Debug)]
pub struct ResultChannel<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Default for ResultChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultChannel<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                closed: false,
                overwritten: 0,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        // A panic while holding the lock cannot leave the slot half-written
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `value`, discarding any unread one. Returns `false` once closed.
    pub fn put(&self, value: T) -> bool {
        let mut slot = self.lock();
        if slot.closed {
            return false;
        }
        if slot.value.replace(value).is_some() {
            slot.overwritten += 1;
        }
        drop(slot);
        self.ready.notify_one();
        true
    }

    /// Take the current value, waiting at most `timeout` for one to arrive.
    ///
    /// Returns `None` when the wait elapses or the channel is closed and empty.
    pub fn try_take(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.lock();
        loop {
            if let Some(value) = slot.value.take() {
                return Some(value);
            }
            if slot.closed {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            slot = match self.ready.wait_timeout(slot, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Take the current value without waiting.
    pub fn take(&self) -> Option<T> {
        self.lock().value.take()
    }

    /// Refuse further values and wake any waiting consumer. An unread value
    /// can still be taken.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// How many unread values were replaced by newer ones.
    pub fn overwritten(&self) -> u64 {
        self.lock().overwritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn last_write_wins() {
        let channel = ResultChannel::new();
        channel.put("first");
        channel.put("second");
        assert_eq!(channel.try_take(Duration::ZERO), Some("second"));
        assert_eq!(channel.take(), None);
        assert_eq!(channel.overwritten(), 1);
    }

    #[test]
    fn empty_channel_times_out_with_none() {
        let channel: ResultChannel<u32> = ResultChannel::new();
        let start = Instant::now();
        assert_eq!(channel.try_take(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn waiting_consumer_is_woken_by_put() {
        let channel = Arc::new(ResultChannel::new());
        let producer = {
            let channel = channel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                channel.put(7);
            })
        };
        assert_eq!(channel.try_take(Duration::from_secs(5)), Some(7));
        producer.join().unwrap();
    }

    #[test]
    fn close_wakes_waiter_and_rejects_puts() {
        let channel: Arc<ResultChannel<u32>> = Arc::new(ResultChannel::new());
        let waiter = {
            let channel = channel.clone();
            thread::spawn(move || channel.try_take(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        channel.close();
        assert_eq!(waiter.join().unwrap(), None);
        assert!(!channel.put(1));
        assert!(channel.is_closed());
    }

    #[test]
    fn unread_value_survives_close() {
        let channel = ResultChannel::new();
        channel.put("last");
        channel.close();
        assert_eq!(channel.try_take(Duration::from_millis(10)), Some("last"));
        assert_eq!(channel.try_take(Duration::from_millis(10)), None);
    }
}
