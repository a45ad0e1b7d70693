use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
struct NonceState {
    next: u64,
    /// Highest pending count reported by the chain. Nonces below it are spent.
    floor: u64,
    /// Nonces handed back by attempts that never reached the network.
    released: BTreeSet<u64>,
}

/// Process-wide nonce allocator for the oracle account.
///
/// Seeded once from the chain's pending transaction count and advanced in
/// memory afterwards. The lock covers allocation only; callers never hold it
/// across network I/O.
#[derive(Debug, Clone)]
pub struct NonceSequencer {
    state: Arc<Mutex<NonceState>>,
}

impl NonceSequencer {
    pub fn new(chain_count: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(NonceState {
                next: chain_count,
                floor: chain_count,
                released: BTreeSet::new(),
            })),
        }
    }
    
    /// Reserve the lowest available nonce. Released nonces are reused first so
    /// that a pre-broadcast failure leaves no gap.
    pub fn reserve(&self) -> NonceReservation {
        let nonce = {
            let mut state = self.state.lock();
            match state.released.pop_first() {
                Some(nonce) => nonce,
                None => {
                    let nonce = state.next;
                    state.next += 1;
                    nonce
                }
            }
        };
        debug!(nonce, "reserved nonce");
        
        NonceReservation {
            nonce,
            state: Arc::clone(&self.state),
            resolved: false,
        }
    }
    
    /// The nonce the next `reserve` call would return.
    pub fn peek(&self) -> u64 {
        let state = self.state.lock();
        state.released.first().copied().unwrap_or(state.next)
    }
    
    pub fn released_count(&self) -> usize {
        self.state.lock().released.len()
    }
    
    /// Move forward to the chain's pending count. Never moves backward.
    /// Returns true if the counter advanced.
    pub fn resync(&self, chain_count: u64) -> bool {
        let mut state = self.state.lock();
        state.floor = state.floor.max(chain_count);
        state.released = state.released.split_off(&chain_count);
        if chain_count > state.next {
            info!(from = state.next, to = chain_count, "nonce sequencer resynced to chain");
            state.next = chain_count;
            true
        } else {
            false
        }
    }
}

/// A nonce held by one submission attempt.
///
/// Dropping an unresolved reservation counts as consumed: when the outcome
/// is unknown a gap is preferred over a duplicate.
#[derive(Debug)]
pub struct NonceReservation {
    nonce: u64,
    state: Arc<Mutex<NonceState>>,
    resolved: bool,
}

impl NonceReservation {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
    
    /// The transaction may have reached the network; never hand this nonce out again.
    pub fn consume(mut self) {
        self.resolved = true;
        debug!(nonce = self.nonce, "nonce consumed");
    }
    
    /// The attempt failed before broadcast; the next caller reuses this nonce.
    pub fn release(mut self) {
        self.resolved = true;
        let mut state = self.state.lock();
        if self.nonce < state.floor {
            debug!(nonce = self.nonce, floor = state.floor, "released nonce already spent on chain, dropping");
            return;
        }
        if self.nonce < state.next {
            state.released.insert(self.nonce);
        }
        debug!(nonce = self.nonce, "nonce released");
    }
}

impl Drop for NonceReservation {
    fn drop(&mut self) {
        if !self.resolved {
            debug!(nonce = self.nonce, "unresolved nonce reservation dropped, treating as consumed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    
    #[test]
    fn test_sequential_reservations() {
        let sequencer = NonceSequencer::new(7);
        let a = sequencer.reserve();
        let b = sequencer.reserve();
        assert_eq!((a.nonce(), b.nonce()), (7, 8));
        a.consume();
        b.consume();
        assert_eq!(sequencer.peek(), 9);
    }
    
    #[test]
    fn test_released_nonce_is_reused_first() {
        let sequencer = NonceSequencer::new(0);
        let a = sequencer.reserve();
        let b = sequencer.reserve();
        let c = sequencer.reserve();
        b.release();
        a.release();
        c.consume();
        
        assert_eq!(sequencer.reserve().nonce(), 0);
        assert_eq!(sequencer.reserve().nonce(), 1);
        assert_eq!(sequencer.reserve().nonce(), 3);
    }
    
    #[test]
    fn test_dropped_reservation_is_consumed() {
        let sequencer = NonceSequencer::new(0);
        drop(sequencer.reserve());
        assert_eq!(sequencer.reserve().nonce(), 1);
        assert_eq!(sequencer.released_count(), 0);
    }
    
    #[test]
    fn test_resync_only_moves_forward() {
        let sequencer = NonceSequencer::new(5);
        let a = sequencer.reserve();
        let b = sequencer.reserve();
        a.release();
        b.consume();
        
        assert!(!sequencer.resync(3));
        assert_eq!(sequencer.peek(), 5);
        
        assert!(sequencer.resync(10));
        assert_eq!(sequencer.released_count(), 0);
        assert_eq!(sequencer.reserve().nonce(), 10);
    }
    
    #[test]
    fn test_release_after_resync_does_not_reuse_spent_nonce() {
        let sequencer = NonceSequencer::new(7);
        let a = sequencer.reserve();
        let b = sequencer.reserve();
        b.release();
        
        assert!(sequencer.resync(10));
        a.release();
        
        assert_eq!(sequencer.released_count(), 0);
        assert_eq!(sequencer.reserve().nonce(), 10);
    }
    
    #[test]
    fn test_release_above_floor_is_still_reused() {
        let sequencer = NonceSequencer::new(7);
        let a = sequencer.reserve();
        let b = sequencer.reserve();
        let c = sequencer.reserve();
        
        assert!(!sequencer.resync(8));
        a.consume();
        c.release();
        b.release();
        
        assert_eq!(sequencer.reserve().nonce(), 8);
        assert_eq!(sequencer.reserve().nonce(), 9);
        assert_eq!(sequencer.reserve().nonce(), 10);
    }
    
    #[test]
    fn test_concurrent_reservations_are_unique_and_contiguous() {
        let sequencer = NonceSequencer::new(100);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let sequencer = sequencer.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| {
                            let reservation = sequencer.reserve();
                            let nonce = reservation.nonce();
                            reservation.consume();
                            nonce
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        
        let mut seen = HashSet::new();
        for handle in handles {
            for nonce in handle.join().unwrap() {
                assert!(seen.insert(nonce), "duplicate nonce {}", nonce);
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(*seen.iter().min().unwrap(), 100);
        assert_eq!(*seen.iter().max().unwrap(), 899);
    }
}
