use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Id epoch: 2025-01-01T00:00:00Z
const EPOCH: u64 = 1_735_689_600_000;
const SEQUENCE_BITS: u64 = 22;

static LAST_ID: AtomicU64 = AtomicU64::new(0);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(EPOCH)
}

/// Time-ordered numeric id, used for users, services and invites. Ids
/// minted in the same millisecond take the next sequence number.
pub fn generate() -> String {
    let floor = now_ms().saturating_sub(EPOCH) << SEQUENCE_BITS;
    let mut last = LAST_ID.load(Ordering::SeqCst);
    loop {
        let next = floor.max(last + 1);
        match LAST_ID.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return next.to_string(),
            Err(current) => last = current,
        }
    }
}
