// src/tokens.rs
use std::sync::{Mutex, MutexGuard};

/// A GitHub token and the epoch second until which it is throttled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub hash: String,
    pub retry_after: i64,
}

impl Token {
    pub fn is_exceeded(&self, now: i64) -> bool {
        self.retry_after > now
    }

    /// Seconds left until the token may be used again.
    pub fn wait_secs(&self, now: i64) -> u64 {
        (self.retry_after - now).max(0) as u64
    }
}

#[derive(Debug)]
struct Pool {
    tokens: Vec<Token>,
    next: usize,
    current: usize,
}

/// Round-robin pool of GitHub tokens with per-token rate-limit deadlines.
#[derive(Debug)]
pub struct TokenManager {
    pool: Mutex<Pool>,
}

impl TokenManager {
    pub fn new(hashes: &[String]) -> Self {
        let tokens = hashes
            .iter()
            .map(|hash| Token { hash: hash.clone(), retry_after: 0 })
            .collect();

        Self {
            pool: Mutex::new(Pool { tokens, next: 0, current: 0 }),
        }
    }

    /// Next usable token in rotation.
    ///
    /// Exceeded tokens are skipped. When every token is exceeded (always the
    /// case for a throttled single-token pool) the one with the earliest
    /// deadline comes back and the caller is expected to wait for it.
    pub fn get(&self) -> Option<Token> {
        self.get_at(now())
    }

    fn get_at(&self, now: i64) -> Option<Token> {
        let mut pool = self.lock();
        let len = pool.tokens.len();
        if len == 0 {
            return None;
        }

        for _ in 0..len {
            let index = pool.next % len;
            pool.next = (index + 1) % len;
            if !pool.tokens[index].is_exceeded(now) {
                pool.current = index;
                return Some(pool.tokens[index].clone());
            }
        }

        let (index, _) = pool
            .tokens
            .iter()
            .enumerate()
            .min_by_key(|(_, token)| token.retry_after)?;
        pool.current = index;
        pool.next = (index + 1) % len;
        Some(pool.tokens[index].clone())
    }

    /// Marks the token last handed out by [`get`](Self::get) as throttled.
    pub fn set_current_exceeded(&self, seconds_from_now: i64) {
        self.set_current_exceeded_at(now(), seconds_from_now);
    }

    fn set_current_exceeded_at(&self, now: i64, seconds_from_now: i64) {
        let mut pool = self.lock();
        let current = pool.current;
        if let Some(token) = pool.tokens.get_mut(current) {
            token.retry_after = now + seconds_from_now.max(0);
        }
    }

    pub fn snapshot(&self) -> Vec<Token> {
        self.lock().tokens.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
