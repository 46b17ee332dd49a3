// src/keys.rs
use rand::rngs::OsRng;
use rand::seq::SliceRandom;

/// Picks one credential uniformly at random using the OS entropy source.
///
/// `None` means the pool is empty, which adapters read as "credentials absent".
pub fn pick_random(keys: &[String]) -> Option<String> {
    keys.choose(&mut OsRng).cloned()
}
