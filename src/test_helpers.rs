//! Serialises tests that mutate process environment variables.

use std::env;

use tokio::sync::{Mutex, MutexGuard};

/// Global lock serialising environment mutation across tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Holds the environment lock and removes the variables it set on drop.
pub struct EnvGuard {
    keys: Vec<String>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets one variable while holding the lock.
    pub async fn set_var(key: &str, value: &str) -> Self {
        Self::set_vars(&[(key, value)]).await
    }

    /// Sets several variables under a single acquisition of the lock.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut keys = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            unsafe { env::set_var(key, value) };
            keys.push((*key).to_owned());
        }
        Self {
            keys,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            unsafe { env::remove_var(key) };
        }
    }
}
