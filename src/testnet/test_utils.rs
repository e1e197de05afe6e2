//! Test utilities for ledger testing

use crate::config::NodeConfig;
use std::time::{Duration, Instant};

/// Easy difficulty and no empty-block mining, so tests stay fast and quiet
pub const TEST_DIFFICULTY: usize = 1;

/// A node config on an ephemeral loopback port with fresh keys
pub fn test_config(name: &str) -> NodeConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    NodeConfig::generate(name, "127.0.0.1:0")
        .expect("key generation should work in tests")
        .with_difficulty(TEST_DIFFICULTY)
        .with_mine_empty_blocks(false)
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_valid() {
        let config = test_config("C1");
        assert!(config.validate().is_ok());
        assert_eq!(config.difficulty, TEST_DIFFICULTY);
    }

    #[test]
    fn test_wait_until() {
        assert!(wait_until(Duration::from_millis(50), || true));
        assert!(!wait_until(Duration::from_millis(20), || false));
    }
}
