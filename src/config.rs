//! Per-context configuration.

use sink_buffer::DEFAULT_CHUNK_SIZE;
use std::env;
use std::str::FromStr;
use tracing::warn;

/// Default name given to every worker thread.
pub const DEFAULT_THREAD_NAME: &str = "codec-worker";

/// Default DEFLATE level, the zlib default.
pub const DEFAULT_LEVEL: u32 = 6;

pub const ENV_THREAD_NAME: &str = "CODEC_WORKER_THREAD_NAME";
pub const ENV_STACK_SIZE: &str = "CODEC_WORKER_STACK_SIZE";
pub const ENV_SINK_CHUNK: &str = "CODEC_WORKER_SINK_CHUNK";
pub const ENV_MAX_PAYLOAD: &str = "CODEC_WORKER_MAX_PAYLOAD";
pub const ENV_LEVEL: &str = "CODEC_WORKER_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Name of the worker thread, as shown by debuggers and in logs.
    pub thread_name: String,
    /// Worker stack size in bytes; `None` keeps the platform default.
    pub stack_size: Option<usize>,
    /// Growth step of the compression output sink.
    pub sink_chunk_size: usize,
    /// Largest payload `submit` accepts; `None` means unlimited.
    pub max_payload_len: Option<usize>,
    /// Compression level handed to the default codec (0-9).
    pub level: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            stack_size: None,
            sink_chunk_size: DEFAULT_CHUNK_SIZE,
            max_payload_len: None,
            level: DEFAULT_LEVEL,
        }
    }
}

impl ContextConfig {
    /// Start from the defaults and apply any `CODEC_WORKER_*` variables found in the
    /// environment. Values that fail to parse are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = ContextConfig::default();

        if let Ok(name) = env::var(ENV_THREAD_NAME) {
            if !name.trim().is_empty() {
                config.thread_name = name;
            }
        }
        if let Some(size) = parse_var(ENV_STACK_SIZE) {
            config.stack_size = Some(size);
        }
        if let Some(chunk) = parse_var(ENV_SINK_CHUNK) {
            config.sink_chunk_size = chunk;
        }
        if let Some(max) = parse_var(ENV_MAX_PAYLOAD) {
            config.max_payload_len = Some(max);
        }
        if let Some(level) = parse_var::<u32>(ENV_LEVEL) {
            config.level = level.min(9);
        }

        config
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn sink_chunk_size(mut self, bytes: usize) -> Self {
        self.sink_chunk_size = bytes.max(1);
        self
    }

    pub fn max_payload_len(mut self, bytes: usize) -> Self {
        self.max_payload_len = Some(bytes);
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;

    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ContextConfig::default();

        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
        assert_eq!(config.stack_size, None);
        assert_eq!(config.sink_chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.max_payload_len, None);
        assert_eq!(config.level, DEFAULT_LEVEL);
    }

    #[test]
    fn builder_clamps() {
        let config = ContextConfig::default()
            .thread_name("zip")
            .sink_chunk_size(0)
            .level(42)
            .max_payload_len(10)
            .stack_size(1 << 20);

        assert_eq!(config.thread_name, "zip");
        assert_eq!(config.sink_chunk_size, 1);
        assert_eq!(config.level, 9);
        assert_eq!(config.max_payload_len, Some(10));
        assert_eq!(config.stack_size, Some(1 << 20));
    }

    // the only test touching these variables, so it cannot race another test
    #[test]
    fn reads_environment() {
        env::set_var(ENV_THREAD_NAME, "env-worker");
        env::set_var(ENV_SINK_CHUNK, "4096");
        env::set_var(ENV_MAX_PAYLOAD, "not-a-number");
        env::set_var(ENV_LEVEL, "3");

        let config = ContextConfig::from_env();

        env::remove_var(ENV_THREAD_NAME);
        env::remove_var(ENV_SINK_CHUNK);
        env::remove_var(ENV_MAX_PAYLOAD);
        env::remove_var(ENV_LEVEL);

        assert_eq!(config.thread_name, "env-worker");
        assert_eq!(config.sink_chunk_size, 4096);
        assert_eq!(config.max_payload_len, None);
        assert_eq!(config.level, 3);
    }
}
