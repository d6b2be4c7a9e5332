use stayopen::config::{ConfigFile, RawConfigFile};
use stayopen::errors::Result;
use stayopen::types::ReadFormat;

/// Builder for `RawConfigFile` to simplify test setup.
#[derive(Debug, Default)]
pub struct RawConfigBuilder {
    config: RawConfigFile,
}

impl RawConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: &str) -> Self {
        self.config.exiftool.path = Some(path.to_string());
        self
    }

    pub fn stay_open(mut self, val: bool) -> Self {
        self.config.exiftool.stay_open = val;
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.exiftool.pool_size = Some(size);
        self
    }

    pub fn cleanup_delay(mut self, delay: &str) -> Self {
        self.config.exiftool.cleanup_delay = Some(delay.to_string());
        self
    }

    pub fn format(mut self, format: ReadFormat) -> Self {
        self.config.read.format = format;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    /// Validate into a `ConfigFile`, surfacing the validation error.
    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}
