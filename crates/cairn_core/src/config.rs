//! Checkpoint configuration.

/// Default suffix of the staging directory created next to the target.
pub const DEFAULT_STAGING_SUFFIX: &str = ".tmp";

/// Options for creating a checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointOptions {
    /// Whether copied files are synced with a full metadata sync
    /// (`fsync`) rather than a data sync.
    pub use_fsync: bool,

    /// Suffix appended to the target path to form the staging directory.
    pub staging_suffix: String,
}

impl Default for CheckpointOptions {
    fn default() -> Self {
        Self {
            use_fsync: false,
            staging_suffix: DEFAULT_STAGING_SUFFIX.to_string(),
        }
    }
}

impl CheckpointOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether copies use a full metadata sync.
    #[must_use]
    pub const fn use_fsync(mut self, value: bool) -> Self {
        self.use_fsync = value;
        self
    }

    /// Sets the staging directory suffix.
    #[must_use]
    pub fn staging_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.staging_suffix = suffix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = CheckpointOptions::default();
        assert!(!options.use_fsync);
        assert_eq!(options.staging_suffix, ".tmp");
    }

    #[test]
    fn builder_pattern() {
        let options = CheckpointOptions::new()
            .use_fsync(true)
            .staging_suffix(".staging");

        assert!(options.use_fsync);
        assert_eq!(options.staging_suffix, ".staging");
    }
}
