//! Engine configuration.

/// Configuration for opening an engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the data directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether snapshot files are fsynced after every save.
    pub sync_on_flush: bool,

    /// Whether `begin` saves the manager state (Tid counter and active set).
    pub persist_on_begin: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_flush: true,
            persist_on_begin: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the data directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether snapshot saves are fsynced.
    #[must_use]
    pub const fn sync_on_flush(mut self, value: bool) -> Self {
        self.sync_on_flush = value;
        self
    }

    /// Sets whether `begin` persists the manager state.
    #[must_use]
    pub const fn persist_on_begin(mut self, value: bool) -> Self {
        self.persist_on_begin = value;
        self
    }
}
