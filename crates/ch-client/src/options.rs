//! Per-call options.

use std::time::Duration;

use ch_protocol::Settings;

/// Options for a single call.
///
/// Every field left unset falls back to the session's configuration.
/// Settings are merged key by key over the session's default settings.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Per-poll timeout.
    pub timeout: Option<Duration>,
    /// Database for this call.
    pub database: Option<String>,
    /// User name for this call.
    pub user: Option<String>,
    /// Password for this call.
    pub password: Option<String>,
    /// Settings overriding the session defaults.
    pub settings: Settings,
    /// Explicit format appended to the statement.
    pub format: Option<String>,
    /// Column types of the result, for the headerless row format.
    pub types: Option<Vec<String>>,
}

impl QueryOptions {
    /// Create options with nothing overridden.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-poll timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the user name.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Override one server setting.
    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.settings.set(key, value);
        self
    }

    /// Replace the setting overrides.
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Set an explicit format.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the result column types.
    #[must_use]
    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }
}
