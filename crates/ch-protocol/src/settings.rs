//! Server settings sent in the query string.

/// An ordered list of server settings.
///
/// Keys are unique; setting an existing key replaces its value in place so
/// the original order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: Vec<(String, String)>,
}

impl Settings {
    /// Create an empty settings list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing an existing entry.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Get the value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Merge `overrides` over these settings.
    ///
    /// Keys present in both take the value from `overrides`. Keys only in
    /// `self` keep their position; keys only in `overrides` are appended in
    /// their order.
    #[must_use]
    pub fn merge(&self, overrides: &Settings) -> Settings {
        let mut merged = self.clone();
        for (k, v) in &overrides.entries {
            merged.set(k.as_str(), v);
        }
        merged
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Get the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (k, v) in iter {
            settings.set(k, v);
        }
        settings
    }
}

impl<K: Into<String>, V: ToString> Extend<(K, V)> for Settings {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_call_values_win() {
        let defaults: Settings = [("a", 1), ("b", 2)].into_iter().collect();
        let call: Settings = [("b", 3), ("c", 4)].into_iter().collect();

        let merged = defaults.merge(&call);
        let pairs: Vec<_> = merged.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "3"), ("c", "4")]);

        // Inputs are untouched.
        assert_eq!(defaults.get("b"), Some("2"));
        assert_eq!(call.len(), 2);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut s = Settings::new().with("x", "1").with("y", "2");
        s.set("x", "9");
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![("x", "9"), ("y", "2")]);
    }

    #[test]
    fn test_merge_with_empty() {
        let s = Settings::new().with("max_threads", 4);
        assert_eq!(s.merge(&Settings::new()), s);
        assert_eq!(Settings::new().merge(&s), s);
    }
}
