/// Insertion-ordered string multimap used for query parameters and form fields.
///
/// Values for a repeated key accumulate in the order they were added; nothing
/// is ever overwritten. Encoding keeps that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMap {
    entries: Vec<(String, String)>,
}

impl MultiMap {
    /// Create an empty multimap
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value for `key`
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Append every `(key, value)` pair
    pub fn extend_pairs<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.append(key, value);
        }
    }

    /// Append every value of every `(key, values)` entry
    pub fn extend_multi<I, K, VS, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, VS)>,
        K: Into<String>,
        VS: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for (key, values) in entries {
            let key = key.into();
            for value in values {
                self.entries.push((key.clone(), value.into()));
            }
        }
    }

    /// Append a flat `key, value, key, value, ...` list
    ///
    /// # Panics
    ///
    /// Panics if `kv` has an odd number of elements. An unpaired key is a
    /// programming error at the call site.
    pub fn extend_flat(&mut self, kv: &[&str]) {
        assert!(
            kv.len() % 2 == 0,
            "pairs: got the odd number of input pairs: {}",
            kv.len()
        );
        for pair in kv.chunks_exact(2) {
            self.append(pair[0], pair[1]);
        }
    }

    /// First value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for `key`, in insertion order
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Iterate over `(key, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of stored values
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `application/x-www-form-urlencoded` rendering
    ///
    /// # Errors
    ///
    /// Returns the encoder error; string pairs do not fail in practice.
    pub fn encode(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(&self.entries)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MultiMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend_pairs(iter);
        map
    }
}
