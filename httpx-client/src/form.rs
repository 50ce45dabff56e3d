//! URL-encoded form values.

use std::collections::BTreeMap;

/// Multi-valued form fields, keyed by name.
///
/// Keys are kept sorted, so [`FormValues::encode`] is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    values: BTreeMap<String, Vec<String>>,
}

impl FormValues {
    /// Create an empty set of form values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the field.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.entry(key.into()).or_default().push(value.into());
        self
    }

    /// Replace all values of the field with a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), vec![value.into()]);
        self
    }

    /// First value of the field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of the field.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Remove the field, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.values.remove(key)
    }

    /// Whether the field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over fields and their values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Encode as `application/x-www-form-urlencoded`, sorted by key.
    pub fn encode(&self) -> Result<String, serde_urlencoded::ser::Error> {
        let pairs: Vec<(&str, &str)> = self
            .values
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str())))
            .collect();
        serde_urlencoded::to_string(pairs)
    }
}

impl<K, V> FromIterator<(K, V)> for FormValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Self::new();
        for (key, value) in iter {
            form.add(key, value);
        }
        form
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for FormValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<BTreeMap<String, Vec<String>>> for FormValues {
    fn from(values: BTreeMap<String, Vec<String>>) -> Self {
        Self { values }
    }
}

impl From<std::collections::HashMap<String, Vec<String>>> for FormValues {
    fn from(values: std::collections::HashMap<String, Vec<String>>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}
