//! Named values substituted into the template.

use std::{collections::HashMap, fmt};

use super::error::DomainError;

/// Placeholder filled with the run date.
pub const DATE_PLACEHOLDER: &str = "date";
/// Placeholder filled with the computed sequential invoice number.
pub const INVOICE_NUMBER_PLACEHOLDER: &str = "invoice_number";

/// Mapping from placeholder name to its replacement text.
///
/// `Debug` prints names only: the set carries SMTP credentials and the process
/// environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ValueSet {
    values: HashMap<String, String>,
}

impl fmt::Debug for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ValueSet")
            .field("names", &names)
            .finish_non_exhaustive()
    }
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` on top of `self`; entries in `other` win.
    pub fn merge(&mut self, other: ValueSet) {
        self.values.extend(other.values);
    }

    /// Restrict the set to `names`, reporting every name without a value.
    ///
    /// `names` is expected to be deduplicated; the missing list follows its order.
    pub fn resolve(&self, names: &[String]) -> Result<ResolvedValues, DomainError> {
        let mut entries = Vec::with_capacity(names.len());
        let mut missing = Vec::new();

        for name in names {
            match self.values.get(name) {
                Some(value) => entries.push((name.clone(), value.clone())),
                None => missing.push(name.clone()),
            }
        }

        if missing.is_empty() {
            Ok(ResolvedValues { entries })
        } else {
            Err(DomainError::MissingValues { names: missing })
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ValueSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Values for exactly the placeholders a template references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValues {
    entries: Vec<(String, String)>,
}

impl ResolvedValues {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| value)
    }
}
