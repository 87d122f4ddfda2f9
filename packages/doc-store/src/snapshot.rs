//! Immutable views of the committed document set.

use std::collections::BTreeMap;

use crate::key::DocKey;

/// A committed mapping from document key to raw JSON text.
///
/// Snapshots are values: once handed to a reader they never change, and they
/// only ever contain data from writes that were successfully persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    documents: BTreeMap<DocKey, String>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw text stored under `key`, if any.
    pub fn get(&self, key: &DocKey) -> Option<&str> {
        self.documents.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &DocKey) -> bool {
        self.documents.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &DocKey> {
        self.documents.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocKey, &str)> {
        self.documents.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// A snapshot holding only the listed keys that are present.
    pub fn restrict(&self, keys: &[DocKey]) -> Snapshot {
        let documents = keys
            .iter()
            .filter_map(|key| {
                self.documents
                    .get(key)
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect();
        Snapshot { documents }
    }

    pub(crate) fn with(&self, key: DocKey, value: String) -> Snapshot {
        let mut documents = self.documents.clone();
        documents.insert(key, value);
        Snapshot { documents }
    }

    pub(crate) fn without(&self, keys: &[DocKey]) -> Snapshot {
        let mut documents = self.documents.clone();
        for key in keys {
            documents.remove(key);
        }
        Snapshot { documents }
    }
}

impl FromIterator<(DocKey, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (DocKey, String)>>(iter: I) -> Self {
        Snapshot {
            documents: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Snapshot {
    type Item = (DocKey, String);
    type IntoIter = std::collections::btree_map::IntoIter<DocKey, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc_key;

    fn sample() -> Snapshot {
        [
            (doc_key!("a"), "1".to_string()),
            (doc_key!("b"), "\"two\"".to_string()),
            (doc_key!("c"), "{}".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn get_and_contains() {
        let snapshot = sample();
        assert_eq!(snapshot.get(&doc_key!("a")), Some("1"));
        assert_eq!(snapshot.get(&doc_key!("z")), None);
        assert!(snapshot.contains(&doc_key!("c")));
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn restrict_keeps_only_present_listed_keys() {
        let restricted = sample().restrict(&[doc_key!("a"), doc_key!("missing")]);
        assert_eq!(restricted.len(), 1);
        assert_eq!(restricted.get(&doc_key!("a")), Some("1"));
    }

    #[test]
    fn with_and_without_leave_original_untouched() {
        let original = sample();
        let added = original.with(doc_key!("d"), "null".to_string());
        let removed = original.without(&[doc_key!("a"), doc_key!("b")]);

        assert_eq!(original.len(), 3);
        assert_eq!(added.len(), 4);
        assert_eq!(removed.keys().collect::<Vec<_>>(), vec![&doc_key!("c")]);
    }

    #[test]
    fn empty_snapshot() {
        let snapshot = Snapshot::new();
        assert!(snapshot.is_empty());
        assert!(snapshot.restrict(&[doc_key!("a")]).is_empty());
    }
}
