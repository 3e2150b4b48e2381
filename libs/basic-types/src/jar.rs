//! This module provides [Jar], a type that collects one element per contributor.

/// A jar where every contributor puts exactly one element.
///
/// Elements are kept sorted by key, so iteration order is deterministic no
/// matter the order contributions arrive in.
#[derive(Default, Debug, Clone)]
pub struct Jar<K, T> {
    elements: Vec<(K, T)>,
    expected_count: usize,
}

impl<K: Ord + Clone + std::fmt::Display, T> Jar<K, T> {
    /// Constructs a new jar that expects the given number of contributors.
    pub fn new(expected_count: usize) -> Self {
        let elements = Vec::with_capacity(expected_count);
        Self { elements, expected_count }
    }

    /// Check whether this jar is full.
    ///
    /// A jar becomes full when every expected contributor has put their element into it.
    pub fn is_full(&self) -> bool {
        self.elements.len() == self.expected_count
    }

    /// Check whether this jar is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The number of elements currently in the jar.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Add an element for a contributor.
    ///
    /// This returns an error if the contributor has already provided an element.
    pub fn add_element(&mut self, key: K, element: T) -> Result<(), DuplicateEntry> {
        let result = self.elements.binary_search_by(|entry| entry.0.cmp(&key));
        match result {
            Ok(_) => Err(DuplicateEntry(key.to_string())),
            Err(index) => {
                self.elements.insert(index, (key, element));
                Ok(())
            }
        }
    }

    /// Check whether the given contributor already provided an element.
    pub fn contains(&self, key: &K) -> bool {
        self.elements.binary_search_by(|entry| entry.0.cmp(key)).is_ok()
    }

    /// Take a reference to the elements in this jar, sorted by key.
    pub fn elements(&self) -> impl Iterator<Item = &(K, T)> {
        self.elements.iter()
    }

    /// Consume this jar and take the elements, sorted by key.
    pub fn into_elements(self) -> impl Iterator<Item = (K, T)> {
        self.elements.into_iter()
    }
}

/// An error indicating a single contributor provided more than one element.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("contributor {0} already provided element")]
pub struct DuplicateEntry(pub String);

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_jar() {
        let jar = Jar::<u32, &str>::new(3);
        assert!(jar.is_empty());
        assert!(!jar.is_full());
        assert_eq!(jar.len(), 0);
    }

    #[test]
    fn fills_up() {
        let mut jar = Jar::new(2);
        jar.add_element(2u32, "b").unwrap();
        assert!(!jar.is_full());
        jar.add_element(1u32, "a").unwrap();
        assert!(jar.is_full());

        // Sorted by key regardless of insertion order.
        let keys: Vec<_> = jar.elements().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2]);
    }

    #[test]
    fn duplicate_rejected() {
        let mut jar = Jar::new(2);
        jar.add_element(7u32, "x").unwrap();
        let err = jar.add_element(7u32, "y").unwrap_err();
        assert_eq!(err, DuplicateEntry("7".to_string()));
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn contains_reports_membership() {
        let mut jar = Jar::new(2);
        jar.add_element(3u32, "x").unwrap();
        assert!(jar.contains(&3));
        assert!(!jar.contains(&4));
    }
}
