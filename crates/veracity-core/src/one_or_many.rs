//! A container for JSON members that may be a single value or an array.
use serde::{Deserialize, Serialize};

/// One value or many, serialized without an enclosing array in the singular case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(_) => false,
            Self::Many(values) => values.is_empty(),
        }
    }

    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq,
    {
        match self {
            Self::One(value) => value == x,
            Self::Many(values) => values.contains(x),
        }
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.first(),
        }
    }

    pub fn any<F>(&self, f: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        self.iter().any(f)
    }

    pub fn iter(&self) -> OneOrManyIter<'_, T> {
        OneOrManyIter {
            inner: self,
            index: 0,
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values)
    }
}

pub struct OneOrManyIter<'a, T> {
    inner: &'a OneOrMany<T>,
    index: usize,
}

impl<'a, T> Iterator for OneOrManyIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.index;
        self.index += 1;
        match self.inner {
            OneOrMany::One(value) => (index == 0).then_some(value),
            OneOrMany::Many(values) => values.get(index),
        }
    }
}

impl<'a, T> IntoIterator for &'a OneOrMany<T> {
    type Item = &'a T;
    type IntoIter = OneOrManyIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_singular_without_array() {
        let one: OneOrMany<String> = OneOrMany::One("VerifiableCredential".to_string());
        assert_eq!(
            serde_json::to_string(&one).unwrap(),
            r#""VerifiableCredential""#
        );
        let many: OneOrMany<u32> = vec![1, 2].into();
        assert_eq!(serde_json::to_string(&many).unwrap(), "[1,2]");
    }

    #[test]
    fn iterates_both_variants() {
        let one: OneOrMany<u32> = 7.into();
        assert_eq!(one.iter().collect::<Vec<_>>(), vec![&7]);
        assert!(one.contains(&7));
        assert_eq!(one.len(), 1);

        let many: OneOrMany<u32> = vec![1, 2, 3].into();
        assert_eq!(many.iter().count(), 3);
        assert_eq!(many.first(), Some(&1));
        assert!(many.any(|x| *x == 3));
    }
}
