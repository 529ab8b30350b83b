use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};

/// Real-valued analog sample
pub type Sample = f32;

/// Ordered, append-only sequence of logical bits or analog samples.
///
/// A buffer is built by one stage and then handed downstream behind an `Rc`;
/// from that point on nobody mutates it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Buffer<T> {
    items: Vec<T>,
}

impl<T> Buffer<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: T) {
        self.items.push(value);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> From<Vec<T>> for Buffer<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Clone> From<&[T]> for Buffer<T> {
    fn from(items: &[T]) -> Self {
        Self {
            items: items.to_vec(),
        }
    }
}

impl<T> FromIterator<T> for Buffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> Extend<T> for Buffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<'a, T> IntoIterator for &'a Buffer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for Buffer<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<T> Index<usize> for Buffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T: fmt::Display> fmt::Display for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            write!(f, " {}", item)?;
        }
        Ok(())
    }
}

impl Buffer<bool> {
    /// Render logical bits as a compact "0101" string
    pub fn to_bit_string(&self) -> String {
        self.items
            .iter()
            .map(|&bit| if bit { '1' } else { '0' })
            .collect()
    }
}

impl FromStr for Buffer<bool> {
    type Err = ChainError;

    /// Parse a "0101" string into logical bits
    fn from_str(s: &str) -> ChainResult<Self> {
        s.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(ChainError::non_conformant(format!(
                    "'{}' is not a binary digit",
                    other
                ))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_string_parsing() {
        let bits: Buffer<bool> = "1011".parse().unwrap();
        assert_eq!(bits.as_slice(), &[true, false, true, true]);
        assert_eq!(bits.to_bit_string(), "1011");

        let err = "10x1".parse::<Buffer<bool>>().unwrap_err();
        assert!(matches!(err, ChainError::NonConformantInput(_)));
    }

    #[test]
    fn test_element_wise_equality() {
        let a = Buffer::from(vec![1.0f32, 2.0, 3.0]);
        let b: Buffer<f32> = [1.0f32, 2.0, 3.0].iter().copied().collect();
        assert_eq!(a, b);
        assert_ne!(a, Buffer::from(vec![1.0f32, 2.0]));
    }

    #[test]
    fn test_display_matches_space_separated_layout() {
        let samples = Buffer::from(vec![5.0f32, 0.0]);
        assert_eq!(samples.to_string(), " 5 0");
    }
}
