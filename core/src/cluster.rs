use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

/// A named, ordered group of items. Identity, hashing and ordering use `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster<T> {
    pub id: Uuid,
    pub items: Vec<T>,
}

impl<T> Cluster<T> {
    pub fn new() -> Self { Self { id: Uuid::new_v4(), items: Vec::new() } }

    pub fn with_items(items: Vec<T>) -> Self { Self { id: Uuid::new_v4(), items } }
}

impl<T> Default for Cluster<T> {
    fn default() -> Self { Self::new() }
}

impl<T> Deref for Cluster<T> {
    type Target = Vec<T>;
    fn deref(&self) -> &Vec<T> { &self.items }
}

impl<T> DerefMut for Cluster<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> { &mut self.items }
}

impl<T> PartialEq for Cluster<T> {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl<T> Eq for Cluster<T> {}

impl<T> Hash for Cluster<T> {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state) }
}

impl<T> PartialOrd for Cluster<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl<T> Ord for Cluster<T> {
    fn cmp(&self, other: &Self) -> Ordering { self.id.cmp(&other.id) }
}

impl<T: fmt::Debug> fmt::Display for Cluster<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} : {:?}", self.id, self.items) }
}
