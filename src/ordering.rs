//! Dense zero-based `order` maintenance for sibling lists.
//!
//! Every sibling list (modules in a course, lessons in a module) keeps
//! `order == index` at rest. Each operation here restores that before it
//! returns.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::models::{Lesson, Module};

pub trait Ordered {
    fn id(&self) -> &str;
    fn order(&self) -> usize;
    fn set_order(&mut self, order: usize);
}

impl Ordered for Module {
    fn id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> usize {
        self.order
    }
    fn set_order(&mut self, order: usize) {
        self.order = order;
    }
}

impl Ordered for Lesson {
    fn id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> usize {
        self.order
    }
    fn set_order(&mut self, order: usize) {
        self.order = order;
    }
}

pub fn renumber<T: Ordered>(items: &mut [T]) {
    for (idx, item) in items.iter_mut().enumerate() {
        item.set_order(idx);
    }
}

pub fn is_dense<T: Ordered>(items: &[T]) -> bool {
    items.iter().enumerate().all(|(idx, item)| item.order() == idx)
}

/// Appends `item` with `order = items.len()` and returns that order.
pub fn append<T: Ordered>(items: &mut Vec<T>, mut item: T) -> usize {
    let order = items.len();
    item.set_order(order);
    items.push(item);
    order
}

/// Removes the item with `id` and closes the gap.
pub fn remove<T: Ordered>(items: &mut Vec<T>, id: &str) -> Option<T> {
    let idx = items.iter().position(|item| item.id() == id)?;
    let removed = items.remove(idx);
    renumber(items);
    Some(removed)
}

/// Drag of the element at `from` to position `to`.
///
/// Returns `Ok(false)` when nothing moved (`from == to`).
pub fn move_item<T: Ordered>(items: &mut Vec<T>, from: usize, to: usize) -> Result<bool, ValidationError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(ValidationError::IndexOutOfRange { index, len });
        }
    }
    if from == to {
        return Ok(false);
    }
    let item = items.remove(from);
    items.insert(to, item);
    renumber(items);
    Ok(true)
}

/// Rearranges `items` to follow `ids`, which must be a permutation of the
/// current ids. Returns `Ok(false)` when the order is unchanged.
pub fn apply_id_order<T: Ordered>(items: &mut Vec<T>, ids: &[String]) -> Result<bool, ValidationError> {
    let unique: HashSet<&str> = ids.iter().map(String::as_str).collect();
    if ids.len() != items.len()
        || unique.len() != ids.len()
        || !items.iter().all(|item| unique.contains(item.id()))
    {
        return Err(ValidationError::NotAPermutation);
    }
    if items.iter().map(|item| item.id()).eq(ids.iter().map(String::as_str)) {
        return Ok(false);
    }
    let mut taken: Vec<Option<T>> = std::mem::take(items).into_iter().map(Some).collect();
    for id in ids {
        if let Some(slot) = taken.iter_mut().find(|slot| slot.as_ref().is_some_and(|t| t.id() == id.as_str())) {
            if let Some(item) = slot.take() {
                items.push(item);
            }
        }
    }
    renumber(items);
    Ok(true)
}

pub fn ids<T: Ordered>(items: &[T]) -> Vec<String> {
    items.iter().map(|item| item.id().to_string()).collect()
}
