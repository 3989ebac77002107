use crate::event_model::{AttributeValue, KeyState, PriorityWidth};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

/// Maps group keys to their live state; the only place scores are mutated.
#[derive(Debug, Clone)]
pub struct PriorityStore<K> {
    width: PriorityWidth,
    states: HashMap<K, KeyState<K>>,
}

impl<K> PriorityStore<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(width: PriorityWidth) -> Self {
        Self {
            width,
            states: HashMap::new(),
        }
    }

    pub fn width(&self) -> PriorityWidth {
        self.width
    }

    pub fn get(&self, key: &K) -> Option<&KeyState<K>> {
        self.states.get(key)
    }

    /// Creates the key's state or additively merges into it, returning the updated state.
    pub(crate) fn merge(
        &mut self,
        key: K,
        delta: i64,
        passthrough: Vec<AttributeValue>,
    ) -> &mut KeyState<K> {
        let width = self.width;
        match self.states.entry(key) {
            Entry::Occupied(entry) => {
                let state = entry.into_mut();
                state.merge(delta, passthrough, width);
                state
            }
            Entry::Vacant(entry) => {
                let key = entry.key().clone();
                entry.insert(KeyState::new(key, delta, passthrough, width))
            }
        }
    }

    /// Applies one decay step, returning `None` for an unknown key.
    pub(crate) fn decay(&mut self, key: &K) -> Option<&mut KeyState<K>> {
        let width = self.width;
        let state = self.states.get_mut(key)?;
        state.decrement(width);
        Some(state)
    }

    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut KeyState<K>> {
        self.states.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.states.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(volume: i32) -> Vec<AttributeValue> {
        vec![AttributeValue::from("IBM"), AttributeValue::Int(volume)]
    }

    #[test]
    fn merge_accumulates_score_and_keeps_latest_attributes() {
        let mut store = PriorityStore::new(PriorityWidth::Long);
        store.merge("IBM", 1, attrs(0));
        let state = store.merge("IBM", 3, attrs(1));
        assert_eq!(state.score(), 4);
        assert_eq!(state.passthrough()[1], AttributeValue::Int(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn negative_values_floor_at_zero() {
        let mut store = PriorityStore::new(PriorityWidth::Long);
        assert_eq!(store.merge("IBM", -5, attrs(0)).score(), 0);
        store.merge("IBM", 10, attrs(0));
        assert_eq!(store.merge("IBM", -100, attrs(0)).score(), 0);
    }

    #[test]
    fn int_width_saturates() {
        let mut store = PriorityStore::new(PriorityWidth::Int);
        store.merge("IBM", i64::from(i32::MAX), attrs(0));
        let state = store.merge("IBM", 5, attrs(0));
        assert_eq!(state.score(), i64::from(i32::MAX));
    }

    #[test]
    fn decay_steps_by_one_and_stays_at_floor() {
        let mut store = PriorityStore::new(PriorityWidth::Long);
        store.merge("IBM", 2, attrs(0));
        assert_eq!(store.decay(&"IBM").map(|s| s.score()), Some(1));
        assert_eq!(store.decay(&"IBM").map(|s| s.score()), Some(0));
        assert_eq!(store.decay(&"IBM").map(|s| s.score()), Some(0));
        assert!(store.decay(&"WSO2").is_none());
    }
}
