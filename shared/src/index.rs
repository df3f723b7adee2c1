//! Id-keyed event index

use std::collections::HashMap;

use crate::models::Event;
use crate::types::EventId;

/// Hash map from event id to event record
#[derive(Debug, Clone, Default)]
pub struct EventIndex {
    events: HashMap<EventId, Event>,
}

impl EventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.events.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &EventId) -> Option<&mut Event> {
        self.events.get_mut(id)
    }

    /// Insert or replace, returning the previous record
    pub fn insert(&mut self, event: Event) -> Option<Event> {
        self.events.insert(event.id.clone(), event)
    }

    pub fn remove(&mut self, id: &EventId) -> Option<Event> {
        self.events.remove(id)
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.events.contains_key(id)
    }

    /// All records, in no particular order
    pub fn values(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EventId> {
        self.events.keys()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
