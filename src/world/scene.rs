//! Entity arena for avatars
//!
//! The scene owns every avatar. Everything else refers to avatars by
//! `LocalEntityId` and looks them up here.

use crate::world::avatar::AvatarEntity;
use crate::world::LocalEntityId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Scene {
    name: String,
    entities: HashMap<LocalEntityId, AvatarEntity>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entities: HashMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert an entity under its local id, replacing any previous one
    pub fn insert(&mut self, entity: AvatarEntity) -> &mut AvatarEntity {
        match self.entities.entry(entity.local_id()) {
            Entry::Occupied(mut slot) => {
                slot.insert(entity);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(entity),
        }
    }

    pub fn get(&self, local_id: LocalEntityId) -> Option<&AvatarEntity> {
        self.entities.get(&local_id)
    }

    pub fn get_mut(&mut self, local_id: LocalEntityId) -> Option<&mut AvatarEntity> {
        self.entities.get_mut(&local_id)
    }

    pub fn remove(&mut self, local_id: LocalEntityId) -> Option<AvatarEntity> {
        self.entities.remove(&local_id)
    }

    pub fn contains(&self, local_id: LocalEntityId) -> bool {
        self.entities.contains_key(&local_id)
    }

    pub fn ids(&self) -> Vec<LocalEntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &AvatarEntity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AvatarEntity> {
        self.entities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
