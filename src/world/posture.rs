use crate::world::avatar::Posture;
use std::collections::HashMap;
use uuid::{uuid, Uuid};

/// Server-side locomotion animations and the posture each one implies
const STANDARD_POSTURES: &[(Uuid, Posture)] = &[
    (uuid!("6ed24bd8-91aa-4b12-ccc7-c97c857ab4e0"), Posture::Walk),
    (uuid!("47f5f6fb-22e5-ae44-f871-73aaaf4a6022"), Posture::Walk),
    (uuid!("2408fe9e-df1d-1d7d-f4ff-1384fa7b350f"), Posture::Stand),
    (uuid!("aec4610c-757f-bc4e-c092-c6e9caf18daf"), Posture::Fly),
    (uuid!("1a5fe8ac-a804-8a5d-7cbd-56bd83184568"), Posture::Sit),
    (uuid!("1c7600d6-661f-b87b-efe2-d7421eb93c86"), Posture::Sit),
    (uuid!("4ae8016b-31b9-03bb-c401-b1ea941db41d"), Posture::Hover),
    (uuid!("20f063ea-8306-2562-0b07-5c853b37b31e"), Posture::Hover),
    (uuid!("62c5de58-cb33-5743-3d07-9e4cd4352864"), Posture::Hover),
];

/// Immutable animation id -> posture lookup
#[derive(Debug, Clone, Default)]
pub struct PostureTable {
    postures: HashMap<Uuid, Posture>,
}

impl PostureTable {
    pub fn standard() -> Self {
        Self::from_entries(STANDARD_POSTURES.iter().copied())
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Uuid, Posture)>) -> Self {
        Self { postures: entries.into_iter().collect() }
    }

    pub fn get(&self, animation_id: &Uuid) -> Option<Posture> {
        self.postures.get(animation_id).copied()
    }

    /// Posture of the last id in `animation_ids` that has one
    pub fn resolve<'a>(&self, animation_ids: impl IntoIterator<Item = &'a Uuid>) -> Option<Posture> {
        animation_ids.into_iter().filter_map(|id| self.get(id)).last()
    }

    pub fn len(&self) -> usize {
        self.postures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postures.is_empty()
    }
}
