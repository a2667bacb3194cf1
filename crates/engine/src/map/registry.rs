use std::collections::HashMap;

use tracing::debug;

use super::tile::MapQuery;

/// Stable index into a [`MapRegistry`]. Replacing a map under the same name
/// keeps the handle valid; removing it leaves the handle dangling, and
/// [`MapRegistry::get`] then returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapHandle(u32);

#[derive(Debug, Default)]
pub struct MapRegistry {
    slots: Vec<Option<Box<dyn MapQuery>>>,
    handles_by_name: HashMap<String, MapHandle>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, map: impl MapQuery + 'static) -> MapHandle {
        let name = name.into();
        let map: Box<dyn MapQuery> = Box::new(map);
        if let Some(&handle) = self.handles_by_name.get(&name) {
            self.slots[handle.0 as usize] = Some(map);
            debug!(map = %name, handle = handle.0, "map_replaced");
            return handle;
        }

        let handle = MapHandle(self.slots.len() as u32);
        self.slots.push(Some(map));
        debug!(map = %name, handle = handle.0, "map_registered");
        self.handles_by_name.insert(name, handle);
        handle
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let Some(handle) = self.handles_by_name.remove(name) else {
            return false;
        };
        self.slots[handle.0 as usize] = None;
        debug!(map = %name, handle = handle.0, "map_removed");
        true
    }

    pub fn resolve(&self, name: &str) -> Option<MapHandle> {
        self.handles_by_name.get(name).copied()
    }

    pub fn get(&self, handle: MapHandle) -> Option<&dyn MapQuery> {
        self.slots
            .get(handle.0 as usize)
            .and_then(|slot| slot.as_deref())
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn MapQuery> {
        self.resolve(name).and_then(|handle| self.get(handle))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles_by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handles_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles_by_name.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles_by_name.keys().map(String::as_str)
    }
}
