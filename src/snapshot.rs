//! Snapshot serialization of store and resource state
//!
//! Types are made reconstructable by registering a codec for them under a
//! stable name. Anything without a codec is left out of a capture and
//! skipped on restore.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::ecs::{Component, EntityId, Store, World};
use crate::error::{HiveError, Result};
use crate::resources::{Resource, ResourceRegistry};

/// A value tagged with the name of its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedValue {
    #[serde(rename = "__type__")]
    pub type_name: String,
    pub data: Value,
}

/// Serialized store and resource state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Next entity ID to issue
    pub next_id: EntityId,
    /// Type name -> stringified entity ID -> component
    #[serde(default)]
    pub components: BTreeMap<String, BTreeMap<String, TaggedValue>>,
    /// Type name -> resource
    #[serde(default)]
    pub resources: BTreeMap<String, TaggedValue>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|source| HiveError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&crate::config::read_to_string(path.as_ref())?)
    }
}

type EncodeComponents = fn(&Store, &str) -> Result<Option<BTreeMap<String, TaggedValue>>>;
type DecodeComponent = fn(&Value) -> Result<StagedComponent>;
type EncodeResource = fn(&ResourceRegistry, &str) -> Result<Option<TaggedValue>>;
type DecodeResource = fn(&Value) -> Result<StagedResource>;

/// A decoded value waiting to be inserted.
type StagedComponent = Box<dyn FnOnce(&mut Store, EntityId)>;
type StagedResource = Box<dyn FnOnce(&mut ResourceRegistry)>;

struct ComponentCodec {
    encode: EncodeComponents,
    decode: DecodeComponent,
}

struct ResourceCodec {
    encode: EncodeResource,
    decode: DecodeResource,
}

/// Explicit type-name -> codec table, filled in at startup.
#[derive(Default)]
pub struct SnapshotRegistry {
    components: BTreeMap<String, ComponentCodec>,
    resources: BTreeMap<String, ResourceCodec>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_component<T>(&mut self, name: impl Into<String>) -> Result<()>
    where
        T: Component + Serialize + DeserializeOwned,
    {
        let name = name.into();
        if self.components.contains_key(&name) {
            return Err(HiveError::DuplicateCodec(name));
        }
        self.components.insert(
            name,
            ComponentCodec {
                encode: encode_components::<T>,
                decode: decode_component::<T>,
            },
        );
        Ok(())
    }

    pub fn register_resource<R>(&mut self, name: impl Into<String>) -> Result<()>
    where
        R: Resource + Serialize + DeserializeOwned,
    {
        let name = name.into();
        if self.resources.contains_key(&name) {
            return Err(HiveError::DuplicateCodec(name));
        }
        self.resources.insert(
            name,
            ResourceCodec {
                encode: encode_resource::<R>,
                decode: decode_resource::<R>,
            },
        );
        Ok(())
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Encode every registered type present in `world`.
    pub fn capture(&self, world: &World) -> Result<Snapshot> {
        let mut snapshot = Snapshot {
            next_id: world.store().next_id(),
            ..Snapshot::default()
        };
        for (name, codec) in &self.components {
            if let Some(entries) = (codec.encode)(world.store(), name)? {
                snapshot.components.insert(name.clone(), entries);
            }
        }
        for (name, codec) in &self.resources {
            if let Some(value) = (codec.encode)(world.resources(), name)? {
                snapshot.resources.insert(name.clone(), value);
            }
        }
        Ok(snapshot)
    }

    /// Load `snapshot` into `world`.
    ///
    /// Restored entities become live and creation resumes at the larger of
    /// the world's and the snapshot's `next_id`. Every entry is decoded
    /// before anything is written, so a failed restore leaves `world`
    /// untouched.
    pub fn restore(&self, snapshot: &Snapshot, world: &mut World) -> Result<()> {
        let mut components = Vec::new();
        for (name, entries) in &snapshot.components {
            let Some(codec) = self.components.get(name) else {
                debug!(component = %name, "no codec registered, skipped");
                continue;
            };
            for (key, value) in entries {
                let entity: EntityId = key
                    .parse()
                    .map_err(|_| HiveError::InvalidEntityKey(key.clone()))?;
                components.push((entity, (codec.decode)(&value.data)?));
            }
        }
        let mut resources = Vec::new();
        for (name, value) in &snapshot.resources {
            let Some(codec) = self.resources.get(name) else {
                debug!(resource = %name, "no codec registered, skipped");
                continue;
            };
            resources.push((codec.decode)(&value.data)?);
        }

        let store = world.store_mut();
        for (entity, insert) in components {
            store.claim_entity(entity);
            insert(&mut *store, entity);
        }
        store.resume_from(snapshot.next_id);
        for insert in resources {
            insert(world.resources_mut());
        }
        Ok(())
    }
}

fn encode_components<T: Component + Serialize>(
    store: &Store,
    name: &str,
) -> Result<Option<BTreeMap<String, TaggedValue>>> {
    let Some(storage) = store.storage::<T>() else {
        return Ok(None);
    };
    let mut entries = BTreeMap::new();
    for (entity, component) in storage.iter() {
        entries.insert(
            entity.to_string(),
            TaggedValue {
                type_name: name.to_string(),
                data: serde_json::to_value(component)?,
            },
        );
    }
    Ok((!entries.is_empty()).then_some(entries))
}

fn decode_component<T: Component + DeserializeOwned>(data: &Value) -> Result<StagedComponent> {
    let component = T::deserialize(data)?;
    Ok(Box::new(move |store: &mut Store, entity: EntityId| {
        store.add_component(entity, component);
    }))
}

fn encode_resource<R: Resource + Serialize>(
    resources: &ResourceRegistry,
    name: &str,
) -> Result<Option<TaggedValue>> {
    if !resources.has::<R>() {
        return Ok(None);
    }
    let resource = resources.get::<R>()?;
    Ok(Some(TaggedValue {
        type_name: name.to_string(),
        data: serde_json::to_value(resource)?,
    }))
}

fn decode_resource<R: Resource + DeserializeOwned>(data: &Value) -> Result<StagedResource> {
    let resource = R::deserialize(data)?;
    Ok(Box::new(move |resources: &mut ResourceRegistry| {
        resources.register(resource);
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Position {
        x: i32,
        y: i32,
    }
    impl Component for Position {}

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tick(u64);
    impl Resource for Tick {}

    struct Secret;
    impl Component for Secret {}

    fn registry() -> SnapshotRegistry {
        let mut registry = SnapshotRegistry::new();
        registry.register_component::<Position>("Position").unwrap();
        registry.register_resource::<Tick>("Tick").unwrap();
        registry
    }

    #[test]
    fn test_capture_layout() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Position { x: 1, y: 2 });
        world.add_component(e, Secret);
        world.resources_mut().register(Tick(7));

        let snapshot = registry().capture(&world).unwrap();

        assert_eq!(snapshot.next_id, 1);
        let entry = &snapshot.components["Position"]["0"];
        assert_eq!(entry.type_name, "Position");
        assert_eq!(entry.data, serde_json::json!({"x": 1, "y": 2}));
        assert_eq!(snapshot.components.len(), 1);
        assert_eq!(snapshot.resources["Tick"].data, serde_json::json!(7));
    }

    #[test]
    fn test_json_uses_type_tag() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Position { x: 3, y: 4 });

        let json = registry().capture(&world).unwrap().to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["components"]["Position"]["0"]["__type__"], "Position");
        assert_eq!(value["next_id"], 1);
    }

    #[test]
    fn test_restore_into_fresh_world() {
        let mut world = World::new();
        for _ in 0..3 {
            world.create_entity();
        }
        world.add_component(2, Position { x: 5, y: 6 });
        world.resources_mut().register(Tick(11));
        let snapshot = registry().capture(&world).unwrap();

        let mut fresh = World::new();
        registry().restore(&snapshot, &mut fresh).unwrap();

        assert_eq!(fresh.get_component::<Position>(2), Some(&Position { x: 5, y: 6 }));
        assert!(fresh.store().is_alive(2));
        assert_eq!(fresh.store().next_id(), 3);
        assert_eq!(fresh.create_entity(), 3);
        assert_eq!(fresh.resources().get::<Tick>().unwrap(), &Tick(11));
    }

    #[test]
    fn test_unknown_types_are_skipped() {
        let text = r#"{
            "next_id": 4,
            "components": {
                "Velocity": {"1": {"__type__": "Velocity", "data": {"dx": 1}}},
                "Position": {"1": {"__type__": "Position", "data": {"x": 0, "y": 9}}}
            },
            "resources": {"Weather": {"__type__": "Weather", "data": "rain"}}
        }"#;
        let snapshot = Snapshot::from_json(text).unwrap();

        let mut world = World::new();
        registry().restore(&snapshot, &mut world).unwrap();

        assert_eq!(world.get_component::<Position>(1), Some(&Position { x: 0, y: 9 }));
        assert_eq!(world.store().component_type_names().len(), 1);
        assert!(world.resources().is_empty());
        assert_eq!(world.store().next_id(), 4);
    }

    #[test]
    fn test_bad_entity_key() {
        let text = r#"{"next_id": 1, "components": {"Position": {
            "abc": {"__type__": "Position", "data": {"x": 0, "y": 0}}
        }}}"#;
        let snapshot = Snapshot::from_json(text).unwrap();

        let err = registry().restore(&snapshot, &mut World::new()).unwrap_err();
        assert!(matches!(err, HiveError::InvalidEntityKey(ref key) if key == "abc"));
    }

    #[test]
    fn test_failed_restore_leaves_world_untouched() {
        let text = r#"{
            "next_id": 9,
            "components": {
                "Position": {
                    "0": {"__type__": "Position", "data": {"x": 1, "y": 1}},
                    "zz": {"__type__": "Position", "data": {"x": 2, "y": 2}}
                }
            },
            "resources": {"Tick": {"__type__": "Tick", "data": 3}}
        }"#;
        let snapshot = Snapshot::from_json(text).unwrap();
        let mut world = World::new();

        assert!(registry().restore(&snapshot, &mut world).is_err());
        assert_eq!(world.store().entity_count(), 0);
        assert!(!world.has_component::<Position>(0));
        assert_eq!(world.store().next_id(), 0);
        assert!(world.resources().is_empty());
    }

    #[test]
    fn test_bad_resource_data_rejects_whole_restore() {
        let text = r#"{
            "next_id": 2,
            "components": {"Position": {"1": {"__type__": "Position", "data": {"x": 4, "y": 5}}}},
            "resources": {"Tick": {"__type__": "Tick", "data": "soon"}}
        }"#;
        let snapshot = Snapshot::from_json(text).unwrap();
        let mut world = World::new();

        let err = registry().restore(&snapshot, &mut world).unwrap_err();
        assert!(matches!(err, HiveError::Snapshot(_)));
        assert!(!world.store().is_alive(1));
        assert!(world.get_component::<Position>(1).is_none());
    }

    #[test]
    fn test_duplicate_codec_name() {
        let mut registry = registry();
        let err = registry.register_component::<Position>("Position").unwrap_err();
        assert!(matches!(err, HiveError::DuplicateCodec(ref name) if name == "Position"));
    }
}
