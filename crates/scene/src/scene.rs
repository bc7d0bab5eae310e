use prism_common::{ComponentKind, ConfigError, SceneConfig};
use prism_registry::{Component, Handle, Registry, RegistryError};
use std::collections::BTreeMap;

use crate::camera::Camera;
use crate::entity::{Entity, EntityParts};
use crate::light::Light;
use crate::material::Material;
use crate::texture::Texture;
use crate::transform::Transform;
use crate::volume::Volume;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("entity references {kind} slot {index}, which holds no live record")]
    DanglingReference { kind: ComponentKind, index: u32 },
}

/// Kind-erased view of one registry, for scene-wide passes and tooling.
pub trait ComponentTable: Sync {
    fn kind(&self) -> ComponentKind;
    fn initialize_factory(&self, max_components: u32) -> Result<(), RegistryError>;
    fn is_factory_initialized(&self) -> bool;
    fn capacity(&self) -> Result<u32, RegistryError>;
    fn len(&self) -> Result<usize, RegistryError>;
    fn are_any_dirty(&self) -> bool;
    fn update_components(&self) -> Result<usize, RegistryError>;
    fn clear_all(&self) -> Result<usize, RegistryError>;
    fn teardown(&self) -> Result<(), RegistryError>;
    fn name_to_id_map(&self) -> Result<BTreeMap<String, u32>, RegistryError>;
    /// JSON description of the record named `name`, `None` on a miss.
    fn describe_by_name(&self, name: &str) -> Result<Option<String>, RegistryError>;
}

impl<T: Component> ComponentTable for Registry<T> {
    fn kind(&self) -> ComponentKind {
        T::KIND
    }

    fn initialize_factory(&self, max_components: u32) -> Result<(), RegistryError> {
        Registry::initialize_factory(self, max_components)
    }

    fn is_factory_initialized(&self) -> bool {
        Registry::is_factory_initialized(self)
    }

    fn capacity(&self) -> Result<u32, RegistryError> {
        Registry::capacity(self)
    }

    fn len(&self) -> Result<usize, RegistryError> {
        Registry::len(self)
    }

    fn are_any_dirty(&self) -> bool {
        Registry::are_any_dirty(self)
    }

    fn update_components(&self) -> Result<usize, RegistryError> {
        Registry::update_components(self)
    }

    fn clear_all(&self) -> Result<usize, RegistryError> {
        Registry::clear_all(self)
    }

    fn teardown(&self) -> Result<(), RegistryError> {
        Registry::teardown(self)
    }

    fn name_to_id_map(&self) -> Result<BTreeMap<String, u32>, RegistryError> {
        Registry::name_to_id_map(self)
    }

    fn describe_by_name(&self, name: &str) -> Result<Option<String>, RegistryError> {
        let _guard = self.lock();
        match self.get(name)? {
            Some(handle) => self.describe(handle).map(Some),
            None => Ok(None),
        }
    }
}

/// Per-kind slot counts from one scene-wide synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    synced: BTreeMap<ComponentKind, usize>,
}

impl SyncReport {
    pub fn record(&mut self, kind: ComponentKind, synced: usize) {
        self.synced.insert(kind, synced);
    }

    pub fn synced(&self, kind: ComponentKind) -> usize {
        self.synced.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.synced.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Owns one registry per component kind.
///
/// A scene is an explicit context object: there are no process-wide
/// registries, and several scenes can coexist. Share it across threads by
/// reference (scoped threads) or behind an `Arc`.
#[derive(Default)]
pub struct Scene {
    pub transforms: Registry<Transform>,
    pub textures: Registry<Texture>,
    pub volumes: Registry<Volume>,
    pub materials: Registry<Material>,
    pub cameras: Registry<Camera>,
    pub lights: Registry<Light>,
    pub entities: Registry<Entity>,
}

impl Scene {
    /// An uninitialized scene. Call [`Scene::initialize`] before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and initialize every registry from it.
    pub fn with_config(config: &SceneConfig) -> Result<Self, SceneError> {
        let scene = Self::new();
        scene.initialize(config)?;
        Ok(scene)
    }

    /// Initialize every registry. Registries that are already initialized
    /// keep their capacity and contents.
    pub fn initialize(&self, config: &SceneConfig) -> Result<(), SceneError> {
        config.validate()?;
        let _span = tracing::info_span!("scene_initialize").entered();
        for table in self.tables() {
            table.initialize_factory(config.capacity(table.kind()))?;
        }
        tracing::info!(
            entities = config.max_entities,
            lights = config.max_lights,
            textures = config.max_textures,
            volumes = config.max_volumes,
            "scene initialized"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.tables().iter().all(|t| t.is_factory_initialized())
    }

    /// Every registry, in synchronization order: referenced kinds come
    /// before the kinds that reference them.
    pub fn tables(&self) -> [&dyn ComponentTable; 7] {
        [
            &self.transforms,
            &self.textures,
            &self.volumes,
            &self.materials,
            &self.cameras,
            &self.lights,
            &self.entities,
        ]
    }

    pub fn table(&self, kind: ComponentKind) -> &dyn ComponentTable {
        match kind {
            ComponentKind::Transform => &self.transforms,
            ComponentKind::Texture => &self.textures,
            ComponentKind::Volume => &self.volumes,
            ComponentKind::Material => &self.materials,
            ComponentKind::Camera => &self.cameras,
            ComponentKind::Light => &self.lights,
            ComponentKind::Entity => &self.entities,
        }
    }

    /// Run the synchronization pass on every registry.
    pub fn update_components(&self) -> Result<SyncReport, SceneError> {
        let _span = tracing::info_span!("scene_sync").entered();
        let mut report = SyncReport::default();
        for table in self.tables() {
            report.record(table.kind(), table.update_components()?);
        }
        if !report.is_empty() {
            tracing::debug!(total = report.total(), "scene synchronized");
        }
        Ok(report)
    }

    pub fn are_any_dirty(&self) -> bool {
        self.tables().iter().any(|t| t.are_any_dirty())
    }

    /// Remove every record of every kind. Returns the number removed.
    pub fn clear_all(&self) -> Result<usize, SceneError> {
        let mut removed = 0;
        for table in self.tables() {
            removed += table.clear_all()?;
        }
        tracing::info!(removed, "scene cleared");
        Ok(removed)
    }

    /// Release every registry's tables.
    pub fn teardown(&self) -> Result<(), SceneError> {
        for table in self.tables() {
            table.teardown()?;
        }
        tracing::info!("scene torn down");
        Ok(())
    }

    /// Create an entity after checking that every handle in `parts` names a
    /// live record.
    ///
    /// The check is a snapshot: a referenced record removed afterwards leaves
    /// the entity pointing at an empty slot.
    pub fn create_entity(
        &self,
        name: &str,
        parts: EntityParts,
    ) -> Result<Handle<Entity>, SceneError> {
        check_live(&self.transforms, parts.transform)?;
        check_live(&self.materials, parts.material)?;
        check_live(&self.lights, parts.light)?;
        check_live(&self.cameras, parts.camera)?;
        check_live(&self.volumes, parts.volume)?;
        Ok(Entity::create_with_components(&self.entities, name, parts)?)
    }
}

fn check_live<T: Component>(
    registry: &Registry<T>,
    handle: Option<Handle<T>>,
) -> Result<(), SceneError> {
    match handle {
        Some(h) if !registry.contains(h)? => Err(SceneError::DanglingReference {
            kind: T::KIND,
            index: h.index(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn scene() -> Scene {
        Scene::with_config(&SceneConfig::uniform(8)).unwrap()
    }

    #[test]
    fn uninitialized_scene_rejects_use() {
        let scene = Scene::new();
        assert!(!scene.is_initialized());
        assert!(matches!(
            Light::create(&scene.lights, "sun"),
            Err(RegistryError::NotInitialized { .. })
        ));
    }

    #[test]
    fn initialize_uses_per_kind_capacity() {
        let config = SceneConfig {
            max_cameras: 2,
            ..SceneConfig::default()
        };
        let scene = Scene::with_config(&config).unwrap();
        assert!(scene.is_initialized());
        assert_eq!(scene.cameras.capacity().unwrap(), 2);
        assert_eq!(scene.lights.capacity().unwrap(), config.max_lights);
    }

    #[test]
    fn zero_capacity_config_is_rejected() {
        let config = SceneConfig {
            max_volumes: 0,
            ..SceneConfig::uniform(4)
        };
        assert!(matches!(
            Scene::with_config(&config),
            Err(SceneError::Config(ConfigError::ZeroCapacity(ComponentKind::Volume)))
        ));
    }

    #[test]
    fn scene_wide_sync_reports_per_kind() {
        let scene = scene();
        let t = Transform::create_with_transform(
            &scene.transforms,
            "t",
            Vec3::Y,
            Quat::IDENTITY,
            Vec3::ONE,
        )
        .unwrap();
        let l = Light::create(&scene.lights, "l").unwrap();
        scene
            .create_entity(
                "lamp",
                EntityParts {
                    transform: Some(t),
                    light: Some(l),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(scene.are_any_dirty());

        let report = scene.update_components().unwrap();
        assert_eq!(report.synced(ComponentKind::Transform), 1);
        assert_eq!(report.synced(ComponentKind::Light), 1);
        assert_eq!(report.synced(ComponentKind::Entity), 1);
        assert_eq!(report.total(), 3);
        assert!(!scene.are_any_dirty());
        assert!(scene.update_components().unwrap().is_empty());
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let scene = scene();
        let m = Material::create(&scene.materials, "m").unwrap();
        scene.materials.remove("m").unwrap();

        let err = scene
            .create_entity(
                "orphan",
                EntityParts {
                    material: Some(m),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::DanglingReference {
                kind: ComponentKind::Material,
                index: 0
            }
        ));
        assert_eq!(scene.entities.get("orphan").unwrap(), None);
    }

    #[test]
    fn clear_all_then_teardown() {
        let scene = scene();
        Light::create(&scene.lights, "a").unwrap();
        Camera::create(&scene.cameras, "b").unwrap();
        Material::create(&scene.materials, "c").unwrap();
        assert_eq!(scene.clear_all().unwrap(), 3);
        assert_eq!(scene.lights.len().unwrap(), 0);
        // removals still need a pass to reset the structs
        assert!(scene.are_any_dirty());

        scene.teardown().unwrap();
        assert!(!scene.is_initialized());
        assert!(!scene.are_any_dirty());
    }

    #[test]
    fn table_lookup_matches_kind() {
        let scene = scene();
        for kind in ComponentKind::ALL {
            assert_eq!(scene.table(kind).kind(), kind);
        }
        let order: Vec<_> = scene.tables().iter().map(|t| t.kind()).collect();
        assert_eq!(order, ComponentKind::ALL.to_vec());
    }

    #[test]
    fn describe_by_name_through_erased_table() {
        let scene = scene();
        Light::create_from_rgb(&scene.lights, "sun", Vec3::ONE, 5.0).unwrap();
        let text = scene
            .table(ComponentKind::Light)
            .describe_by_name("sun")
            .unwrap()
            .unwrap();
        assert!(text.contains("\"name\": \"sun\""));
        assert_eq!(
            scene.table(ComponentKind::Light).describe_by_name("moon").unwrap(),
            None
        );
    }

    #[test]
    fn concurrent_creators_and_sync() {
        let scene = scene();
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..8 {
                    Light::create(&scene.lights, &format!("light-{i}")).unwrap();
                }
            });
            s.spawn(|| {
                for i in 0..8 {
                    Transform::create(&scene.transforms, &format!("xf-{i}")).unwrap();
                }
            });
            s.spawn(|| {
                for _ in 0..16 {
                    scene.update_components().unwrap();
                }
            });
        });
        scene.update_components().unwrap();
        assert_eq!(scene.lights.len().unwrap(), 8);
        assert_eq!(scene.transforms.len().unwrap(), 8);
        assert!(!scene.are_any_dirty());
    }
}
