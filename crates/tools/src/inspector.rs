use prism_common::ComponentKind;
use prism_registry::RegistryError;
use prism_scene::Scene;

/// Read-only queries against a scene for debugging and developer UI.
pub struct SceneInspector;

impl SceneInspector {
    /// Occupancy and dirty state of every registry, in synchronization order.
    pub fn summary(scene: &Scene) -> Result<SceneSummary, RegistryError> {
        let mut rows = Vec::new();
        for table in scene.tables() {
            rows.push(KindSummary {
                kind: table.kind(),
                live: table.len()?,
                capacity: table.capacity()?,
                dirty: table.are_any_dirty(),
            });
        }
        Ok(SceneSummary { rows })
    }

    /// JSON description of the record of `kind` named `name`, `None` on a miss.
    pub fn inspect(
        scene: &Scene,
        kind: ComponentKind,
        name: &str,
    ) -> Result<Option<String>, RegistryError> {
        scene.table(kind).describe_by_name(name)
    }

    /// Names of the live records of `kind` with their ids, sorted by name.
    pub fn list(scene: &Scene, kind: ComponentKind) -> Result<Vec<(String, u32)>, RegistryError> {
        Ok(scene.table(kind).name_to_id_map()?.into_iter().collect())
    }
}

/// One registry's row in a [`SceneSummary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindSummary {
    pub kind: ComponentKind,
    pub live: usize,
    pub capacity: u32,
    pub dirty: bool,
}

#[derive(Debug, Clone)]
pub struct SceneSummary {
    pub rows: Vec<KindSummary>,
}

impl SceneSummary {
    pub fn row(&self, kind: ComponentKind) -> Option<&KindSummary> {
        self.rows.iter().find(|r| r.kind == kind)
    }

    pub fn total_live(&self) -> usize {
        self.rows.iter().map(|r| r.live).sum()
    }
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<10} {:>8} {:>10}  dirty", "kind", "live", "capacity")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<10} {:>8} {:>10}  {}",
                row.kind.as_str(),
                row.live,
                row.capacity,
                if row.dirty { "yes" } else { "no" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use prism_common::SceneConfig;
    use prism_scene::{Light, Material};

    fn scene() -> Scene {
        Scene::with_config(&SceneConfig::uniform(3)).unwrap()
    }

    #[test]
    fn summary_empty_scene() {
        let summary = SceneInspector::summary(&scene()).unwrap();
        assert_eq!(summary.rows.len(), 7);
        assert_eq!(summary.total_live(), 0);
        assert!(summary.rows.iter().all(|r| r.capacity == 3 && !r.dirty));
    }

    #[test]
    fn summary_tracks_dirty_kinds() {
        let scene = scene();
        Light::create(&scene.lights, "a").unwrap();
        Light::create(&scene.lights, "b").unwrap();

        let summary = SceneInspector::summary(&scene).unwrap();
        let lights = summary.row(ComponentKind::Light).unwrap();
        assert_eq!(lights.live, 2);
        assert!(lights.dirty);
        assert!(!summary.row(ComponentKind::Camera).unwrap().dirty);

        scene.update_components().unwrap();
        let summary = SceneInspector::summary(&scene).unwrap();
        assert!(!summary.row(ComponentKind::Light).unwrap().dirty);
    }

    #[test]
    fn summary_on_uninitialized_scene_fails() {
        assert!(matches!(
            SceneInspector::summary(&Scene::new()),
            Err(RegistryError::NotInitialized { .. })
        ));
    }

    #[test]
    fn inspect_found_and_missing() {
        let scene = scene();
        Light::create_from_rgb(&scene.lights, "sun", Vec3::ONE, 5.0).unwrap();

        let json = SceneInspector::inspect(&scene, ComponentKind::Light, "sun")
            .unwrap()
            .unwrap();
        assert!(json.contains("\"intensity\": 5.0"));
        assert_eq!(
            SceneInspector::inspect(&scene, ComponentKind::Light, "moon").unwrap(),
            None
        );
        // names are per kind
        assert_eq!(
            SceneInspector::inspect(&scene, ComponentKind::Material, "sun").unwrap(),
            None
        );
    }

    #[test]
    fn list_is_sorted_by_name() {
        let scene = scene();
        Material::create(&scene.materials, "steel").unwrap();
        Material::create(&scene.materials, "brass").unwrap();
        let names = SceneInspector::list(&scene, ComponentKind::Material).unwrap();
        assert_eq!(
            names,
            vec![("brass".to_owned(), 1), ("steel".to_owned(), 0)]
        );
    }

    #[test]
    fn summary_display() {
        let text = SceneInspector::summary(&scene()).unwrap().to_string();
        assert!(text.starts_with("kind"));
        assert!(text.contains("Light"));
    }
}
