use glam::Vec3;
use serde::{Deserialize, Serialize};

/// The kinds of scene component managed by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Light,
    Texture,
    Volume,
    Camera,
    Material,
    Entity,
    Transform,
}

impl ComponentKind {
    /// All kinds, in the order a scene synchronizes them.
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Transform,
        ComponentKind::Texture,
        ComponentKind::Volume,
        ComponentKind::Material,
        ComponentKind::Camera,
        ComponentKind::Light,
        ComponentKind::Entity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Texture => "Texture",
            Self::Volume => "Volume",
            Self::Camera => "Camera",
            Self::Material => "Material",
            Self::Entity => "Entity",
            Self::Transform => "Transform",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown component kind: {0}")]
pub struct ParseKindError(pub String);

impl std::str::FromStr for ComponentKind {
    type Err = ParseKindError;

    /// Case-insensitive kind name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseKindError(s.to_owned()))
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        self.min + (self.max - self.min) * 0.5
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(ComponentKind::Light.to_string(), "Light");
        assert_eq!(ComponentKind::Transform.as_str(), "Transform");
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("light".parse::<ComponentKind>(), Ok(ComponentKind::Light));
        assert_eq!("VOLUME".parse::<ComponentKind>(), Ok(ComponentKind::Volume));
        assert_eq!(
            "mesh".parse::<ComponentKind>(),
            Err(ParseKindError("mesh".to_owned()))
        );
    }

    #[test]
    fn all_kinds_listed_once() {
        let mut kinds = ComponentKind::ALL.to_vec();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 7);
    }

    #[test]
    fn aabb_center_is_midpoint() {
        let b = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, 4.0));
        assert_eq!(b.center(), Vec3::new(1.0, 2.0, 3.0));
    }
}
