//! Geometry loading.
//! Turns a body's declared source into an owned [`RigidBody`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use kinema_core::{Element, KinemaError, KinemaResult, RigidBody};

/// Produces rigid bodies from structure sources.
pub trait GeometryLoader {
    /// Load the body declared by `entity` from `source`.
    ///
    /// Returned bodies are centered: their origin sits at the world origin.
    fn load(&self, entity: &str, source: &Path) -> KinemaResult<RigidBody>;
}

/// On-disk body format: either a bare element list or `{ "elements": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum BodyFile {
    Elements(Vec<Element>),
    Wrapped { elements: Vec<Element> },
}

impl BodyFile {
    fn into_elements(self) -> Vec<Element> {
        match self {
            BodyFile::Elements(elements) | BodyFile::Wrapped { elements } => elements,
        }
    }
}

/// Loads JSON element lists from files relative to a root directory.
#[derive(Debug, Clone)]
pub struct JsonBodyLoader {
    root: PathBuf,
}

impl JsonBodyLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, source: &Path) -> PathBuf {
        if source.is_absolute() {
            source.to_path_buf()
        } else {
            self.root.join(source)
        }
    }
}

impl GeometryLoader for JsonBodyLoader {
    fn load(&self, entity: &str, source: &Path) -> KinemaResult<RigidBody> {
        let path = self.resolve(source);
        tracing::info!("Loading body {} from {}", entity, path.display());
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| KinemaError::source_load(entity, &path, e.to_string()))?;
        let file: BodyFile = serde_json::from_str(&contents)
            .map_err(|e| KinemaError::source_load(entity, &path, e.to_string()))?;
        let elements = file.into_elements();
        if elements.is_empty() {
            return Err(KinemaError::source_load(entity, &path, "body has no elements"));
        }
        Ok(RigidBody::centered(entity, elements))
    }
}

/// Serves pre-built bodies keyed by source path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    bodies: HashMap<PathBuf, Vec<Element>>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the elements served for `source`.
    pub fn with_body(mut self, source: impl Into<PathBuf>, elements: Vec<Element>) -> Self {
        self.bodies.insert(source.into(), elements);
        self
    }

    pub fn insert(&mut self, source: impl Into<PathBuf>, elements: Vec<Element>) {
        self.bodies.insert(source.into(), elements);
    }
}

impl GeometryLoader for InMemoryLoader {
    fn load(&self, entity: &str, source: &Path) -> KinemaResult<RigidBody> {
        let elements = self
            .bodies
            .get(source)
            .ok_or_else(|| KinemaError::source_load(entity, source, "no such body registered"))?;
        Ok(RigidBody::centered(entity, elements.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::Vec3;

    fn unique_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kinema-loader-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_json_loader_centers_body() {
        let dir = unique_dir("center");
        std::fs::write(
            dir.join("h2.json"),
            r#"[{"symbol": "H", "position": [10, 0, 0]}, {"symbol": "H", "position": [12, 0, 0]}]"#,
        )
        .unwrap();
        let loader = JsonBodyLoader::new(&dir);
        let body = loader.load("h2", Path::new("h2.json")).unwrap();
        assert_eq!(body.name, "h2");
        assert_eq!(body.origin, Vec3::zero());
        assert_eq!(body.elements[1].position, Vec3::new(1.0, 0.0, 0.0));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_json_loader_accepts_wrapped_form() {
        let dir = unique_dir("wrapped");
        std::fs::write(
            dir.join("o.json"),
            r#"{"elements": [{"symbol": "O", "position": [1, 1, 1]}]}"#,
        )
        .unwrap();
        let body = JsonBodyLoader::new(&dir)
            .load("o", Path::new("o.json"))
            .unwrap();
        assert_eq!(body.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_json_loader_missing_file() {
        let err = JsonBodyLoader::new("/nonexistent")
            .load("water", Path::new("water.json"))
            .unwrap_err();
        assert!(matches!(err, KinemaError::SourceLoad { ref entity, .. } if entity == "water"));
    }

    #[test]
    fn test_in_memory_loader() {
        let loader = InMemoryLoader::new().with_body(
            "water.json",
            vec![
                Element::new("O", Vec3::zero()),
                Element::new("H", Vec3::new(2.0, 0.0, 0.0)),
            ],
        );
        let body = loader.load("water1", Path::new("water.json")).unwrap();
        assert_eq!(body.name, "water1");
        assert_eq!(body.elements[0].position, Vec3::new(-1.0, 0.0, 0.0));
        assert!(loader.load("x", Path::new("missing.json")).is_err());
    }
}
