use heron_core::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A model registry backed by a fixed set of models.
///
/// Usually loaded once at startup from a JSON file mapping model ids to their tags:
///
/// ```json
/// {
///   "PassThroughModel:1729": { "python_environment_name": "heron/passthrough:1" }
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticModelRegistry {
    models: Arc<HashMap<String, Model>>,
}

impl StaticModelRegistry {
    pub fn new(models: impl IntoIterator<Item = Model>) -> Self {
        let models = models.into_iter().map(|m| (m.id.clone(), m)).collect();
        Self {
            models: Arc::new(models),
        }
    }

    pub fn from_json(data: &[u8]) -> Result<Self, RegistryError> {
        let raw: HashMap<String, HashMap<String, String>> = serde_json::from_slice(data)
            .map_err(|e| RegistryError::System(format!("Invalid model registry: {e}")))?;

        Ok(Self::new(
            raw.into_iter().map(|(id, tags)| Model { id, tags }),
        ))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            RegistryError::System(format!("Failed to read {}: {e}", path.display()))
        })?;

        let registry = Self::from_json(&data)?;
        info!(
            "Loaded {} model(s) from {}",
            registry.models.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelRegistry for StaticModelRegistry {
    async fn resolve(&self, model_id: &str) -> Result<Model, RegistryError> {
        self.models
            .get(model_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(model_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_models_from_json() {
        let registry = StaticModelRegistry::from_json(
            br#"{"PassThroughModel:1729": {"python_environment_name": "heron/passthrough:1"}}"#,
        )
        .unwrap();

        let model = registry.resolve("PassThroughModel:1729").await.unwrap();
        assert_eq!(model.environment(), Some("heron/passthrough:1"));

        let err = registry.resolve("PassThroughModel:1").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(id) if id == "PassThroughModel:1"));
    }

    #[tokio::test]
    async fn load_reports_unreadable_files_as_system_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");

        let err = StaticModelRegistry::load(&path).await.unwrap_err();
        assert!(matches!(err, RegistryError::System(_)));

        tokio::fs::write(&path, b"[1, 2]").await.unwrap();
        let err = StaticModelRegistry::load(&path).await.unwrap_err();
        assert!(matches!(err, RegistryError::System(_)));

        tokio::fs::write(&path, br#"{"m:1": {}}"#).await.unwrap();
        assert_eq!(StaticModelRegistry::load(&path).await.unwrap().len(), 1);
    }
}
