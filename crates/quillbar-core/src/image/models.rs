//! Image generation model definitions

use serde::Serialize;

/// Information about an image generation model
#[derive(Debug, Clone, Serialize)]
pub struct ImageModel {
    /// Model identifier (owner/name)
    pub id: &'static str,
    /// Human-readable name
    pub name: &'static str,
    pub description: &'static str,
}

/// Models offered for selection; the first is the default
pub const IMAGE_MODELS: &[ImageModel] = &[
    ImageModel {
        id: "black-forest-labs/flux-dev",
        name: "FLUX.1 [dev]",
        description: "Open-weight FLUX model, good quality at lower cost",
    },
    ImageModel {
        id: "black-forest-labs/flux-pro",
        name: "FLUX.1 [pro]",
        description: "State-of-the-art FLUX model with the best prompt following",
    },
];

impl ImageModel {
    /// Look up a model by its identifier
    pub fn by_id(id: &str) -> Option<&'static ImageModel> {
        IMAGE_MODELS.iter().find(|m| m.id == id)
    }

    pub fn default_model() -> &'static ImageModel {
        &IMAGE_MODELS[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_id() {
        let model = ImageModel::by_id("black-forest-labs/flux-pro").unwrap();
        assert_eq!(model.name, "FLUX.1 [pro]");
        assert!(ImageModel::by_id("unknown/model").is_none());
    }

    #[test]
    fn test_default_model_matches_config_default() {
        let config = crate::config::ImageConfig::default();
        assert_eq!(ImageModel::default_model().id, config.default_model);
    }
}
