use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use medsum_core::ModelError;

/// The subset of a HuggingFace `config.json` the runtime needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub id2label: HashMap<String, String>,
    pub decoder_start_token_id: Option<i64>,
    pub eos_token_id: Option<i64>,
    pub forced_bos_token_id: Option<i64>,
    pub no_repeat_ngram_size: Option<usize>,
}

impl ModelConfig {
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        serde_json::from_str(json).map_err(|e| ModelError::Load(format!("config.json: {}", e)))
    }

    /// Labels ordered by class index.
    ///
    /// Fails if `id2label` is empty or has gaps.
    pub fn labels(&self) -> Result<Vec<String>, ModelError> {
        if self.id2label.is_empty() {
            return Err(ModelError::Load("config.json has no id2label".into()));
        }
        (0..self.id2label.len())
            .map(|i| {
                self.id2label
                    .get(&i.to_string())
                    .cloned()
                    .ok_or_else(|| ModelError::Load(format!("id2label is missing index {}", i)))
            })
            .collect()
    }
}

/// Fail early with a readable message when a model file is absent.
pub(crate) fn require_file(path: &Path) -> Result<(), ModelError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ModelError::Load(format!("not found: {}", path.display())))
    }
}
