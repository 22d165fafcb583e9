//! Persistence of the trained model and its configurations.
//!
//! The artifact directory is the only contract between training and serving:
//! training writes the model weights plus the model config used to build
//! them, serving reads both back. Weights produced by a differently shaped
//! config will fail to load.

use crate::backend::RecorderTy;
use crate::model::{MathCnn, MathCnnConfig};
use burn::prelude::*;
use burn::record::FileRecorder;
use std::path::Path;

pub const MODEL_NAME: &str = "model";
pub const MODEL_CONFIG_NAME: &str = "model_config.json";
pub const TRAINING_CONFIG_NAME: &str = "training_config.json";

pub fn create_artifact_dir(artifact_dir: &Path) {
    std::fs::create_dir_all(artifact_dir).ok();
}

pub fn save_model_config(artifact_dir: &Path, model_config: &MathCnnConfig) {
    let path = artifact_dir.join(MODEL_CONFIG_NAME);
    model_config
        .save(&path)
        .expect("Failed to save the model config");
}

/// Loads the model config written by a previous training run, if any.
pub fn load_model_config(artifact_dir: &Path) -> Option<MathCnnConfig> {
    let path = artifact_dir.join(MODEL_CONFIG_NAME);
    path.exists()
        .then(|| MathCnnConfig::load(&path).expect("Failed to load the model config"))
}

pub fn save_model<B: Backend>(artifact_dir: &Path, model: &MathCnn<B>) {
    let path = artifact_dir.join(MODEL_NAME);
    model
        .clone()
        .save_file(&path, &RecorderTy::new()) // ext added automatically
        .expect("Failed to save the model");
}

/// Loads trained weights into a freshly constructed topology.
///
/// Returns `None` when no artifact exists at `artifact_dir`; panics when an
/// artifact exists but cannot be read into the given config's topology.
pub fn load_model<B: Backend>(
    artifact_dir: &Path,
    model_config: &MathCnnConfig,
    device: &B::Device,
) -> Option<MathCnn<B>> {
    let path = artifact_dir.join(MODEL_NAME);
    let file_ext = <RecorderTy as FileRecorder<B>>::file_extension();
    if !path.with_extension(file_ext).exists() {
        return None;
    }
    let model = model_config
        .init(device)
        .load_file(&path, &RecorderTy::new(), device) // ext added automatically
        .expect("Failed to load the model weights");
    Some(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{HEIGHT, WIDTH};
    use temp_dir::TempDir;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn save_load_round_trip_reproduces_outputs() {
        let device = Default::default();
        let dir = TempDir::new().unwrap();
        let config = MathCnnConfig::new();

        let model: MathCnn<TestBackend> = config.init(&device);
        let input: Tensor<TestBackend, 4> = Tensor::ones([1, 1, HEIGHT, WIDTH], &device);
        let expected = model.forward(input.clone()).into_data().to_vec::<f32>().unwrap();

        save_model_config(dir.path(), &config);
        save_model(dir.path(), &model);

        let reloaded_config = load_model_config(dir.path()).unwrap();
        let reloaded: MathCnn<TestBackend> =
            load_model(dir.path(), &reloaded_config, &device).unwrap();
        let actual = reloaded.forward(input).into_data().to_vec::<f32>().unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn missing_artifact_is_none() {
        let device: <TestBackend as burn::tensor::backend::BackendTypes>::Device = Default::default();
        let dir = TempDir::new().unwrap();

        assert!(load_model_config(dir.path()).is_none());
        assert!(load_model::<TestBackend>(dir.path(), &MathCnnConfig::new(), &device).is_none());
    }
}
