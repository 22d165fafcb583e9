//! Training procedure: repeated epochs over MNIST, Adam updates, per-epoch
//! evaluation on the test split, final artifact persistence.
//!
//! Any data-loading or artifact failure is fatal and aborts the run; there is
//! no checkpointing, early stopping or learning-rate schedule.

use crate::{
    artifacts,
    data::{MnistBatch, MnistBatcher},
    model::{MathCnn, MathCnnConfig},
};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::vision::MnistDataset,
    },
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{ElementConversion, backend::AutodiffBackend},
    train::ClassificationOutput,
};
use std::path::Path;
use std::sync::Arc;

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub model: MathCnnConfig,
    pub optimizer: AdamConfig,
    #[config(default = 50)]
    pub num_epochs: usize,
    #[config(default = 64)]
    pub batch_size: usize,
    /// Evaluation runs forward-only, so it affords much larger batches.
    #[config(default = 1000)]
    pub eval_batch_size: usize,
    #[config(default = 2)]
    pub num_workers: usize,
    #[config(default = 1e-3)]
    pub lr: f64,
    #[config(default = 42)]
    pub seed: u64,
}

type Dataloader<B> = Arc<dyn DataLoader<B, MnistBatch<B>> + 'static>;

/// Runs the full training procedure and persists the final weights into
/// `artifact_dir`.
pub fn train<AutoB: AutodiffBackend>(
    artifact_dir: &Path,
    config: TrainingConfig,
    device: AutoB::Device,
) {
    artifacts::create_artifact_dir(artifact_dir);
    config
        .save(artifact_dir.join(artifacts::TRAINING_CONFIG_NAME))
        .expect("Failed to save the training config");
    artifacts::save_model_config(artifact_dir, &config.model);

    AutoB::seed(&device, config.seed);

    let mut model: MathCnn<AutoB> = config.model.init(&device);
    let mut optim = config.optimizer.init();

    let batcher = MnistBatcher::default();
    let dataloader_train: Dataloader<AutoB> = DataLoaderBuilder::new(batcher.clone())
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(MnistDataset::train());
    let dataloader_test: Dataloader<AutoB::InnerBackend> = DataLoaderBuilder::new(batcher)
        .batch_size(config.eval_batch_size)
        .num_workers(config.num_workers)
        .build(MnistDataset::test());

    let num_train_items = dataloader_train.num_items();

    println!("Starting training...");
    for epoch in 1..=config.num_epochs {
        let mut running_loss = 0.0f64;
        let mut correct = 0i64;
        let mut seen = 0usize;

        for (iteration, batch) in dataloader_train.iter().enumerate() {
            let [batch_size, _channels, _height, _width] = batch.images.dims();

            let output = model.forward_classification(batch.images, batch.targets);
            let loss = output.loss.clone();
            let loss_value = loss.clone().into_scalar().elem::<f64>();

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(config.lr, model, grads);

            running_loss += loss_value * batch_size as f64;
            correct += count_correct(&output);
            seen += batch_size;

            if iteration % 100 == 0 {
                println!("Epoch {epoch} [{seen}/{num_train_items}] Loss: {loss_value:.6}");
            }
        }

        let train_loss = running_loss / seen as f64;
        let train_accuracy = 100.0 * correct as f64 / seen as f64;

        let (test_loss, test_accuracy) =
            evaluate::<AutoB::InnerBackend>(&model.valid(), &dataloader_test);

        println!(
            "Epoch {epoch}: Train Loss: {train_loss:.4}, Train Accuracy: {train_accuracy:.2}%, \
             Test Loss: {test_loss:.4}, Test Accuracy: {test_accuracy:.2}%"
        );
    }

    artifacts::save_model(artifact_dir, &model);
    println!("Model trained and saved to {artifact_dir:?}");
}

/// Forward-only pass over the evaluation split. Runs on the inner backend:
/// no gradients, dropout inert, batch-norm in inference mode.
///
/// Returns (average loss, accuracy in percent).
fn evaluate<B: Backend>(model: &MathCnn<B>, dataloader: &Dataloader<B>) -> (f64, f64) {
    let mut total_loss = 0.0f64;
    let mut correct = 0i64;
    let mut seen = 0usize;

    for batch in dataloader.iter() {
        let [batch_size, _channels, _height, _width] = batch.images.dims();

        let output = model.forward_classification(batch.images, batch.targets);
        total_loss += output.loss.clone().into_scalar().elem::<f64>() * batch_size as f64;
        correct += count_correct(&output);
        seen += batch_size;
    }

    (
        total_loss / seen as f64,
        100.0 * correct as f64 / seen as f64,
    )
}

fn count_correct<B: Backend>(output: &ClassificationOutput<B>) -> i64 {
    let predictions = output.output.clone().argmax(1).flatten::<1>(0, 1);
    predictions
        .equal(output.targets.clone())
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{HEIGHT, WIDTH};
    use crate::labels::NUM_CLASSES;

    type TestBackend = burn::backend::NdArray<f32>;

    #[test]
    fn count_correct_matches_argmax() {
        let device = Default::default();

        // Two items: log-probs peak at index 2 and index 0.
        let mut rows = [[-10.0f32; NUM_CLASSES]; 2];
        rows[0][2] = -0.01;
        rows[1][0] = -0.01;
        let output_tensor: Tensor<TestBackend, 2> = Tensor::from_data(rows, &device);
        let targets: Tensor<TestBackend, 1, Int> = Tensor::from_data([2i64, 5], &device);
        let loss = output_tensor.clone().mean();

        let output = ClassificationOutput::new(loss, output_tensor, targets);
        assert_eq!(count_correct(&output), 1);
    }

    #[test]
    fn evaluate_aggregates_over_batches() {
        let device = Default::default();
        let model: MathCnn<TestBackend> = MathCnnConfig::new().init(&device);

        let items: Vec<_> = (0..4)
            .map(|label| burn::data::dataset::vision::MnistItem {
                image: [[0.0; WIDTH]; HEIGHT],
                label,
            })
            .collect();
        let dataset = burn::data::dataset::InMemDataset::new(items);
        let dataloader: Dataloader<TestBackend> = DataLoaderBuilder::new(MnistBatcher::default())
            .batch_size(2)
            .build(dataset);

        let (loss, accuracy) = evaluate(&model, &dataloader);
        assert!(loss.is_finite());
        assert!((0.0..=100.0).contains(&accuracy));
    }
}
