//! The classifier topology: a conv/batch-norm/relu/pool stack followed by two
//! dense layers, emitting class log-probabilities.

use crate::data::{HEIGHT, WIDTH};
use crate::labels;
use burn::{
    nn::{
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig,
        PaddingConfig2d, Relu,
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    prelude::*,
    tensor::activation::log_softmax,
    train::ClassificationOutput,
};

#[derive(Config, Debug)]
pub struct MathCnnConfig {
    /// Must match [`labels::NUM_CLASSES`] for the serving label mapping to be
    /// meaningful.
    #[config(default = "labels::NUM_CLASSES")]
    pub num_classes: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
}

/// Fixed architecture; weight compatibility with an existing artifact requires
/// reproducing it exactly.
///
/// Dropout and batch-norm statistics follow the backend: on an autodiff
/// backend the model behaves as in training mode, on the inner backend it is
/// deterministic (evaluation mode).
#[derive(Module, Debug)]
pub struct MathCnn<B: Backend> {
    conv1: Conv2d<B>,
    bn1: BatchNorm<B>,
    conv2: Conv2d<B>,
    bn2: BatchNorm<B>,
    conv3: Conv2d<B>,
    bn3: BatchNorm<B>,
    pool: MaxPool2d,
    fc1: Linear<B>,
    fc2: Linear<B>,
    dropout: Dropout,
    activation: Relu,
}

impl MathCnnConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> MathCnn<B> {
        let conv = |channels| {
            Conv2dConfig::new(channels, [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1, 1, 1))
                .init(device)
        };

        MathCnn {
            conv1: conv([1, 32]),
            bn1: BatchNormConfig::new(32).init(device),
            conv2: conv([32, 64]),
            bn2: BatchNormConfig::new(64).init(device),
            conv3: conv([64, 128]),
            bn3: BatchNormConfig::new(128).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1: LinearConfig::new(128 * (HEIGHT / 4) * (WIDTH / 4), 256).init(device),
            fc2: LinearConfig::new(256, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> MathCnn<B> {
    /// Output dimension of the final dense layer.
    pub fn num_classes(&self) -> usize {
        let [_d_hidden, num_classes] = self.fc2.weight.dims();
        num_classes
    }

    /// Forward pass producing log-probabilities (rows sum to 1 after
    /// exponentiation).
    ///
    /// # Shapes
    ///   - Input [batch_size, 1, HEIGHT, WIDTH]
    ///   - Output [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, channels, height, width] = images.dims();
        assert_eq!(
            [channels, height, width],
            [1, HEIGHT, WIDTH],
            "expected a [batch, 1, {HEIGHT}, {WIDTH}] input, got {:?}",
            images.dims()
        );

        // Block 1: spatial size unchanged.
        let x = self.activation.forward(self.bn1.forward(self.conv1.forward(images)));
        // Block 2: pool 28x28 -> 14x14.
        let x = self.activation.forward(self.bn2.forward(self.conv2.forward(x)));
        let x = self.pool.forward(x);
        // Block 3: pool 14x14 -> 7x7.
        let x = self.activation.forward(self.bn3.forward(self.conv3.forward(x)));
        let x = self.pool.forward(x);
        debug_assert_eq!([batch_size, 128, HEIGHT / 4, WIDTH / 4], x.dims());

        let x = x.reshape([batch_size, 128 * (HEIGHT / 4) * (WIDTH / 4)]);
        let x = self.fc1.forward(x);
        let x = self.activation.forward(self.dropout.forward(x));
        let x = self.fc2.forward(x);
        debug_assert_eq!([batch_size, self.num_classes()], x.dims());

        log_softmax(x, 1)
    }

    /// Forward pass plus negative-log-likelihood loss against integer targets.
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let [batch_size] = targets.dims();
        let log_probs = self.forward(images);
        debug_assert_eq!(batch_size, log_probs.dims()[0]);

        let loss = log_probs
            .clone()
            .gather(1, targets.clone().unsqueeze_dim(1))
            .mean()
            .neg();

        ClassificationOutput::new(loss, log_probs, targets)
    }
}
