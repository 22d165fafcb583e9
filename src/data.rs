//! Batching and pixel normalization for the MNIST dataset.
//!
//! Dataset download and caching are delegated to
//! [`burn::data::dataset::vision::MnistDataset`]; this module only turns items
//! into normalized image tensors. The same normalization is applied to
//! uploaded images at inference time, see [`crate::infer`].

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::vision::MnistItem;
use burn::prelude::*;
use burn::tensor::ElementConversion;

pub const WIDTH: usize = 28;
pub const HEIGHT: usize = 28;

/// Normalization constants from the PyTorch MNIST example.
/// https://github.com/pytorch/examples/blob/54f4572509891883a947411fd7239237dd2a39c3/mnist/main.py#L122
pub const MEAN: f32 = 0.1307;
pub const STD_DEV: f32 = 0.3081;

/// Scales raw brightness values (`0.0..=255.0`) to `[0, 1]`, then applies the
/// fixed mean/std-dev normalization.
///
/// Training and inference must go through this same function, otherwise the
/// trained weights see differently scaled inputs and predictions are
/// meaningless.
pub fn normalize<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Tensor<B, D> {
    ((tensor / 255) - MEAN) / STD_DEV
}

#[derive(Clone, Default)]
pub struct MnistBatcher {}

#[derive(Clone, Debug)]
pub struct MnistBatch<B: Backend> {
    /// # Shape
    /// [batch_size, 1, HEIGHT, WIDTH]
    pub images: Tensor<B, 4>,
    /// # Shape
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, MnistItem, MnistBatch<B>> for MnistBatcher {
    fn batch(&self, items: Vec<MnistItem>, device: &B::Device) -> MnistBatch<B> {
        let images = items
            .iter()
            .map(|item| TensorData::from(item.image).convert::<B::FloatElem>())
            .map(|data| Tensor::<B, 2>::from_data(data, device))
            .map(|tensor| tensor.reshape([1, 1, HEIGHT, WIDTH]))
            .map(normalize)
            .collect();

        let targets = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data([(item.label as i64).elem::<B::IntElem>()], device)
            })
            .collect();

        let images = Tensor::cat(images, 0);
        let targets = Tensor::cat(targets, 0);

        MnistBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray<f32>;

    fn item(label: u8, brightness: f32) -> MnistItem {
        MnistItem {
            image: [[brightness; WIDTH]; HEIGHT],
            label,
        }
    }

    #[test]
    fn batch_has_expected_shapes() {
        let device = Default::default();
        let batch: MnistBatch<TestBackend> =
            MnistBatcher::default().batch(vec![item(3, 0.0), item(7, 255.0)], &device);

        assert_eq!([2, 1, HEIGHT, WIDTH], batch.images.dims());
        assert_eq!([2], batch.targets.dims());
        assert_eq!(
            vec![3i64, 7],
            batch.targets.into_data().to_vec::<i64>().unwrap()
        );
    }

    #[test]
    fn pixels_are_normalized() {
        let device = Default::default();
        let batch: MnistBatch<TestBackend> =
            MnistBatcher::default().batch(vec![item(0, 255.0)], &device);

        let values = batch.images.into_data().to_vec::<f32>().unwrap();
        let expected = (1.0 - MEAN) / STD_DEV;
        assert!(values.iter().all(|v| (v - expected).abs() < 1e-5));
    }
}
