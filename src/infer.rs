//! Request-independent inference: decode an uploaded image, preprocess it the
//! way training did, run one forward pass and map the winning class index to
//! its label.

use crate::data::{self, HEIGHT, WIDTH};
use crate::labels;
use crate::model::MathCnn;
use burn::prelude::*;
use burn::tensor::ElementConversion;
use image::imageops::FilterType;
use std::panic::AssertUnwindSafe;

/// Everything that can go wrong while answering a single prediction request.
///
/// The display strings double as the HTTP response bodies, see
/// [`crate::server`].
#[derive(Debug, thiserror::Error)]
pub enum RecognizeError {
    #[error("No image provided")]
    MissingImage,
    #[error("No selected file")]
    EmptyImage,
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Inference(String),
}

/// Service context built once at startup: a loaded topology plus its device.
///
/// The parameter set is never mutated after construction, so a `Recognizer`
/// can be shared freely between request handlers.
pub struct Recognizer<B: Backend> {
    model: MathCnn<B>,
    device: B::Device,
}

impl<B: Backend> Recognizer<B> {
    pub fn new(model: MathCnn<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Decodes raw upload bytes and returns the predicted label.
    pub fn recognize(&self, bytes: &[u8]) -> Result<&'static str, RecognizeError> {
        if bytes.is_empty() {
            return Err(RecognizeError::EmptyImage);
        }
        let input = self.preprocess(bytes)?;
        let index = self.predict(input)?;
        Ok(labels::latex_label(index))
    }

    /// Grayscale, resize to 28x28, scale to [0, 1] and normalize; the exact
    /// pipeline the training batcher applies.
    fn preprocess(&self, bytes: &[u8]) -> Result<Tensor<B, 4>, RecognizeError> {
        let image = image::load_from_memory(bytes)
            .map_err(|err| RecognizeError::Decode(err.to_string()))?;
        let image = image
            .grayscale()
            .resize_exact(WIDTH as u32, HEIGHT as u32, FilterType::Triangle)
            .into_luma8();

        let pixels: Vec<f32> = image.into_raw().into_iter().map(f32::from).collect();
        let tensor = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [1, 1, HEIGHT, WIDTH]).convert::<B::FloatElem>(),
            &self.device,
        );
        Ok(data::normalize(tensor))
    }

    /// One forward pass, highest log-probability wins (ties break toward the
    /// lowest index). Backend panics are converted into the inference error
    /// kind so nothing escapes the request boundary.
    fn predict(&self, input: Tensor<B, 4>) -> Result<usize, RecognizeError> {
        let index = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let output = self.model.forward(input);
            output
                .argmax(1)
                .flatten::<1>(0, 1)
                .into_scalar()
                .elem::<i64>()
        }))
        .map_err(|payload| RecognizeError::Inference(panic_message(payload)))?;

        Ok(index as usize)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "inference failed".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::MathCnnConfig;
    use std::io::Cursor;

    type TestBackend = burn::backend::NdArray<f32>;

    fn recognizer() -> Recognizer<TestBackend> {
        let device = Default::default();
        Recognizer::new(MathCnnConfig::new().init(&device), device)
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::GrayImage::from_fn(width, height, |x, y| {
            image::Luma([((x + y) % 256) as u8])
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert!(matches!(
            recognizer().recognize(&[]),
            Err(RecognizeError::EmptyImage)
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = recognizer().recognize(b"definitely not an image");
        match result {
            Err(RecognizeError::Decode(message)) => assert!(!message.is_empty()),
            other => panic!("expected a decode error, got {other:?}"),
        }
    }

    #[test]
    fn valid_image_yields_a_known_label() {
        // Untrained weights still produce some in-range class index.
        let label = recognizer().recognize(&png_bytes(28, 28)).unwrap();
        assert_ne!(label, labels::UNKNOWN_LABEL);
    }

    #[test]
    fn oversized_images_are_resized() {
        let label = recognizer().recognize(&png_bytes(200, 120)).unwrap();
        assert_ne!(label, labels::UNKNOWN_LABEL);
    }
}
