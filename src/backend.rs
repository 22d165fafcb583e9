//! Backend selection behind cargo features.
//!
//! Exactly one backend feature should be active at a time. `ndarray` is the
//! default; enable one of the others with `--no-default-features`.

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::AutodiffBackend;

pub type Element = f32;

/// File format used for the trained model artifact.
pub type RecorderTy = NamedMpkFileRecorder<FullPrecisionSettings>;

#[cfg(all(
    feature = "ndarray",
    not(any(
        feature = "tch-cpu",
        feature = "tch-gpu",
        feature = "wgpu",
        feature = "cuda"
    ))
))]
pub type MainBackend = burn::backend::NdArray<Element>;
#[cfg(any(feature = "tch-cpu", feature = "tch-gpu"))]
pub type MainBackend = burn::backend::LibTorch<Element>;
#[cfg(feature = "wgpu")]
pub type MainBackend = burn::backend::Wgpu<Element>;
#[cfg(feature = "cuda")]
pub type MainBackend = burn::backend::Cuda<Element>;

pub trait MainDevice: Backend {
    fn main_device() -> Self::Device {
        Default::default()
    }
}

#[cfg(any(
    all(
        feature = "ndarray",
        not(any(
            feature = "tch-cpu",
            feature = "tch-gpu",
            feature = "wgpu",
            feature = "cuda"
        ))
    ),
    feature = "tch-cpu",
    feature = "wgpu",
    feature = "cuda"
))]
impl MainDevice for MainBackend {}
#[cfg(all(feature = "tch-gpu", not(feature = "tch-cpu"), not(target_os = "macos")))]
impl MainDevice for MainBackend {
    fn main_device() -> Self::Device {
        burn::backend::libtorch::LibTorchDevice::Cuda(0)
    }
}
#[cfg(all(feature = "tch-gpu", not(feature = "tch-cpu"), target_os = "macos"))]
impl MainDevice for MainBackend {
    fn main_device() -> Self::Device {
        burn::backend::libtorch::LibTorchDevice::Mps
    }
}

pub type MainAutoBackend = burn::backend::Autodiff<MainBackend>;
impl MainDevice for MainAutoBackend {
    fn main_device() -> Self::Device {
        <<Self as AutodiffBackend>::InnerBackend as MainDevice>::main_device()
    }
}
