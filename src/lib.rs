//! Trains and serves a convolutional recognizer for hand-drawn math characters.
//!
//! The crate is split in three thin pieces: the network topology ([`model`]),
//! a training loop over MNIST ([`training`]) and an HTTP endpoint that loads a
//! trained artifact and answers single-image predictions ([`server`]).
//! Training and serving only interact through the artifact directory
//! ([`artifacts`]).

pub mod artifacts;
pub mod backend;
pub mod data;
pub mod infer;
pub mod labels;
pub mod model;
pub mod server;
pub mod training;

pub mod prelude {
    pub use crate::backend::{MainAutoBackend, MainBackend, MainDevice};
    pub use crate::infer::{RecognizeError, Recognizer};
    pub use crate::labels::{NUM_CLASSES, latex_label};
    pub use crate::model::{MathCnn, MathCnnConfig};
}
