//! Character-level sequence models on tiny CPU tensors.
//! Few dependencies. Deterministic by default.
//!
//! # Features
//!
//! - **Vocabulary**: Bijective character indexing, ordered by code point so
//! the same corpus always produces the same indices.
//!
//! - **Encoding**: Padding, one-hot encoding and next-character framing,
//! with batch-major and time-major layouts.
//!
//! - **Zero-copy views**: Tensors may be indexed, reshaped and transposed
//! without copying their storage.
//!
//! - **Greedy sampling**: Autoregressive generation against any
//! [SequenceModel], always picking the most likely next character.
//!
//! - **Checkpoints**: Models serialize to compact binary files and are
//! validated when loaded back.
//!
//! # Examples
//!
//! Fitting a bigram model and continuing a seed:
//! ```
//! use charnn::{ Corpus, BigramModel, GreedySampler };
//!
//! let corpus = Corpus::new(&["abab", "baba"]).unwrap();
//! let batch = corpus.encode_batch(&[0, 1]).unwrap();
//!
//! let mut model = BigramModel::new(corpus.vocabulary().len(), 0.0);
//! model.fit(&batch.inputs, &batch.targets).unwrap();
//!
//! let sampler = GreedySampler::new(&model, corpus.vocabulary()).unwrap();
//! assert_eq!(sampler.sample("a", 5).unwrap(), "ababa");
//! ```
//!
//! ## More examples
//! Check the `/demos` folder for more example code.
//!
//!
//! # Optional features
//!
//! Some features can be toggled in your `Cargo.toml`.
//!
//! - `unsafe` *(default)*: Accelerated matrix math using the `matrixmultiply` crate.
//! - `rayon`: Multi-threaded matrix products through `Device::Threaded`.

mod internal;
mod shape;
mod tensor;

pub mod scalar;
pub mod error;
pub mod context;
pub mod vocab;
pub mod corpus;
pub mod encode;
pub mod layer;
pub mod model;
pub mod sampler;

pub use shape::Shape;
pub use tensor::Tensor;
pub use error::{ Error, Result };
pub use context::{ Context, Device };
pub use vocab::Vocabulary;
pub use corpus::{ Corpus, Loader };
pub use encode::Batch;
pub use layer::{ Layer, Dense, Recurrent };
pub use model::{ SequenceModel, Forward, Checkpoint, CharRnn, RnnConfig, BigramModel };
pub use sampler::GreedySampler;
