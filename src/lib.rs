// Principal component analysis (PCA)

#![doc = include_str!("../README.md")]

mod error;
mod pca;

pub use error::{PcaError, Result};
pub use pca::PCA;
