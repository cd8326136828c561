// DSP module - band-limiting filter and per-frame feature extraction

pub mod features;
pub mod filter;

pub use features::{FeatureExtractor, FeatureVector, ANALYSIS_WINDOW, HOP_SIZE};
pub use filter::BandFilter;
