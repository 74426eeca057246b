pub mod bva_api;
pub mod chroma;

pub use bva_api::BvaApiSource;
pub use chroma::ChromaStore;
