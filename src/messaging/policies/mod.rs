//! Готовые политики интереса.

pub mod chunk;

pub use chunk::ChunkPolicy;
