// Adapters layer: concrete implementations for external systems.

pub mod http;
pub mod mast;
pub mod storage;
