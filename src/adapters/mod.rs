// Adapters layer: concrete implementations for external systems (storage, http services).

pub mod google;
pub mod hub;
pub mod local;
pub mod storage;
