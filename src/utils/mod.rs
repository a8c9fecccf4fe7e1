// Shared helpers for the operations gateway

pub mod serde_helpers;
