pub mod error;
pub mod field_model;
pub mod fingerprint;
pub mod identity;
pub mod locator;
pub mod visibility;
