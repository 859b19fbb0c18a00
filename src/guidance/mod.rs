pub mod cache;
pub mod client;
pub mod error;
pub mod guidance_model;
pub mod session;
