pub mod catalog;
pub mod composer;
pub mod configuration;
pub mod contracts;
pub mod error_modular;
pub mod lifetime;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod runtime;
