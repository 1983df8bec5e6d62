//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate store mutations and persistence into use-case APIs.
//! - Keep CLI/UI layers decoupled from storage details.

pub mod collection_service;
