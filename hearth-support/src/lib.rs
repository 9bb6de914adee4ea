//! # Hearth Support
//!
//! Shared text helpers for the Hearth IoC container.
//!
//! This crate provides:
//! - Dependency-chain rendering for cycle reports
//! - Type-name shortening for compact messages
//! - "Did you mean?" suggestions for unregistered services

pub mod rendering;
