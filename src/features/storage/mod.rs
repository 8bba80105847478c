//! # Feature: File Storage
//!
//! Crash-tolerant local persistence for the reminder set. Writes are gated by
//! a SHA-256 checksum of the payload, so flushing an unchanged snapshot costs
//! nothing. The id counter lives next to the checksum and is persisted on
//! every allocation.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod file_store;

pub use file_store::{checksum, FileStore, EMPTY_COLLECTION};
