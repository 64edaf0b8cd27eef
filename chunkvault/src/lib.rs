//! Anvil region codec, chunk selection, slot layout, and the in-memory
//! custom-backup registry for chunk-granular Minecraft world backups.
//!
//! This crate knows nothing about hosting servers, command surfaces, or
//! worker scheduling — that orchestration lives in `chunkvault-engine`,
//! built on top of the types here.

pub mod custom;
pub mod info;
pub mod region;
pub mod selector;
