//! Regtest Kernel: the pure core of the rendering regression tester.
//!
//! # API Surface
//!
//! - [`checksum::hash::hash_reader`] -- streaming content hash of an artifact
//! - [`checksum::index::ChecksumIndex`] -- parse/serialize the `md5` index
//! - [`classify::classify`] -- map reference state + run outcome to a [`model::verdict::Verdict`]
//!
//! # Module Dependency Direction
//!
//! `model` ← `classify`; `checksum` stands alone.
//!
//! One-way only. No threads, no processes, no filesystem writes: those
//! belong to the harness.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod checksum;
pub mod classify;
pub mod model;
