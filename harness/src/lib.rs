//! Regtest harness: everything with side effects around the kernel.
//!
//! The harness renders documents with an external program, compares the
//! output against checksum references, and aggregates verdicts:
//!
//! ```text
//! corpus → pool → [ProcessRunner → Comparator → classify] × N → ResultAggregate
//! ```
//!
//! Decisions (index codec, verdict table) live in `regtest-kernel`; this
//! crate owns the filesystem, processes, threads, and configuration.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod corpus;
pub mod diff;
pub mod error;
pub mod pool;
pub mod process;
pub mod progress;
pub mod references;
pub mod runner;
pub mod store;
pub mod telemetry;
