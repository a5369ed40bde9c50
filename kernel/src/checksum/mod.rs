//! Checksum module: artifact hashing and the checksum index codec.
//!
//! `hash` ← `index`. Nothing here touches the filesystem except through
//! a caller-supplied reader.

pub mod hash;
pub mod index;
