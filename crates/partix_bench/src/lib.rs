//! Benchmark support for Partix.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
