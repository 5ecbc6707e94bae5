//! # scanlibc-core
//!
//! Safe Rust implementation of the C formatted-input family (`sscanf`,
//! `fscanf`, `swscanf`, `fwscanf`) together with the pieces of libc it leans
//! on: errno, numeric locale conventions, string-to-number conversion,
//! multibyte conversion and a buffered input stream.
//!
//! No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod ctype;
pub mod errno;
pub mod locale;
pub mod stdio;
pub mod stdlib;
pub mod wchar;
