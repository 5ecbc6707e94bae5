//! Standard I/O operations.
//!
//! Implements the input side of `<stdio.h>` and `<wchar.h>`: buffered
//! streams and the formatted-input family.

pub mod buffer;
pub mod file;
pub mod scanf;

pub use file::{LockedStream, Orientation, StdioStream};
pub use scanf::{
    EOF, ScanArg, ScanError, ScanOptions, ScanReport, fscanf, fscanf_locked, fwscanf, sscanf,
    swscanf,
};
