//! General utilities.
//!
//! Implements the `<stdlib.h>` string-to-number conversions.

pub mod conversion;

pub use conversion::{
    ConversionStatus, strtod, strtod_impl, strtof_impl, strtol, strtol_impl, strtoul,
    strtoul_impl,
};
