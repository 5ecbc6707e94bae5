//! Fixture case execution.
//!
//! Turns a case's target specs into owned storage, runs the requested
//! entry point over it, and renders the outcome as a single comparable
//! string: the return value followed by each target, separated by `|`.
//!
//! Target specs:
//! `i8 i16 i32 i64 isize u8 u16 u32 u64 usize f32 f64 ptr`,
//! `bytes:N`, `wide:N`, `alloc`, `alloc_wide`.

use std::time::Instant;

use scanlibc_core::errno::{get_errno, set_errno};
use scanlibc_core::locale::set_numeric_locale;
use scanlibc_core::stdio::StdioStream;
use scanlibc_core::stdio::scanf::{
    ScanArg, ScanOptions, ScanReport, fscanf_report, fwscanf_report, sscanf_report,
    swscanf_report,
};
use scanlibc_membrane::config::SafetyLevel;

use crate::error::HarnessError;
use crate::fixtures::CaseInputs;

/// Owned storage behind one [`ScanArg`].
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    Pointer(usize),
    Bytes(Vec<u8>),
    Wide(Vec<u32>),
    AllocBytes(Option<Vec<u8>>),
    AllocWide(Option<Vec<u32>>),
}

impl Slot {
    /// Build zeroed storage from a target spec.
    pub fn from_spec(spec: &str) -> Result<Self, HarnessError> {
        let bad = || HarnessError::BadTarget(spec.to_string());
        if let Some((kind, len)) = spec.split_once(':') {
            let len: usize = len.trim().parse().map_err(|_| bad())?;
            return match kind.trim() {
                "bytes" => Ok(Self::Bytes(vec![0; len])),
                "wide" => Ok(Self::Wide(vec![0; len])),
                _ => Err(bad()),
            };
        }
        Ok(match spec.trim() {
            "i8" => Self::I8(0),
            "i16" => Self::I16(0),
            "i32" | "int" => Self::I32(0),
            "i64" | "long" => Self::I64(0),
            "isize" => Self::Isize(0),
            "u8" => Self::U8(0),
            "u16" => Self::U16(0),
            "u32" => Self::U32(0),
            "u64" => Self::U64(0),
            "usize" => Self::Usize(0),
            "f32" => Self::F32(0.0),
            "f64" | "double" => Self::F64(0.0),
            "ptr" => Self::Pointer(0),
            "alloc" => Self::AllocBytes(None),
            "alloc_wide" => Self::AllocWide(None),
            _ => return Err(bad()),
        })
    }

    fn as_arg(&mut self) -> ScanArg<'_> {
        match self {
            Self::I8(v) => ScanArg::I8(v),
            Self::I16(v) => ScanArg::I16(v),
            Self::I32(v) => ScanArg::I32(v),
            Self::I64(v) => ScanArg::I64(v),
            Self::Isize(v) => ScanArg::Isize(v),
            Self::U8(v) => ScanArg::U8(v),
            Self::U16(v) => ScanArg::U16(v),
            Self::U32(v) => ScanArg::U32(v),
            Self::U64(v) => ScanArg::U64(v),
            Self::Usize(v) => ScanArg::Usize(v),
            Self::F32(v) => ScanArg::F32(v),
            Self::F64(v) => ScanArg::F64(v),
            Self::Pointer(v) => ScanArg::Pointer(v),
            Self::Bytes(v) => ScanArg::Bytes(v.as_mut_slice()),
            Self::Wide(v) => ScanArg::Wide(v.as_mut_slice()),
            Self::AllocBytes(v) => ScanArg::AllocBytes(v),
            Self::AllocWide(v) => ScanArg::AllocWide(v),
        }
    }

    /// Render the stored value.
    ///
    /// Fixed buffers render up to their first NUL (or in full when
    /// unterminated) as a quoted string; empty allocation slots render
    /// as `null`.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::I8(v) => v.to_string(),
            Self::I16(v) => v.to_string(),
            Self::I32(v) => v.to_string(),
            Self::I64(v) => v.to_string(),
            Self::Isize(v) => v.to_string(),
            Self::U8(v) => v.to_string(),
            Self::U16(v) => v.to_string(),
            Self::U32(v) => v.to_string(),
            Self::U64(v) => v.to_string(),
            Self::Usize(v) => v.to_string(),
            Self::F32(v) => v.to_string(),
            Self::F64(v) => v.to_string(),
            Self::Pointer(v) => format!("{v:#x}"),
            Self::Bytes(v) => quote_bytes(until_nul(v)),
            Self::Wide(v) => quote_wide(until_nul(v)),
            Self::AllocBytes(None) | Self::AllocWide(None) => "null".to_string(),
            Self::AllocBytes(Some(v)) => quote_bytes(v),
            Self::AllocWide(Some(v)) => quote_wide(v),
        }
    }
}

fn until_nul<T: Copy + Default + PartialEq>(buf: &[T]) -> &[T] {
    let end = buf.iter().position(|&u| u == T::default()).unwrap_or(buf.len());
    &buf[..end]
}

fn quote_bytes(bytes: &[u8]) -> String {
    format!("{:?}", String::from_utf8_lossy(bytes))
}

fn quote_wide(units: &[u32]) -> String {
    let text: String = units
        .iter()
        .map(|&u| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    format!("{text:?}")
}

/// Outcome of one executed case.
#[derive(Debug, Clone)]
pub struct CaseRun {
    /// Rendered result, comparable with `expected_output`.
    pub output: String,
    pub errno: i32,
    /// Stable failure name, if the scan stopped early.
    pub failure: Option<&'static str>,
    pub consumed: usize,
    pub latency_ns: u64,
}

/// Scan options for a runner mode name.
pub fn options_for_mode(mode: &str) -> Result<ScanOptions, HarnessError> {
    let level = match mode.to_ascii_lowercase().as_str() {
        "strict" => SafetyLevel::Strict,
        "hardened" => SafetyLevel::Hardened,
        "off" => SafetyLevel::Off,
        _ => return Err(HarnessError::UnknownMode(mode.to_string())),
    };
    Ok(ScanOptions {
        level,
        ..ScanOptions::strict()
    })
}

fn wide(text: &str) -> Vec<u32> {
    text.chars().map(u32::from).collect()
}

/// Execute `function` over `inputs` under `mode`.
pub fn execute_case(function: &str, inputs: &CaseInputs, mode: &str) -> Result<CaseRun, HarnessError> {
    let mut opts = options_for_mode(mode)?;
    opts.alloc_budget = inputs.alloc_budget;

    let mut slots = inputs
        .targets
        .iter()
        .map(|spec| Slot::from_spec(spec))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(name) = &inputs.locale
        && !set_numeric_locale(name.as_bytes())
    {
        return Err(HarnessError::UnknownLocale(name.clone()));
    }

    let bytes = inputs
        .input_bytes
        .clone()
        .unwrap_or_else(|| inputs.input.as_bytes().to_vec());

    set_errno(0);
    let started = Instant::now();
    let result = {
        let mut args: Vec<ScanArg<'_>> = slots.iter_mut().map(Slot::as_arg).collect();
        run_entry(function, &bytes, inputs, &mut args, &opts)
    };
    let latency_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
    let errno = get_errno();

    if inputs.locale.is_some() {
        set_numeric_locale(b"C");
    }
    let report = result?;

    let mut parts = vec![report.result.to_string()];
    parts.extend(slots.iter().map(Slot::render));
    Ok(CaseRun {
        output: parts.join("|"),
        errno,
        failure: report.failure.as_ref().map(|f| f.kind_name()),
        consumed: report.consumed,
        latency_ns,
    })
}

fn run_entry(
    function: &str,
    bytes: &[u8],
    inputs: &CaseInputs,
    args: &mut [ScanArg<'_>],
    opts: &ScanOptions,
) -> Result<ScanReport, HarnessError> {
    Ok(match function {
        "sscanf" => sscanf_report(bytes, inputs.format.as_bytes(), args, opts),
        "swscanf" => {
            if inputs.input_bytes.is_some() {
                return Err(HarnessError::MissingInput("input"));
            }
            swscanf_report(&wide(&inputs.input), &wide(&inputs.format), args, opts)
        }
        "fscanf" => {
            let mut stream = StdioStream::new(bytes);
            fscanf_report(&mut stream, inputs.format.as_bytes(), args, opts)
        }
        "fwscanf" => {
            let mut stream = StdioStream::new(bytes);
            fwscanf_report(&mut stream, &wide(&inputs.format), args, opts)
        }
        other => return Err(HarnessError::UnknownFunction(other.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(input: &str, format: &str, targets: &[&str]) -> CaseInputs {
        CaseInputs {
            input: input.to_string(),
            format: format.to_string(),
            targets: targets.iter().map(|s| (*s).to_string()).collect(),
            ..CaseInputs::default()
        }
    }

    #[test]
    fn slot_specs() {
        assert_eq!(Slot::from_spec("i32").unwrap(), Slot::I32(0));
        assert_eq!(Slot::from_spec("bytes:3").unwrap(), Slot::Bytes(vec![0; 3]));
        assert_eq!(Slot::from_spec("alloc_wide").unwrap(), Slot::AllocWide(None));
        assert!(matches!(Slot::from_spec("bytes:x"), Err(HarnessError::BadTarget(_))));
        assert!(matches!(Slot::from_spec("i128"), Err(HarnessError::BadTarget(_))));
    }

    #[test]
    fn renders_buffers_and_slots() {
        assert_eq!(Slot::Bytes(b"ab\0z".to_vec()).render(), "\"ab\"");
        assert_eq!(Slot::Wide(vec![0x3C0, 0x3B1]).render(), "\"πα\"");
        assert_eq!(Slot::AllocBytes(None).render(), "null");
        assert_eq!(Slot::Pointer(0xff).render(), "0xff");
        assert_eq!(Slot::F64(2.5).render(), "2.5");
    }

    #[test]
    fn executes_narrow_case() {
        let run = execute_case("sscanf", &inputs("12 word", "%d %s", &["i32", "bytes:8"]), "strict").unwrap();
        assert_eq!(run.output, "2|12|\"word\"");
        assert_eq!(run.errno, 0);
        assert_eq!(run.failure, None);
        assert_eq!(run.consumed, 7);
    }

    #[test]
    fn executes_wide_stream_case() {
        let run = execute_case("fwscanf", &inputs("λ=7", "λ=%d", &["i32"]), "hardened").unwrap();
        assert_eq!(run.output, "1|7");
    }

    #[test]
    fn rejects_unknown_function_and_mode() {
        let case = inputs("1", "%d", &["i32"]);
        assert!(matches!(execute_case("scanf", &case, "strict"), Err(HarnessError::UnknownFunction(_))));
        assert!(matches!(execute_case("sscanf", &case, "lenient"), Err(HarnessError::UnknownMode(_))));
    }
}
