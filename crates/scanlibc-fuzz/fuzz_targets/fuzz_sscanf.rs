#![no_main]
use libfuzzer_sys::fuzz_target;
use scanlibc_core::stdio::StdioStream;
use scanlibc_core::stdio::scanf::{ScanArg, ScanOptions, fscanf_report, sscanf_report};
use scanlibc_membrane::config::SafetyLevel;

// Layout: [mode][fmt_len][fmt bytes..][input bytes..]
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let level = match data[0] % 3 {
        0 => SafetyLevel::Strict,
        1 => SafetyLevel::Hardened,
        _ => SafetyLevel::Off,
    };
    let opts = ScanOptions {
        level,
        ..ScanOptions::strict()
    }
    .with_alloc_budget(4096);
    let split = (2 + data[1] as usize).min(data.len());
    let (fmt, input) = (&data[2..split], &data[split..]);

    let (mut i, mut l, mut u) = (0i32, 0i64, 0u64);
    let (mut f, mut d, mut p) = (0f32, 0f64, 0usize);
    let mut buf = [0u8; 16];
    let mut wbuf = [0u32; 8];
    let mut alloc = None;
    let mut walloc = None;
    let mut args = [
        ScanArg::I32(&mut i),
        ScanArg::I64(&mut l),
        ScanArg::U64(&mut u),
        ScanArg::F32(&mut f),
        ScanArg::F64(&mut d),
        ScanArg::Pointer(&mut p),
        ScanArg::Bytes(&mut buf),
        ScanArg::Wide(&mut wbuf),
        ScanArg::AllocBytes(&mut alloc),
        ScanArg::AllocWide(&mut walloc),
    ];

    let report = sscanf_report(input, fmt, &mut args, &opts);
    assert!(report.result >= -1);
    assert!(report.consumed <= input.len());

    let mut stream = StdioStream::new(input);
    let report = fscanf_report(&mut stream, fmt, &mut args, &opts);
    assert!(report.consumed <= input.len());
    drop(args);

    if let Some(v) = &alloc {
        assert!(!v.contains(&0));
    }
});
