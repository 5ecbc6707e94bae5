#![no_main]
use libfuzzer_sys::fuzz_target;
use scanlibc_core::stdio::scanf::{ScanArg, ScanOptions, swscanf_report};

// Layout: [fmt_len][units as little-endian u32..], format first.
fuzz_target!(|data: &[u8]| {
    let Some((&fmt_len, rest)) = data.split_first() else {
        return;
    };
    let units: Vec<u32> = rest
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let split = (fmt_len as usize).min(units.len());
    let (fmt, input) = units.split_at(split);

    let opts = ScanOptions::hardened().with_alloc_budget(4096);
    let (mut i, mut d) = (0i32, 0f64);
    let mut buf = [0u8; 16];
    let mut wbuf = [0u32; 8];
    let mut walloc = None;
    let mut args = [
        ScanArg::I32(&mut i),
        ScanArg::F64(&mut d),
        ScanArg::Bytes(&mut buf),
        ScanArg::Wide(&mut wbuf),
        ScanArg::AllocWide(&mut walloc),
    ];

    let report = swscanf_report(input, fmt, &mut args, &opts);
    assert!(report.result >= -1);
    assert!(report.consumed <= input.len());
});
