//! Error number definitions.
//!
//! Implements `<errno.h>` support with thread-local errno storage. Only the
//! values the scanning engine and its collaborators report are defined.

use std::cell::Cell;

thread_local! {
    static ERRNO: Cell<i32> = const { Cell::new(0) };
}

/// Well-known errno constants (Linux values).
pub const EIO: i32 = 5;
pub const EBADF: i32 = 9;
pub const ENOMEM: i32 = 12;
pub const EINVAL: i32 = 22;
pub const ERANGE: i32 = 34;
pub const EILSEQ: i32 = 84;

/// Returns the current thread-local errno value.
///
/// Equivalent to reading C `errno`.
pub fn get_errno() -> i32 {
    ERRNO.get()
}

/// Sets the current thread-local errno value.
///
/// Equivalent to assigning to C `errno`.
pub fn set_errno(value: i32) {
    ERRNO.set(value);
}

/// Symbolic name of an errno value, for logs and fixtures.
#[must_use]
pub fn errno_name(value: i32) -> &'static str {
    match value {
        0 => "0",
        EIO => "EIO",
        EBADF => "EBADF",
        ENOMEM => "ENOMEM",
        EINVAL => "EINVAL",
        ERANGE => "ERANGE",
        EILSEQ => "EILSEQ",
        _ => "EUNKNOWN",
    }
}

/// Inverse of [`errno_name`].
#[must_use]
pub fn errno_from_name(name: &str) -> Option<i32> {
    Some(match name {
        "0" => 0,
        "EIO" => EIO,
        "EBADF" => EBADF,
        "ENOMEM" => ENOMEM,
        "EINVAL" => EINVAL,
        "ERANGE" => ERANGE,
        "EILSEQ" => EILSEQ,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_match_host_libc() {
        assert_eq!(EIO, libc::EIO);
        assert_eq!(EBADF, libc::EBADF);
        assert_eq!(ENOMEM, libc::ENOMEM);
        assert_eq!(EINVAL, libc::EINVAL);
        assert_eq!(ERANGE, libc::ERANGE);
        assert_eq!(EILSEQ, libc::EILSEQ);
    }

    #[test]
    fn errno_is_thread_local() {
        set_errno(ERANGE);
        let other = std::thread::spawn(get_errno).join().unwrap();
        assert_eq!(other, 0);
        assert_eq!(get_errno(), ERANGE);
        set_errno(0);
    }

    #[test]
    fn names_round_trip() {
        for v in [0, EIO, EBADF, ENOMEM, EINVAL, ERANGE, EILSEQ] {
            assert_eq!(errno_from_name(errno_name(v)), Some(v));
        }
        assert_eq!(errno_name(9999), "EUNKNOWN");
        assert_eq!(errno_from_name("EUNKNOWN"), None);
    }
}
