//! Fuzz target: `DeviceError::check`
//!
//! Every 32-bit status must decode without panicking and re-encode to the
//! same value.
//!
//! cargo fuzz run fuzz_status_codes

#![no_main]

use fpstation::error::{DeviceError, status_of};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|code: i32| {
    let decoded = DeviceError::check(code);
    assert_eq!(status_of(decoded), code);
    if let Err(e) = decoded {
        assert!(!e.message().is_empty());
        assert!(!e.to_string().is_empty());
    }
});
