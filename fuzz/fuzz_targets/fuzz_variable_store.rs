//! Fuzz target: `VariableStore` write/read sequences
//!
//! Interprets the input as a sequence of store operations against a
//! small-page RAM emulation (forcing frequent page transfers) and checks
//! that every successful bulk write is read back exactly.
//!
//! cargo fuzz run fuzz_variable_store

#![no_main]

use fpstation::error::StoreError;
use fpstation::sim::RamEeprom;
use fpstation::storage::{NB_OF_VAR, ParameterArray, ReadPolicy, VariableStore};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut store = VariableStore::<_, NB_OF_VAR>::new(RamEeprom::with_page_records(NB_OF_VAR + 4), ReadPolicy::Abort);
    let mut model = [0u16; NB_OF_VAR];

    for op in data.chunks(4) {
        let [kind, count, hi, lo] = match *op {
            [a, b, c, d] => [a, b, c, d],
            _ => break,
        };
        let value = u16::from_be_bytes([hi, lo]);
        // Up to 255 + 1 lets some counts run past the slot count.
        let count = usize::from(count) + usize::from(kind & 1);

        match kind % 3 {
            0 | 1 => {
                let values = vec![value; count];
                match store.write_some(&values, count) {
                    Ok(()) => model[..count].fill(value),
                    Err(StoreError::CountExceedsCapacity { .. }) => assert!(count > NB_OF_VAR),
                    Err(e) => panic!("unexpected write error: {e}"),
                }
            }
            _ => {
                let mut params = ParameterArray::zeroed();
                store.read_all(&mut params).expect("read_all");
                assert_eq!(&params[..], &model[..]);
            }
        }
    }
});
