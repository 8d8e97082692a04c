//! Fuzz target: persisted device record decoding
//!
//! Hosts hand back whatever bytes their save files hold. Decoding must
//! reject garbage with an error and never panic, and any record that
//! does decode must already satisfy the signal power clamp, both as
//! decoded and after rebuilding the live device from it.
//!
//! cargo fuzz run fuzz_record_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use switchlink::signal::{SignalState, MAX_POWER};
use switchlink::switch::device::{Device, DeviceId, DeviceRecord};

fuzz_target!(|data: &[u8]| {
    if let Ok(record) = postcard::from_bytes::<DeviceRecord>(data) {
        assert!(
            record.signal.power() <= MAX_POWER,
            "decoded record escapes the power clamp"
        );

        // Rehydration re-derives sensor capability bits from the tuning;
        // it must hold the clamp and round-trip back to the same record.
        let device = Device::from_record(DeviceId(1), record.clone());
        assert!(device.signal.power() <= MAX_POWER);
        assert_eq!(device.to_record().signal.power(), record.signal.power());
    }

    // A bare state blob decodes on its own inside older records.
    if let Ok(state) = postcard::from_bytes::<SignalState>(data) {
        assert!(state.power() <= MAX_POWER);
    }
});
