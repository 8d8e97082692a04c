//! Fuzz target: stored link address decoding and mode gating
//!
//! Decodes arbitrary bytes as a link address and, where that succeeds,
//! pushes the decoded mode through the full gating table. Checks:
//! - No panics on any input
//! - `is_valid` is total over decoded addresses
//! - No mode/edge combination ever hands a pulse target a deactivation
//!
//! cargo fuzz run fuzz_link_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use switchlink::link::{LinkAddress, RequestKind, SwitchAction};

fuzz_target!(|data: &[u8]| {
    let Ok(addr) = postcard::from_bytes::<LinkAddress>(data) else {
        return;
    };

    // Validity never panics, whatever the block string holds.
    let _ = addr.is_valid();

    for kind in [RequestKind::Activate, RequestKind::Deactivate] {
        for target_active in [false, true] {
            let open = addr.mode.gate(kind, target_active, false);
            let pulsed = addr.mode.gate(kind, target_active, true);

            // A pulse's on-timer is the only thing allowed to end it.
            assert_ne!(
                pulsed,
                Some(SwitchAction::Deactivate),
                "pulse target handed a deactivation by {:?}",
                addr.mode
            );

            // The pulse rule may suppress a delivery, never rewrite it.
            assert!(pulsed == open || pulsed.is_none());
        }
    }
});
