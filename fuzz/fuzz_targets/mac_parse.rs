//! Fuzz harness for `MacAddr` parsing and the MAC prefix derivation.
//!
//! Both consume operator-written option values, so arbitrary text must never
//! panic. Anything that parses must print back to a canonical form that parses
//! to the same address.

#![no_main]
use globalcfg_core::{Derivations, MacAddr, StandardDerivations};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    if let Ok(mac) = text.parse::<MacAddr>() {
        let canonical = mac.to_string();
        assert_eq!(canonical.len(), 17);
        assert_eq!(canonical.parse::<MacAddr>(), Ok(mac));
    }

    let mut derivations = StandardDerivations::default();
    let prefix = derivations.mac_prefix(Some(text.as_ref()));
    assert_eq!(prefix.len(), 8);
    assert_eq!(derivations.mac_prefix(Some(prefix.as_str())), prefix);
});
