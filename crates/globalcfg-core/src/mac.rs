//! Ethernet hardware addresses.
//!
//! The service monitor address is generated once and then persisted in the
//! intent store, so parsing has to accept whatever an operator (or an earlier
//! run) wrote there, and generation has to produce an address that can never
//! collide with a vendor-assigned one.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a textual hardware address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MacParseError {
    /// The input did not have the expected number of colon-separated octets.
    #[error("expected {expected} octets, found {found}")]
    OctetCount {
        /// Octets required.
        expected: usize,
        /// Octets present.
        found: usize,
    },

    /// An octet was empty, too long, or not hexadecimal.
    #[error("invalid octet '{octet}'")]
    InvalidOctet {
        /// The offending octet text.
        octet: String,
    },
}

/// Parses exactly `N` colon-separated hexadecimal octets of one or two digits.
pub(crate) fn parse_octets<const N: usize>(s: &str) -> Result<[u8; N], MacParseError> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != N {
        return Err(MacParseError::OctetCount {
            expected: N,
            found: parts.len(),
        });
    }

    let mut octets = [0u8; N];
    for (slot, part) in octets.iter_mut().zip(parts) {
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MacParseError::InvalidOctet {
                octet: part.to_string(),
            });
        }
        *slot = u8::from_str_radix(part, 16).map_err(|_| MacParseError::InvalidOctet {
            octet: part.to_string(),
        })?;
    }
    Ok(octets)
}

/// A 48-bit Ethernet address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// Creates an address from raw octets.
    #[must_use]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Returns the raw octets.
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Generates a random unicast, locally administered address.
    #[must_use]
    pub fn random_local() -> Self {
        let mut octets = [0u8; 6];
        rand::thread_rng().fill_bytes(&mut octets);
        Self(octets).into_local_unicast()
    }

    /// Clears the multicast bit and sets the locally administered bit.
    #[must_use]
    pub const fn into_local_unicast(self) -> Self {
        let mut octets = self.0;
        octets[0] &= !0x01;
        octets[0] |= 0x02;
        Self(octets)
    }

    /// Returns `true` if the locally administered bit is set.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    /// Returns `true` if the multicast bit is set.
    #[must_use]
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Returns `true` if every octet is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl FromStr for MacAddr {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_octets::<6>(s).map(Self)
    }
}

impl TryFrom<String> for MacAddr {
    type Error = MacParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.to_string()
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes() {
        let mac: MacAddr = "0A:0:5e:00:53:1".parse().unwrap();
        assert_eq!(mac.octets(), [0x0a, 0x00, 0x5e, 0x00, 0x53, 0x01]);
        assert_eq!(mac.to_string(), "0a:00:5e:00:53:01");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            "aa:bb:cc".parse::<MacAddr>(),
            Err(MacParseError::OctetCount {
                expected: 6,
                found: 3
            })
        );
        assert!(matches!(
            "aa:bb:cc:dd:ee:fff".parse::<MacAddr>(),
            Err(MacParseError::InvalidOctet { .. })
        ));
        assert!(matches!(
            "aa:bb:cc:dd:ee:zz".parse::<MacAddr>(),
            Err(MacParseError::InvalidOctet { .. })
        ));
        assert!(matches!(
            "aa:bb::dd:ee:ff".parse::<MacAddr>(),
            Err(MacParseError::InvalidOctet { .. })
        ));
        assert!(matches!(
            "aa:bb:cc:dd:ee:ff extra".parse::<MacAddr>(),
            Err(MacParseError::InvalidOctet { .. })
        ));
        assert!("not a mac".parse::<MacAddr>().is_err());
    }

    #[test]
    fn random_addresses_are_local_unicast() {
        for _ in 0..64 {
            let mac = MacAddr::random_local();
            assert!(mac.is_local());
            assert!(!mac.is_multicast());
        }
    }

    #[test]
    fn display_round_trips() {
        let mac = MacAddr::new([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(mac.to_string().parse::<MacAddr>().unwrap(), mac);
    }
}
