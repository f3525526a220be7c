//! Bluetooth device addresses.

use core::fmt;
use core::str::FromStr;

use crate::error::BluetoothError;

/// 48-bit device address, most significant byte first as printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress(pub [u8; 6]);

impl FromStr for PeerAddress {
    type Err = BluetoothError;

    /// Parse `AA:BB:CC:DD:EE:FF` (either case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BluetoothError::InvalidAddress(s.to_owned());
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in &mut bytes {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Addresses from `bluetoothctl devices` output.
///
/// Each device line reads `Device <address> <name>`; anything else (prompts,
/// blank lines, malformed addresses) is skipped.
pub fn parse_device_list(output: &str) -> Vec<PeerAddress> {
    output
        .lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            if words.next()? != "Device" {
                return None;
            }
            words.next()?.parse().ok()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bt_address_parse_and_display() {
        let addr: PeerAddress = "aa:BB:0c:dd:EE:01".parse().unwrap();
        assert_eq!(addr.0, [0xAA, 0xBB, 0x0C, 0xDD, 0xEE, 0x01]);
        assert_eq!(addr.to_string(), "AA:BB:0C:DD:EE:01");
    }

    #[test]
    fn test_bt_address_rejects_malformed() {
        for bad in ["", "AA:BB:CC:DD:EE", "AA:BB:CC:DD:EE:FF:00", "AAB:B:CC:DD:EE:FF", "GG:BB:CC:DD:EE:FF"] {
            assert!(bad.parse::<PeerAddress>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_bt_device_list_parsing() {
        let out = "Device 11:22:33:44:55:66 Pixel 8\n\
                   Device AA:BB:CC:DD:EE:FF My Laptop\n\
                   [bluetooth]# \n\
                   Device nonsense name\n";
        let peers = parse_device_list(out);
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[1].to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_bt_device_list_empty() {
        assert!(parse_device_list("").is_empty());
    }
}
