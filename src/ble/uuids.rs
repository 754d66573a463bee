//! BLE Service and Characteristic UUIDs.
//!
//! The link uses one service with one characteristic for both inbound
//! notifications and outbound writes.

use uuid::Uuid;

/// Link data service UUID.
pub const LINK_SERVICE_UUID: Uuid = Uuid::from_u128(0x4faf_c201_1fb5_459e_8fcc_c5c9c331914b);

/// Link data characteristic UUID (Notify, Write Without Response).
pub const LINK_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xbeb5_483e_36e1_4688_b7f5_ea07361b26a8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        assert_eq!(
            LINK_SERVICE_UUID.to_string(),
            "4fafc201-1fb5-459e-8fcc-c5c9c331914b"
        );
        assert_eq!(
            LINK_CHARACTERISTIC_UUID.to_string(),
            "beb5483e-36e1-4688-b7f5-ea07361b26a8"
        );
    }
}
