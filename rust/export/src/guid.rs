// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC GlobalId generation
//!
//! A GlobalId is a 128-bit UUID written as 22 characters of the IFC base64
//! alphabet, most significant bits first. The first character carries only
//! two bits.

use uuid::Uuid;

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Compress a UUID into its 22-character IFC form
pub fn compress(uuid: &Uuid) -> String {
    let value = uuid.as_u128();
    let mut out = String::with_capacity(22);
    out.push(ALPHABET[(value >> 126) as usize & 0x3] as char);
    for i in (0..21).rev() {
        out.push(ALPHABET[(value >> (i * 6)) as usize & 0x3f] as char);
    }
    out
}

/// Inverse of [`compress`]
pub fn expand(global_id: &str) -> Option<Uuid> {
    if global_id.len() != 22 {
        return None;
    }
    let mut value: u128 = 0;
    for (i, byte) in global_id.bytes().enumerate() {
        let digit = ALPHABET.iter().position(|&c| c == byte)? as u128;
        if i == 0 && digit > 3 {
            return None;
        }
        value = (value << 6) | digit;
    }
    Some(Uuid::from_u128(value))
}

/// Source of GlobalIds for one export
#[derive(Debug, Clone)]
pub enum GuidGenerator {
    /// UUIDv5 over a namespace derived from a seed and a running counter;
    /// the same seed yields the same sequence
    Deterministic { namespace: Uuid, counter: u64 },
    /// UUIDv4
    Random,
}

impl GuidGenerator {
    pub fn deterministic(seed: &str) -> Self {
        GuidGenerator::Deterministic {
            namespace: Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()),
            counter: 0,
        }
    }

    pub fn random() -> Self {
        GuidGenerator::Random
    }

    /// Next GlobalId
    pub fn next_id(&mut self) -> String {
        let uuid = match self {
            GuidGenerator::Deterministic { namespace, counter } => {
                *counter += 1;
                Uuid::new_v5(namespace, &counter.to_be_bytes())
            }
            GuidGenerator::Random => Uuid::new_v4(),
        };
        compress(&uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomark_core::is_valid_global_id;

    #[test]
    fn test_known_values() {
        assert_eq!(compress(&Uuid::nil()), "0000000000000000000000");
        assert_eq!(compress(&Uuid::from_u128(u128::MAX)), "3$$$$$$$$$$$$$$$$$$$$$");
    }

    #[test]
    fn test_expand_inverts_compress() {
        let uuid = Uuid::new_v4();
        assert_eq!(expand(&compress(&uuid)), Some(uuid));
        assert_eq!(expand("4$$$$$$$$$$$$$$$$$$$$$"), None);
        assert_eq!(expand("short"), None);
    }

    #[test]
    fn test_deterministic_sequence() {
        let mut a = GuidGenerator::deterministic("Project");
        let mut b = GuidGenerator::deterministic("Project");
        let mut c = GuidGenerator::deterministic("Other");
        let first = a.next_id();
        assert_eq!(first, b.next_id());
        assert_ne!(first, c.next_id());
        assert_ne!(first, a.next_id());
        assert!(is_valid_global_id(&first));
    }

    #[test]
    fn test_random_ids_are_valid() {
        let mut g = GuidGenerator::random();
        for _ in 0..32 {
            assert!(is_valid_global_id(&g.next_id()));
        }
    }
}
