//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the fixed-width header layout, the canonical body
//! encoding and the hashes derived from them, so that every implementation
//! produces identical bytes.

use microchain_core::canonical::encode_body;
use microchain_core::microblock::genesis_previous_hash;
use microchain_core::{AccountId, MicroblockHeader, Sha256Hash, VirtualBlockchainType};

/// A golden header vector.
#[derive(Debug, Clone)]
pub struct HeaderVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub chain_type: VirtualBlockchainType,
    pub height: u64,
    pub previous_hash: [u8; 32],
    pub timestamp: u64,
    pub gas: u32,
    pub gas_price: u32,
    pub body_hash: [u8; 32],
    pub fees_payer_account: [u8; 32],
    /// Expected canonical header bytes (hex).
    pub expected_header: &'static str,
    /// Expected microblock hash (hex).
    pub expected_hash: &'static str,
}

/// A golden body vector.
#[derive(Debug, Clone)]
pub struct BodyVector {
    pub name: &'static str,
    /// `(section type, section data)` in body order.
    pub sections: &'static [(u16, &'static [u8])],
    /// Expected canonical body bytes (hex).
    pub expected_body: &'static str,
    /// Expected body hash (hex).
    pub expected_hash: &'static str,
}

/// Section data `{"amount": 1000}`.
const TOKEN_ISSUANCE_1000: &[u8] = &[
    0xa1, 0x66, b'a', b'm', b'o', b'u', b'n', b't', 0x19, 0x03, 0xe8,
];

const EMPTY_BODY_HASH: &str = "10968e270199fde39cb0a3fc188189ca72448e53efb8467ddddbd045b6743e6d";
const TOKEN_ISSUANCE_BODY_HASH: &str =
    "75cf9f833d0cbf2115401ef9697172398c1a499e31adf7258a8319855d0fa883";

/// Get all golden body vectors.
pub fn body_vectors() -> Vec<BodyVector> {
    vec![
        BodyVector {
            name: "empty body",
            sections: &[],
            expected_body: "a10080",
            expected_hash: EMPTY_BODY_HASH,
        },
        BodyVector {
            name: "single token issuance",
            sections: &[(0x0201, TOKEN_ISSUANCE_1000)],
            expected_body: "a10081a200190201014ba166616d6f756e741903e8",
            expected_hash: TOKEN_ISSUANCE_BODY_HASH,
        },
    ]
}

/// Get all golden header vectors.
pub fn header_vectors() -> Vec<HeaderVector> {
    let genesis_previous =
        genesis_previous_hash(VirtualBlockchainType::Account, 0, &[0x5a; 24]).0;

    vec![
        HeaderVector {
            name: "account genesis with empty body",
            chain_type: VirtualBlockchainType::Account,
            height: 1,
            previous_hash: genesis_previous,
            timestamp: 1_736_870_400,
            gas: 0,
            gas_price: 0,
            body_hash: hash_bytes(EMPTY_BODY_HASH),
            fees_payer_account: [0; 32],
            expected_header: concat!(
                "434d5453000101000000000001",
                "01000000000000005a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a",
                "000067868a00",
                "000000",
                "00000000",
                "10968e270199fde39cb0a3fc188189ca72448e53efb8467ddddbd045b6743e6d",
                "0000000000000000000000000000000000000000000000000000000000000000",
            ),
            expected_hash: "cc170665705dcc71114eb3f95de778a4f8dca130d2dfc957f7f272da91e84c30",
        },
        HeaderVector {
            name: "account successor with gas and fees payer",
            chain_type: VirtualBlockchainType::Account,
            height: 2,
            previous_hash: [0x11; 32],
            timestamp: 1_736_870_460,
            gas: 1_000,
            gas_price: 5,
            body_hash: hash_bytes(TOKEN_ISSUANCE_BODY_HASH),
            fees_payer_account: [0x22; 32],
            expected_header: concat!(
                "434d5453000101000000000002",
                "1111111111111111111111111111111111111111111111111111111111111111",
                "000067868a3c",
                "0003e8",
                "00000005",
                "75cf9f833d0cbf2115401ef9697172398c1a499e31adf7258a8319855d0fa883",
                "2222222222222222222222222222222222222222222222222222222222222222",
            ),
            expected_hash: "a93aea5f4b36d8beda906c886d6b56401ec3a5ac65011d0fbbe3c561526302e9",
        },
        HeaderVector {
            name: "protocol header with every field at its maximum",
            chain_type: VirtualBlockchainType::Protocol,
            height: (1 << 48) - 1,
            previous_hash: [0xff; 32],
            timestamp: (1 << 48) - 1,
            gas: (1 << 24) - 1,
            gas_price: u32::MAX,
            body_hash: [0; 32],
            fees_payer_account: [0xee; 32],
            expected_header: concat!(
                "434d5453000100ffffffffffff",
                "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
                "ffffffffffff",
                "ffffff",
                "ffffffff",
                "0000000000000000000000000000000000000000000000000000000000000000",
                "eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
            ),
            expected_hash: "5f6ea3ce3ac05e51cad5e66d81fe46aed5ea6413846968a32b5ce471957b73e6",
        },
    ]
}

/// Build the header described by a vector.
pub fn header_from_vector(vector: &HeaderVector) -> MicroblockHeader {
    let mut header = MicroblockHeader::new(
        vector.chain_type,
        vector.height,
        Sha256Hash::from_bytes(vector.previous_hash),
        vector.timestamp,
    );
    header.gas = vector.gas;
    header.gas_price = vector.gas_price;
    header.body_hash = Sha256Hash::from_bytes(vector.body_hash);
    header.fees_payer_account = AccountId::from_bytes(vector.fees_payer_account);
    header
}

/// Check every vector; returns the names of the failing ones.
pub fn verify_all_vectors() -> Vec<&'static str> {
    let mut failures = Vec::new();

    for vector in header_vectors() {
        let header = header_from_vector(&vector);
        let bytes_ok = header
            .to_bytes()
            .is_ok_and(|bytes| hex::encode(bytes) == vector.expected_header);
        let hash_ok = header
            .hash()
            .is_ok_and(|hash| hash.to_hex() == vector.expected_hash);
        if !(bytes_ok && hash_ok) {
            failures.push(vector.name);
        }
    }

    for vector in body_vectors() {
        let body = encode_body(vector.sections.iter().map(|(t, d)| (*t, *d)));
        let hash = Sha256Hash::hash(&body);
        if hex::encode(&body) != vector.expected_body || hash.to_hex() != vector.expected_hash {
            failures.push(vector.name);
        }
    }

    failures
}

fn hash_bytes(hex_str: &str) -> [u8; 32] {
    Sha256Hash::from_hex(hex_str).map(|h| h.0).unwrap_or_default()
}
