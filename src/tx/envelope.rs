//! Signed transaction encoding (legacy EIP-155 and EIP-1559).

use alloy_rlp::{Encodable, Header};

use crate::crypto::{keccak256, Account, Address, KeyError, Signature};

/// EIP-2718 type byte for dynamic-fee transactions.
const EIP1559_TX_TYPE: u8 = 0x02;

/// A fully specified transaction ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedTx {
    Legacy {
        chain_id: u64,
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
        to: Address,
        value: u128,
        data: Vec<u8>,
    },
    Eip1559 {
        chain_id: u64,
        nonce: u64,
        max_priority_fee_per_gas: u128,
        max_fee_per_gas: u128,
        gas_limit: u64,
        to: Address,
        value: u128,
        data: Vec<u8>,
    },
}

impl UnsignedTx {
    /// Bytes whose keccak hash is signed.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = Vec::new();
        match self {
            UnsignedTx::Legacy { chain_id, .. } => {
                self.encode_common(&mut fields);
                chain_id.encode(&mut fields);
                0u8.encode(&mut fields);
                0u8.encode(&mut fields);
                wrap_list(&fields)
            }
            UnsignedTx::Eip1559 { .. } => {
                self.encode_common(&mut fields);
                typed(wrap_list(&fields))
            }
        }
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Raw transaction bytes for `eth_sendRawTransaction`.
    pub fn encode_signed(&self, signature: &Signature) -> Vec<u8> {
        let mut fields = Vec::new();
        self.encode_common(&mut fields);
        match self {
            UnsignedTx::Legacy { chain_id, .. } => {
                // exceeds u64 for chain ids above u64::MAX / 2
                let v = u128::from(*chain_id) * 2 + 35 + u128::from(signature.y_parity);
                v.encode(&mut fields);
                encode_signature_scalars(signature, &mut fields);
                wrap_list(&fields)
            }
            UnsignedTx::Eip1559 { .. } => {
                signature.y_parity.encode(&mut fields);
                encode_signature_scalars(signature, &mut fields);
                typed(wrap_list(&fields))
            }
        }
    }

    pub fn sign(&self, account: &Account) -> Result<Vec<u8>, KeyError> {
        let signature = account.sign_digest(self.signing_hash())?;
        Ok(self.encode_signed(&signature))
    }

    /// Fields shared by the signing payload and the signed form.
    fn encode_common(&self, out: &mut Vec<u8>) {
        match self {
            UnsignedTx::Legacy {
                nonce,
                gas_price,
                gas_limit,
                to,
                value,
                data,
                ..
            } => {
                nonce.encode(out);
                gas_price.encode(out);
                gas_limit.encode(out);
                to.as_bytes().as_slice().encode(out);
                value.encode(out);
                data.as_slice().encode(out);
            }
            UnsignedTx::Eip1559 {
                chain_id,
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit,
                to,
                value,
                data,
            } => {
                chain_id.encode(out);
                nonce.encode(out);
                max_priority_fee_per_gas.encode(out);
                max_fee_per_gas.encode(out);
                gas_limit.encode(out);
                to.as_bytes().as_slice().encode(out);
                value.encode(out);
                data.as_slice().encode(out);
                // empty access list
                Header {
                    list: true,
                    payload_length: 0,
                }
                .encode(out);
            }
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            UnsignedTx::Legacy { gas_limit, .. } | UnsignedTx::Eip1559 { gas_limit, .. } => {
                *gas_limit
            }
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            UnsignedTx::Legacy { nonce, .. } | UnsignedTx::Eip1559 { nonce, .. } => *nonce,
        }
    }
}

/// `r` and `s` as RLP integers (leading zero bytes stripped).
fn encode_signature_scalars(signature: &Signature, out: &mut Vec<u8>) {
    strip_leading_zeros(&signature.r).encode(out);
    strip_leading_zeros(&signature.s).encode(out);
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn wrap_list(payload: &[u8]) -> Vec<u8> {
    let header = Header {
        list: true,
        payload_length: payload.len(),
    };
    let mut out = Vec::with_capacity(payload.len() + 9);
    header.encode(&mut out);
    out.extend_from_slice(payload);
    out
}

fn typed(rlp: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(rlp.len() + 1);
    out.push(EIP1559_TX_TYPE);
    out.extend_from_slice(&rlp);
    out
}

#[cfg(test)]
mod tests {
    use alloy_rlp::Decodable;

    use super::*;
    use crate::crypto::PrivateKey;

    // Example transaction from EIP-155.
    fn eip155_example() -> (UnsignedTx, Account) {
        let tx = UnsignedTx::Legacy {
            chain_id: 1,
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: "0x3535353535353535353535353535353535353535".parse().unwrap(),
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
        };
        let key = PrivateKey::parse(&"46".repeat(32)).unwrap();
        (tx, Account::from_private_key(key).unwrap())
    }

    #[test]
    fn test_eip155_signing_payload() {
        let (tx, _) = eip155_example();
        assert_eq!(
            hex::encode(tx.signing_payload()),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed() {
        let (tx, account) = eip155_example();
        assert_eq!(
            hex::encode(tx.sign(&account).unwrap()),
            "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_eip1559_layout() {
        let (_, account) = eip155_example();
        let tx = UnsignedTx::Eip1559 {
            chain_id: 1,
            nonce: 0,
            max_priority_fee_per_gas: 1_000_000_000,
            max_fee_per_gas: 30_000_000_000,
            gas_limit: 21_000,
            to: *account.address(),
            value: 0,
            data: b"data:,".to_vec(),
        };

        let payload = tx.signing_payload();
        assert_eq!(payload[0], EIP1559_TX_TYPE);
        // chain id 1, nonce 0 directly after the list header
        assert_eq!(&payload[2..4], &[0x01, 0x80]);
        // empty access list closes the unsigned field list
        assert_eq!(*payload.last().unwrap(), 0xc0);

        let raw = tx.sign(&account).unwrap();
        assert_eq!(raw[0], EIP1559_TX_TYPE);
        assert!(raw.len() > payload.len() + 64);
    }

    #[test]
    fn test_legacy_v_for_huge_chain_id() {
        let (tx, _) = eip155_example();
        let tx = match tx {
            UnsignedTx::Legacy { nonce, gas_price, gas_limit, to, value, data, .. } => UnsignedTx::Legacy {
                chain_id: u64::MAX,
                nonce,
                gas_price,
                gas_limit,
                to,
                value,
                data,
            },
            other => other,
        };
        let signature = Signature {
            r: [1u8; 32],
            s: [2u8; 32],
            y_parity: 1,
        };

        let raw = tx.encode_signed(&signature);
        let mut buf = raw.as_slice();
        let header = Header::decode(&mut buf).unwrap();
        assert!(header.list);
        let _nonce = u64::decode(&mut buf).unwrap();
        let _gas_price = u128::decode(&mut buf).unwrap();
        let _gas_limit = u64::decode(&mut buf).unwrap();
        let _to = alloy_rlp::Bytes::decode(&mut buf).unwrap();
        let _value = u128::decode(&mut buf).unwrap();
        let _data = alloy_rlp::Bytes::decode(&mut buf).unwrap();
        let v = u128::decode(&mut buf).unwrap();
        assert_eq!(v, u128::from(u64::MAX) * 2 + 36);
    }

    #[test]
    fn test_strip_leading_zeros() {
        assert_eq!(strip_leading_zeros(&[0, 0, 1, 0]), &[1, 0]);
        assert!(strip_leading_zeros(&[0, 0]).is_empty());
    }
}
