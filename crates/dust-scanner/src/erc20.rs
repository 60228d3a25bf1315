//! Raw ERC-20 read helpers.
//!
//! Balance, allowance, decimals, and EIP-2612 nonce reads are issued as
//! plain `eth_call`s with hand-built calldata and decoded from the raw
//! 32-byte words, avoiding a contract-instance layer for four selectors.

use alloy_primitives::{Address, U256};

/// balanceOf(address) selector is 0x70a08231
const BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
/// allowance(address,address) selector is 0xdd62ed3e
const ALLOWANCE: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];
/// decimals() selector is 0x313ce567
const DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
/// nonces(address) selector is 0x7ecebe00 (EIP-2612 probe)
const NONCES: [u8; 4] = [0x7e, 0xce, 0xbe, 0x00];

fn with_address_arg(selector: [u8; 4], address: Address) -> Vec<u8> {
	let mut call_data = Vec::with_capacity(36);
	call_data.extend_from_slice(&selector);
	call_data.extend_from_slice(&[0; 12]); // Pad to 32 bytes
	call_data.extend_from_slice(address.as_slice());
	call_data
}

/// Calldata for `balanceOf(owner)`.
pub fn balance_of_calldata(owner: Address) -> Vec<u8> {
	with_address_arg(BALANCE_OF, owner)
}

/// Calldata for `allowance(owner, spender)`.
pub fn allowance_calldata(owner: Address, spender: Address) -> Vec<u8> {
	let mut call_data = with_address_arg(ALLOWANCE, owner);
	call_data.extend_from_slice(&[0; 12]);
	call_data.extend_from_slice(spender.as_slice());
	call_data
}

/// Calldata for `decimals()`.
pub fn decimals_calldata() -> Vec<u8> {
	DECIMALS.to_vec()
}

/// Calldata for the EIP-2612 `nonces(owner)` probe.
pub fn nonces_calldata(owner: Address) -> Vec<u8> {
	with_address_arg(NONCES, owner)
}

/// Decodes a single uint256 return word.
pub fn decode_uint(return_data: &[u8]) -> Option<U256> {
	if return_data.len() < 32 {
		return None;
	}
	Some(U256::from_be_slice(&return_data[..32]))
}

/// Decodes a uint8 return word (decimals). Words wider than a u8 come
/// from misbehaving contracts and are treated as undecodable.
pub fn decode_u8(return_data: &[u8]) -> Option<u8> {
	let value = decode_uint(return_data)?;
	if value > U256::from(u8::MAX) {
		return None;
	}
	Some(value.to::<u8>())
}
