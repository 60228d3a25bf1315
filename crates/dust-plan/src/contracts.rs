//! Calldata encoding for the DustClaim contract and plain ERC-20 actions.
//!
//! The DustClaim contract swaps dust into native ETH on behalf of the
//! caller; its internals are opaque here, only the external ABI matters.

use alloy_primitives::{aliases::U24, Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

sol! {
	function claimDustToETH(address token, uint256 minReturnAmount, bytes swapData);
	function claimDustBatchToETH(address[] tokens, uint256[] minReturnAmounts, bytes[] swapDatas);
	function claimDustViaUniswap(address token, uint24 fee, uint256 minReturnAmount, uint256 deadline);
	function approve(address spender, uint256 amount) returns (bool);
	function transfer(address to, uint256 amount) returns (bool);
}

/// Encodes a single-token DustClaim conversion.
pub fn encode_claim_dust_to_eth(token: Address, min_return: U256, swap_data: Bytes) -> Bytes {
	claimDustToETHCall {
		token,
		minReturnAmount: min_return,
		swapData: swap_data,
	}
	.abi_encode()
	.into()
}

/// Encodes a batched DustClaim conversion covering several tokens.
pub fn encode_claim_dust_batch(
	tokens: Vec<Address>,
	min_returns: Vec<U256>,
	swap_datas: Vec<Bytes>,
) -> Bytes {
	claimDustBatchToETHCall {
		tokens,
		minReturnAmounts: min_returns,
		swapDatas: swap_datas,
	}
	.abi_encode()
	.into()
}

/// Encodes a DustClaim conversion routed through a Uniswap V3 pool.
pub fn encode_claim_dust_via_uniswap(
	token: Address,
	fee: U24,
	min_return: U256,
	deadline: U256,
) -> Bytes {
	claimDustViaUniswapCall {
		token,
		fee,
		minReturnAmount: min_return,
		deadline,
	}
	.abi_encode()
	.into()
}

/// Encodes `ERC20.approve(spender, amount)`.
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
	approveCall { spender, amount }.abi_encode().into()
}

/// Encodes `ERC20.transfer(to, amount)`.
pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
	transferCall { to, amount }.abi_encode().into()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_approve_selector_and_layout() {
		let spender = Address::repeat_byte(0x11);
		let data = encode_approve(spender, U256::from(1000u64));
		// Standard ERC-20 approve selector.
		assert_eq!(&data[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
		assert_eq!(data.len(), 4 + 32 + 32);
	}

	#[test]
	fn test_transfer_selector() {
		let data = encode_transfer(Address::repeat_byte(0x22), U256::from(5u64));
		assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
	}

	#[test]
	fn test_single_claim_selector_and_layout() {
		let data =
			encode_claim_dust_to_eth(Address::repeat_byte(0x03), U256::from(7u64), Bytes::new());
		// keccak("claimDustToETH(address,uint256,bytes)")[..4]
		assert_eq!(&data[..4], &[0x87, 0xf5, 0x72, 0xab]);
		// token word, minReturn word, bytes offset word, empty bytes length word.
		assert_eq!(data.len(), 4 + 4 * 32);
	}

	#[test]
	fn test_uniswap_claim_encodes_fee_word() {
		let data = encode_claim_dust_via_uniswap(
			Address::repeat_byte(0x04),
			U24::from(3000u32),
			U256::from(1u64),
			U256::from(1_700_000_000u64),
		);
		// keccak("claimDustViaUniswap(address,uint24,uint256,uint256)")[..4]
		assert_eq!(&data[..4], &[0x22, 0xe4, 0x3d, 0xad]);
		assert_eq!(data.len(), 4 + 4 * 32);
		// uint24 fee sits left-padded in the second argument word.
		assert_eq!(&data[4 + 61..4 + 64], &[0x00, 0x0b, 0xb8]);
	}

	#[test]
	fn test_batch_claim_encodes_all_arrays() {
		let data = encode_claim_dust_batch(
			vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)],
			vec![U256::ZERO, U256::ZERO],
			vec![Bytes::new(), Bytes::new()],
		);
		// keccak("claimDustBatchToETH(address[],uint256[],bytes[])")[..4]
		assert_eq!(&data[..4], &[0x70, 0xa0, 0x06, 0x9d]);
		// Selector plus three dynamic array offsets at minimum.
		assert!(data.len() > 4 + 3 * 32);
	}
}
