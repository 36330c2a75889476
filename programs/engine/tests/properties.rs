//! Property tests for pool math and the program codec
//!
//! Increase cases: PROPTEST_CASES=1000 cargo test -p packswap-engine --test properties

use alloy_primitives::{Address, U256};
use packswap_common::{isqrt, read_address, read_uint, EngineError, ProgramWriter, SwapDirection};
use packswap_engine::math::{quote_burn, quote_mint, quote_swap};
use packswap_engine::*;
use proptest::prelude::*;

fn product(a: u128, b: u128) -> U256 {
    U256::from(a) * U256::from(b)
}

proptest! {
    /// isqrt is the floor square root, so first mints are monotone in deposit size
    #[test]
    fn prop_isqrt_is_floor(n in any::<u128>()) {
        let n = U256::from(n);
        let root = isqrt(n);
        prop_assert!(root * root <= n);
        let next = root + U256::from(1u8);
        prop_assert!(next * next > n);
    }

    /// x·y never decreases across a swap, and grows whenever a fee is charged
    #[test]
    fn prop_swap_never_decreases_k(
        r_in in 1_000u128..=u64::MAX as u128,
        r_out in 1_000u128..=u64::MAX as u128,
        amount in 1u128..=u64::MAX as u128,
        fee_bps in 0u16..1_000,
    ) {
        let q = quote_swap(r_in, r_out, amount, fee_bps, 0).unwrap();

        prop_assert!(q.amount_out < r_out);
        prop_assert_eq!(q.new_reserve_out, r_out - q.amount_out);
        let before = product(r_in, r_out);
        let after = product(q.new_reserve_in, q.new_reserve_out);
        prop_assert!(after >= before);

        let effective = amount * (10_000 - fee_bps as u128) / 10_000;
        if fee_bps > 0 && effective < amount {
            prop_assert!(after > before);
        }
    }

    /// Protocol skim never reaches the pricing reserves
    #[test]
    fn prop_protocol_fee_outside_reserves(
        reserve in 1_000_000u128..=u64::MAX as u128,
        amount in 1u128..=u64::MAX as u128,
        ppt in 0u16..1_000,
    ) {
        let q = quote_swap(reserve, reserve, amount, 30, ppt).unwrap();
        prop_assert_eq!(q.protocol_fee, amount * ppt as u128 / 1_000);
        prop_assert_eq!(q.new_reserve_in, reserve + amount - q.protocol_fee);
    }

    /// Minting into an empty pool and burning everything returns no more
    /// than was deposited
    #[test]
    fn prop_mint_burn_never_profits(
        max0 in 1u128..=u64::MAX as u128,
        max1 in 1u128..=u64::MAX as u128,
    ) {
        let minted = match quote_mint(0, 0, 0, max0, max1) {
            Ok(minted) => minted,
            Err(e) => {
                prop_assert_eq!(e, EngineError::InsufficientLiquidityMinted);
                return Ok(());
            }
        };
        let burned = quote_burn(minted.amount0, minted.amount1, minted.shares, minted.shares).unwrap();

        prop_assert!(burned.amount0 <= max0);
        prop_assert!(burned.amount1 <= max1);
    }

    /// A second depositor is never charged above its maxima, and burning its
    /// shares returns no more than it paid
    #[test]
    fn prop_second_deposit_respects_maxima(
        r0 in 1_000u128..=u64::MAX as u128,
        r1 in 1_000u128..=u64::MAX as u128,
        max0 in 1u128..=u64::MAX as u128,
        max1 in 1u128..=u64::MAX as u128,
    ) {
        let key = PoolKey::new(Address::with_last_byte(1), Address::with_last_byte(2)).unwrap();
        let mut pool = Pool::new(key);
        pool.add_liquidity(Address::repeat_byte(1), r0, r1).unwrap();

        let lp = Address::repeat_byte(2);
        if let Ok(minted) = pool.add_liquidity(lp, max0, max1) {
            prop_assert!(minted.amount0 <= max0);
            prop_assert!(minted.amount1 <= max1);

            let burned = pool.remove_liquidity(lp, minted.shares).unwrap();
            prop_assert!(burned.amount0 <= minted.amount0);
            prop_assert!(burned.amount1 <= minted.amount1);
        }
    }

    /// Swapping there and back again never leaves the trader ahead
    #[test]
    fn prop_round_trip_swap_loses(
        reserve in 1_000_000u128..=u64::MAX as u128,
        amount in 1u128..=u32::MAX as u128,
    ) {
        let key = PoolKey::new(Address::with_last_byte(1), Address::with_last_byte(2)).unwrap();
        let mut pool = Pool::new(key);
        pool.add_liquidity(Address::repeat_byte(1), reserve, reserve).unwrap();
        let fees = FeeSettings::default();

        let out = pool.swap(SwapDirection::ZeroForOne, amount, &fees).unwrap().amount_out;
        if out > 0 {
            let back = pool.swap(SwapDirection::OneForZero, out, &fees).unwrap().amount_out;
            prop_assert!(back <= amount);
        }
    }

    /// Every width 1..=32 decodes what was encoded
    #[test]
    fn prop_uint_field_roundtrip(
        width in 1usize..=32,
        limbs in any::<[u64; 4]>(),
    ) {
        let value = U256::from_limbs(limbs);
        let value = if width == 32 { value } else { value % (U256::from(1u8) << (width * 8)) };

        let mut writer = ProgramWriter::new();
        writer.write_uint(value, width).unwrap();
        prop_assert_eq!(writer.len(), width);
        prop_assert_eq!(read_uint(writer.as_bytes(), 0, width).unwrap(), value);
    }

    #[test]
    fn prop_address_field_roundtrip(bytes in any::<[u8; 20]>(), pad in 0usize..8) {
        let address = Address::from(bytes);
        let mut writer = ProgramWriter::new();
        for _ in 0..pad {
            writer.write_u8(0xff);
        }
        writer.write_address(address);
        prop_assert_eq!(read_address(writer.as_bytes(), pad).unwrap(), address);
    }

    /// Decoding arbitrary bytes never panics
    #[test]
    fn prop_decode_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = Program::decode(&bytes);
    }

    /// Whole programs survive encode and decode
    #[test]
    fn prop_program_roundtrip(
        capacity in 1u16..,
        amounts in proptest::collection::vec(any::<u128>(), 1..8),
        zero_for_one in any::<bool>(),
    ) {
        let operations = amounts
            .iter()
            .map(|&amount| Operation::Swap {
                token0: Address::with_last_byte(1),
                token1: Address::with_last_byte(2),
                zero_for_one,
                amount: SwapAmount::Exact(amount),
            })
            .collect();
        let program = Program { ledger_capacity: capacity, operations };
        prop_assert_eq!(Program::decode(&program.encode()).unwrap(), program);
    }
}
