//! Human-readable amount formatting and contract-code detection
//! (section 4.7 `readableAmount`, `checkIsContract`).

use alloy::primitives::{Bytes, U256};

/// Floor `amount` (in smallest unit, with `decimals` precision) to 3
/// decimal places and suffix it with `symbol`. E.g. 1.2349 token at 18
/// decimals formats as `"1.234 TOKEN"`.
pub fn readable_amount(amount: U256, decimals: u8, symbol: &str) -> String {
    let scale = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / scale;
    let remainder = amount % scale;

    // Floor to 3 decimal digits: scale the remainder up to 3 digits of
    // precision, then integer-divide back down.
    let milli_scale = U256::from(1000u64);
    let milli = if decimals >= 3 {
        remainder / (scale / milli_scale)
    } else {
        remainder * (milli_scale / scale)
    };

    format!("{whole}.{:03} {symbol}", milli.to::<u64>())
}

/// True iff `getCode` returned a non-trivial bytecode blob: matches
/// `^0x[0-9a-f]{2,}$` once hex-encoded, i.e. more than the empty-code `0x`.
pub fn is_contract(code: &Bytes) -> bool {
    !code.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_to_three_decimals() {
        // 1.2349 * 10^18, floored to 3 decimals -> "1.234 TOKEN"
        let amount = U256::from(1_234_900_000_000_000_000u128);
        assert_eq!(readable_amount(amount, 18, "TOKEN"), "1.234 TOKEN");
    }

    #[test]
    fn whole_number_has_zero_fraction() {
        let amount = U256::from(5_000_000_000_000_000_000u128);
        assert_eq!(readable_amount(amount, 18, "ETH"), "5.000 ETH");
    }

    #[test]
    fn empty_code_is_not_a_contract() {
        assert!(!is_contract(&Bytes::new()));
    }

    #[test]
    fn nonempty_code_is_a_contract() {
        assert!(is_contract(&Bytes::from(vec![0xab, 0xcd])));
    }
}
