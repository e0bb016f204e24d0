//! Withdrawal fee policy (spec.md §6).

/// `FEE_REGULAR` groth, charged when the receiver is a `regular`/`regular_new`
/// address.
pub const FEE_REGULAR: i64 = 100_000;

/// `FEE_OFFLINE` groth, charged for every other receiver kind.
pub const FEE_OFFLINE: i64 = 1_100_000;

/// Regular addresses can receive while offline from a single online
/// interaction; every other kind needs the sender to cover the cost of an
/// offline transaction.
pub fn fee_for_receiver(wallet_type: &str) -> i64 {
    match wallet_type {
        "regular" | "regular_new" => FEE_REGULAR,
        _ => FEE_OFFLINE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_receivers_pay_the_regular_fee() {
        assert_eq!(fee_for_receiver("regular"), FEE_REGULAR);
        assert_eq!(fee_for_receiver("regular_new"), FEE_REGULAR);
    }

    #[test]
    fn everything_else_pays_the_offline_fee() {
        assert_eq!(fee_for_receiver("offline"), FEE_OFFLINE);
        assert_eq!(fee_for_receiver("max_privacy"), FEE_OFFLINE);
        assert_eq!(fee_for_receiver("public_offline"), FEE_OFFLINE);
    }
}
