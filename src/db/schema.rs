// Diesel table definitions for the ledger store (spec.md §3).

diesel::table! {
    addresses (address_id) {
        address_id -> Text,
        wallet_kind -> Text,
        comment -> Nullable<Text>,
        create_time -> BigInt,
        expired -> Bool,
        identity -> Nullable<Text>,
        owner_wallet_id -> Nullable<Text>,
    }
}

diesel::table! {
    address_balances (address_id, asset_id) {
        address_id -> Text,
        asset_id -> BigInt,
        available -> BigInt,
        locked -> BigInt,
    }
}

diesel::table! {
    assets (asset_id) {
        asset_id -> BigInt,
        metadata -> Text,
        decimals -> Integer,
        is_verified -> Bool,
        is_spam -> Bool,
        rate_beam -> Nullable<Double>,
        rate_usd -> Nullable<Double>,
    }
}

diesel::table! {
    transactions (tx_id) {
        tx_id -> Text,
        status -> Integer,
        status_string -> Text,
        income -> Bool,
        tx_type -> Integer,
        asset_id -> BigInt,
        value -> BigInt,
        fee -> BigInt,
        sender -> Text,
        receiver -> Text,
        sender_identity -> Nullable<Text>,
        receiver_identity -> Nullable<Text>,
        comment -> Nullable<Text>,
        create_time -> BigInt,
        confirmations -> Integer,
        kernel -> Nullable<Text>,
        failure_reason -> Nullable<Text>,
        success -> Bool,
    }
}

diesel::table! {
    transaction_webhook_sent (tx_id, kind) {
        tx_id -> Text,
        kind -> Text,
        sent_at -> BigInt,
    }
}

diesel::table! {
    pending_withdrawals (id) {
        id -> Integer,
        sender -> Text,
        receiver -> Text,
        asset_id -> BigInt,
        value -> BigInt,
        fee -> BigInt,
        comment -> Nullable<Text>,
        create_time -> BigInt,
        status -> Text,
        tx_id -> Nullable<Text>,
    }
}

diesel::table! {
    failed_webhooks (id) {
        id -> Integer,
        url -> Text,
        event_kind -> Text,
        payload -> Text,
        last_attempt -> BigInt,
        attempts -> Integer,
    }
}

diesel::table! {
    native_price (id) {
        id -> Text,
        price_usd -> Double,
        last_updated -> BigInt,
    }
}

diesel::joinable!(address_balances -> addresses (address_id));
diesel::allow_tables_to_appear_in_same_query!(addresses, address_balances);
diesel::allow_tables_to_appear_in_same_query!(transactions, transaction_webhook_sent);
