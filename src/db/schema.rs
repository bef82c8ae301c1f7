// Hand-maintained to match migrations/; mirrors what `diesel print-schema`
// would generate for the tables in migrations/2024-05-01-000000_init.

diesel::table! {
    endpoints (id) {
        id -> BigInt,
        url -> Text,
        api_path -> Text,
        api_key -> Text,
        status -> Text,
        tunnel_count -> BigInt,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    tunnels (id) {
        id -> BigInt,
        endpoint_id -> BigInt,
        instance_id -> Text,
        name -> Nullable<Text>,
        tunnel_type -> Text,
        tunnel_address -> Nullable<Text>,
        tunnel_port -> Nullable<Integer>,
        target_address -> Nullable<Text>,
        target_port -> Nullable<Integer>,
        tls_mode -> Text,
        log_level -> Text,
        password -> Nullable<Text>,
        min -> Nullable<Text>,
        max -> Nullable<Text>,
        mode -> Nullable<Text>,
        read -> Nullable<Text>,
        rate -> Nullable<Text>,
        restart -> Nullable<Bool>,
        status -> Text,
        tcp_rx -> BigInt,
        tcp_tx -> BigInt,
        udp_rx -> BigInt,
        udp_tx -> BigInt,
        ping -> Nullable<BigInt>,
        pool -> Nullable<BigInt>,
        tcps -> Nullable<BigInt>,
        udps -> Nullable<BigInt>,
        last_event_time -> Text,
        command_line -> Nullable<Text>,
        peer_sid -> Nullable<Text>,
        peer_type -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    services (sid, type_) {
        sid -> Text,
        #[sql_name = "type"]
        type_ -> Text,
        local_endpoint_id -> BigInt,
        local_instance_id -> Text,
        peer_endpoint_id -> Nullable<BigInt>,
        peer_instance_id -> Nullable<Text>,
        total_rx -> BigInt,
        total_tx -> BigInt,
        sorts -> Integer,
        updated_at -> Text,
    }
}

diesel::table! {
    service_history (id) {
        id -> BigInt,
        endpoint_id -> BigInt,
        instance_id -> Text,
        record_time -> Text,
        record_count -> Integer,
        up_count -> Integer,
        delta_tcp_in -> BigInt,
        delta_tcp_out -> BigInt,
        delta_udp_in -> BigInt,
        delta_udp_out -> BigInt,
        avg_speed_in -> Double,
        avg_speed_out -> Double,
        avg_ping -> Double,
        last_pool -> BigInt,
        last_tcps -> BigInt,
        last_udps -> BigInt,
    }
}

diesel::table! {
    tunnel_operation_logs (id) {
        id -> BigInt,
        tunnel_id -> BigInt,
        endpoint_id -> BigInt,
        instance_id -> Text,
        action -> Text,
        message -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    endpoints,
    tunnels,
    services,
    service_history,
    tunnel_operation_logs,
);
