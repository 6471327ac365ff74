//! HTTP-level integration tests for the chain protocol adapters.
//!
//! Uses `wiremock` to stand in for chain nodes and drives the adapters
//! through their trait surface, pinning the wire dialect of each chain:
//! paths, request bodies, response envelopes, and error normalization.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::ExposeSecret;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wallet_gateway::domain::{
    AdapterErrorKind, AddressOptions, BlockchainClient, Chain, Currency, Issuer, Recipient,
    RpcError, TransportError, WalletClient, WalletConfig, WithdrawalOptions,
};
use wallet_gateway::infra::{DdkoinClient, HttpVerb, RippledClient, RpcTransport};

fn ddkoin_client(uri: &str) -> DdkoinClient {
    let config = WalletConfig::new(Chain::Ddkoin, Currency::new("ddk"), uri, "DDK-hot");
    DdkoinClient::new(&config).unwrap()
}

fn rippled_client(uri: &str) -> RippledClient {
    let config = WalletConfig::new(
        Chain::Ripple,
        Currency::new("xrp"),
        uri,
        "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
    );
    RippledClient::new(&config).unwrap()
}

fn issuer(address: &str) -> Issuer {
    Issuer {
        address: address.to_string(),
        secret: "issuer secret".to_string().into(),
    }
}

fn recipient(address: &str) -> Recipient {
    Recipient {
        address: address.to_string(),
    }
}

// ============================================================================
// RPC TRANSPORT TESTS
// ============================================================================

mod transport_tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_auth_credentials_are_forwarded() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Basic c3ZjOmh1bnRlcjI="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": true})))
            .mount(&mock_server)
            .await;

        let host = mock_server.uri();
        let credentialed = format!("http://svc:hunter2@{}", host.strip_prefix("http://").unwrap());
        let transport = RpcTransport::new(&credentialed, Duration::from_secs(5)).unwrap();

        let payload = transport
            .call(HttpVerb::Get, "/ping", serde_json::Value::Null)
            .await
            .unwrap();
        assert_eq!(payload["data"], json!(true));
    }

    #[tokio::test]
    async fn test_get_parameters_travel_as_query_string() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("limit", "10"))
            .and(query_param("state", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&mock_server)
            .await;

        let transport = RpcTransport::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        let result = transport
            .call(
                HttpVerb::Get,
                "/search",
                json!({"limit": 10, "state": "open"}),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_slow_node_hits_the_deadline() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": 1}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let transport = RpcTransport::new(&mock_server.uri(), Duration::from_millis(50)).unwrap();
        let err = transport
            .call(HttpVerb::Get, "/slow", serde_json::Value::Null)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RpcError::Transport(TransportError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_non_success_status_carries_the_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&mock_server)
            .await;

        let transport = RpcTransport::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        let err = transport
            .call(HttpVerb::Get, "/x", serde_json::Value::Null)
            .await
            .unwrap_err();

        match err {
            RpcError::Transport(TransportError::Http { status, body }) => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected http error, got {:?}", other),
        }
    }
}

// ============================================================================
// DDKOIN WALLET OPERATION TESTS
// ============================================================================

mod ddkoin_wallet_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_address_generates_a_passphrase_when_none_supplied() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/utils/generate-passphrase"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": "canoe bird mammal quote wait tribe"})),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/accounts"))
            .and(body_partial_json(
                json!({"secret": "canoe bird mammal quote wait tribe"}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"address": "DDK5143663227423254undefined"}})),
            )
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        let created = client
            .create_address(&AddressOptions::default())
            .await
            .unwrap();

        assert_eq!(created.address, "DDK5143663227423254undefined");
        assert_eq!(
            created.secret.expose_secret(),
            "canoe bird mammal quote wait tribe"
        );
    }

    #[tokio::test]
    async fn test_create_address_reuses_a_supplied_secret() {
        let mock_server = MockServer::start().await;

        // No passphrase mock mounted: hitting it would 404 and fail the call.
        Mock::given(method("POST"))
            .and(path("/api/accounts"))
            .and(body_partial_json(json!({"secret": "already chosen words"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"address": "DDK77"}})),
            )
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        let options = AddressOptions {
            address: None,
            secret: Some("already chosen words".to_string().into()),
        };
        let created = client.create_address(&options).await.unwrap();

        assert_eq!(created.address, "DDK77");
        assert_eq!(created.secret.expose_secret(), "already chosen words");
    }

    #[tokio::test]
    async fn test_load_balance_converts_base_units_to_display() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/accounts/DDK77/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": 150000000u64})))
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        let balance = client
            .load_balance("DDK77", &Currency::new("ddk"))
            .await
            .unwrap();

        assert_eq!(balance, dec!(1.5));
    }

    #[tokio::test]
    async fn test_withdrawal_posts_base_units_and_returns_the_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/transactions"))
            .and(body_partial_json(json!({
                "senderAddress": "DDK-deposit",
                "secret": "issuer secret",
                "destinations": [{"address": "DDK-hot-1", "amount": 25_000_000u64}],
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "f00dcafe"}})),
            )
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        let txid = client
            .create_withdrawal(
                &issuer("DDK-deposit"),
                &recipient("DDK-hot-1"),
                dec!(0.25),
                &WithdrawalOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(txid, "f00dcafe");
    }

    #[tokio::test]
    async fn test_fee_comes_from_the_fee_endpoint_without_moving_funds() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/transactions/fee"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"fee": 10000000u64}})),
            )
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        let fee = client
            .get_txn_fee(
                &issuer("DDK-deposit"),
                &recipient("DDK-hot-1"),
                dec!(0.25),
                &WithdrawalOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(fee, Decimal::from(10000000u64));
    }

    #[tokio::test]
    async fn test_error_envelope_surfaces_as_an_application_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/accounts/DDK77/balance"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": null, "error": "Account not found"})),
            )
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        let err = client
            .load_balance("DDK77", &Currency::new("ddk"))
            .await
            .unwrap_err();

        assert_eq!(err.chain, Chain::Ddkoin);
        assert_eq!(err.operation, "load_balance");
        match err.kind {
            AdapterErrorKind::Rpc(RpcError::Application { message, .. }) => {
                assert_eq!(message, "Account not found");
            }
            other => panic!("expected application error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_data_field_is_an_unexpected_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/accounts/DDK77/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        let err = client
            .load_balance("DDK77", &Currency::new("ddk"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind,
            AdapterErrorKind::Rpc(RpcError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_excess_precision_never_reaches_the_wire() {
        let mock_server = MockServer::start().await;
        // No mock mounted: the conversion must fail before any request.

        let client = ddkoin_client(&mock_server.uri());
        let err = client
            .create_withdrawal(
                &issuer("DDK-deposit"),
                &recipient("DDK-hot-1"),
                dec!(0.000000001),
                &WithdrawalOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err.kind, AdapterErrorKind::Conversion(_)));
    }
}

// ============================================================================
// DDKOIN BLOCK SCAN TESTS
// ============================================================================

mod ddkoin_block_scan_tests {
    use super::*;

    #[tokio::test]
    async fn test_latest_block_number_is_cached() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/blocks/last"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"height": 777}})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        assert_eq!(client.latest_block_number().await.unwrap(), 777);
        assert_eq!(client.latest_block_number().await.unwrap(), 777);
    }

    #[tokio::test]
    async fn test_get_block_hash_reads_the_first_matching_block() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/blocks/getMany"))
            .and(body_partial_json(json!({"filter": {"height": 9000}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"data": {"blocks": [{"id": "block9000", "height": 9000}]}}),
            ))
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        assert_eq!(client.get_block_hash(9000).await.unwrap(), "block9000");
    }

    #[tokio::test]
    async fn test_get_block_hash_fails_when_no_block_exists() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/blocks/getMany"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"blocks": []}})),
            )
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        let err = client.get_block_hash(123456).await.unwrap_err();
        assert!(matches!(
            err.kind,
            AdapterErrorKind::Rpc(RpcError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_get_block_filters_on_transfer_type() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/transactions/getMany"))
            .and(body_partial_json(
                json!({"filter": {"block_id": "block9000", "type": 10}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "tx1", "asset": [{"amount": 100, "recipientAddress": "DDK-a"}]},
                    {"id": "tx2", "asset": [{"amount": 200, "recipientAddress": "DDK-b"}]},
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = ddkoin_client(&mock_server.uri());
        let txs = client.get_block("block9000").await.unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0]["id"], json!("tx1"));
    }
}

// ============================================================================
// RIPPLED WALLET OPERATION TESTS
// ============================================================================

mod rippled_wallet_tests {
    use super::*;

    #[tokio::test]
    async fn test_wallet_propose_yields_account_and_seed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({"method": "wallet_propose"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "account_id": "rGWTUVmPHfZAsBSk3mbg6frWDurdkdZ2cv",
                    "master_seed": "ssyXjRurNo75TjXjubby65cD96ak8",
                    "status": "success"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        let created = client
            .create_address(&AddressOptions::default())
            .await
            .unwrap();

        assert_eq!(created.address, "rGWTUVmPHfZAsBSk3mbg6frWDurdkdZ2cv");
        assert_eq!(created.secret.expose_secret(), "ssyXjRurNo75TjXjubby65cD96ak8");
    }

    #[tokio::test]
    async fn test_load_balance_strips_the_tag_and_reads_drops() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({
                "method": "account_info",
                "params": [{"account": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh", "ledger_index": "validated"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "account_data": {"Balance": "2000000"},
                    "status": "success"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        let balance = client
            .load_balance(
                "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh?dt=4355",
                &Currency::new("xrp"),
            )
            .await
            .unwrap();

        assert_eq!(balance, dec!(2));
    }

    #[tokio::test]
    async fn test_submit_carries_destination_tag_and_folds_the_hash() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({
                "method": "submit",
                "params": [{
                    "secret": "issuer secret",
                    "tx_json": {
                        "TransactionType": "Payment",
                        "Account": "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh",
                        "Destination": "rDestDestDestDestDestDest1",
                        "DestinationTag": 4355,
                        "Amount": "1500000",
                    },
                }],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "engine_result": "tesSUCCESS",
                    "tx_json": {"hash": "E08D6E9754025BA2534A78707605E0601F03ACE063687A0CA1BDDACFCD1698C7"},
                    "status": "success"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        let txid = client
            .create_withdrawal(
                &issuer("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"),
                &recipient("rDestDestDestDestDestDest1?dt=4355"),
                dec!(1.5),
                &WithdrawalOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            txid,
            "e08d6e9754025ba2534a78707605e0601f03ace063687a0ca1bddacfcd1698c7"
        );
    }

    #[tokio::test]
    async fn test_source_tag_is_forwarded_when_requested() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({
                "params": [{"tx_json": {"SourceTag": 1}}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "engine_result": "tesSUCCESS",
                    "tx_json": {"hash": "AB"},
                    "status": "success"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        let options = WithdrawalOptions { source_tag: Some(1) };
        let txid = client
            .create_withdrawal(
                &issuer("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"),
                &recipient("rDestDestDestDestDestDest1"),
                dec!(1),
                &options,
            )
            .await
            .unwrap();

        assert_eq!(txid, "ab");
    }

    #[tokio::test]
    async fn test_non_tes_engine_result_is_an_application_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "engine_result": "tecUNFUNDED_PAYMENT",
                    "engine_result_message": "Insufficient XRP balance to send.",
                    "status": "success"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        let err = client
            .create_withdrawal(
                &issuer("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"),
                &recipient("rDestDestDestDestDestDest1"),
                dec!(10),
                &WithdrawalOptions::default(),
            )
            .await
            .unwrap_err();

        match err.kind {
            AdapterErrorKind::Rpc(RpcError::Application { message, .. }) => {
                assert_eq!(message, "Insufficient XRP balance to send.");
            }
            other => panic!("expected application error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_normalizes_to_an_application_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "error": "actNotFound",
                    "error_message": "Account not found.",
                    "status": "error"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        let err = client
            .load_balance("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh", &Currency::new("xrp"))
            .await
            .unwrap_err();

        match err.kind {
            AdapterErrorKind::Rpc(RpcError::Application { message, raw }) => {
                assert_eq!(message, "Account not found.");
                assert_eq!(raw["error"], json!("actNotFound"));
            }
            other => panic!("expected application error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fee_reports_the_open_ledger_drops() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({"method": "fee"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "drops": {"base_fee": "10", "open_ledger_fee": "5000"},
                    "status": "success"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        let fee = client
            .get_txn_fee(
                &issuer("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"),
                &recipient("rDestDestDestDestDestDest1"),
                dec!(1),
                &WithdrawalOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(fee, Decimal::from(5000u64));
    }
}

// ============================================================================
// RIPPLED LEDGER SCAN TESTS
// ============================================================================

mod rippled_ledger_scan_tests {
    use super::*;

    #[tokio::test]
    async fn test_latest_block_number_reads_the_validated_ledger() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(
                json!({"method": "ledger", "params": [{"ledger_index": "validated"}]}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "ledger_index": 62884101u64,
                    "validated": true,
                    "status": "success"
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        assert_eq!(client.latest_block_number().await.unwrap(), 62884101);
        // Second read is served from the short-lived cache.
        assert_eq!(client.latest_block_number().await.unwrap(), 62884101);
    }

    #[tokio::test]
    async fn test_get_block_hash_resolves_a_height() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(
                json!({"method": "ledger", "params": [{"ledger_index": 62884101u64}]}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "ledger": {"ledger_hash": "F2DCB4B2C5D4EBE56A2358D0F5B0D1512F9D36"},
                    "status": "success"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        assert_eq!(
            client.get_block_hash(62884101).await.unwrap(),
            "F2DCB4B2C5D4EBE56A2358D0F5B0D1512F9D36"
        );
    }

    #[tokio::test]
    async fn test_get_block_expands_transactions() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({
                "method": "ledger",
                "params": [{"ledger_hash": "F2DC", "transactions": true, "expand": true}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "ledger": {
                        "transactions": [
                            {"hash": "AA", "TransactionType": "Payment", "Destination": "rDest", "Amount": "7"},
                            {"hash": "BB", "TransactionType": "OfferCreate"},
                        ]
                    },
                    "status": "success"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = rippled_client(&mock_server.uri());
        let txs = client.get_block("F2DC").await.unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0]["hash"], json!("AA"));
    }
}
