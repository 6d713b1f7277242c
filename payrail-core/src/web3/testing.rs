//! A scripted JSON-RPC node for wallet and gateway tests.

use alloy_primitives::{Address, B256, TxHash, U256};
use alloy_provider::{DynProvider, ProviderBuilder};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockBuilder, MockServer, Request, Respond, ResponseTemplate};

/// Answers a JSON-RPC call with a fixed result or error, echoing the
/// request id.
pub enum JsonRpcReply {
    Result(Value),
    Error { code: i64, message: &'static str },
}

impl Respond for JsonRpcReply {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let id = body.get("id").cloned().unwrap_or(json!(0));
        let reply = match self {
            JsonRpcReply::Result(result) => {
                json!({ "jsonrpc": "2.0", "id": id, "result": result })
            }
            JsonRpcReply::Error { code, message } => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": code, "message": message }
            }),
        };
        ResponseTemplate::new(200).set_body_json(reply)
    }
}

/// Matches calls of one JSON-RPC method.
pub fn rpc_method(name: &str) -> MockBuilder {
    Mock::given(method("POST")).and(body_partial_json(json!({ "method": name })))
}

/// A provider with no fillers, so only the calls under test reach the node.
pub fn node_provider(server: &MockServer) -> DynProvider {
    let url = Url::parse(&server.uri()).unwrap();
    DynProvider::new(ProviderBuilder::default().connect_http(url))
}

/// `eth_call` return data holding one `uint256`.
pub fn uint_word(value: U256) -> Value {
    json!(B256::from(value.to_be_bytes::<32>()))
}

/// `eth_call` return data holding one `address`.
pub fn address_word(address: Address) -> Value {
    json!(address.into_word())
}

/// A mined EIP-1559 receipt; `success` sets its status.
pub fn receipt(tx_hash: TxHash, from: Address, to: Address, success: bool) -> Value {
    json!({
        "type": "0x2",
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "blockHash": B256::repeat_byte(0xbb),
        "blockNumber": "0x10",
        "from": from,
        "to": to,
        "contractAddress": null,
        "cumulativeGasUsed": "0xb411",
        "gasUsed": "0xb411",
        "effectiveGasPrice": "0x3b9aca00",
        "logs": [],
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "status": if success { "0x1" } else { "0x0" },
    })
}
