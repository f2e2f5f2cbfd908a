//! cryptonote-rpc
//!
//! Minimal, blocking JSON-RPC client for the node endpoints the wallet
//! consumes:
//! - "get_random_outputs" — amount-matched decoy oracle for ring building
//! - "get_status"         — fee-per-byte and next-block effective median size
//! - "send_transaction"   — relay of a signed, hex-encoded transaction blob
//!
//! Keys and hashes travel as hex strings on the wire; `cryptonote-crypto`
//! types carry that convention in their serde impls, so the payload structs
//! here derive serde directly.

use base64::{engine::general_purpose, Engine as _};
use cryptonote_crypto::{Hash, PublicKey};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("url parse: {0}")]
    Url(#[from] url::ParseError),
    #[error("rpc returned error: {0}")]
    Node(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// One entry of the random-output oracle response. The node may omit the
/// amount (it is the map key); `public_key` is the output's one-time key.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RandomOutput {
    #[serde(default)]
    pub amount: u64,
    pub global_index: u32,
    pub public_key: PublicKey,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct GetRandomOutputsRequest {
    pub amounts: Vec<u64>,
    pub outs_count: usize,
    pub confirmed_height_or_depth: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GetRandomOutputsResponse {
    #[serde(default)]
    pub outputs: BTreeMap<u64, Vec<RandomOutput>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GetStatusResponse {
    #[serde(default)]
    pub top_block_height: u32,
    #[serde(default)]
    pub top_block_hash: Hash,
    #[serde(default)]
    pub top_block_timestamp: u64,
    #[serde(default)]
    pub recommended_fee_per_byte: u64,
    #[serde(default)]
    pub next_block_effective_median_size: u64,
    #[serde(default)]
    pub transaction_pool_version: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SendTransactionRequest {
    /// Hex-encoded binary transaction.
    pub binary_transaction: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SendTransactionResponse {
    #[serde(default)]
    pub send_result: String,
}

#[derive(Clone)]
pub struct NodeRpc {
    base: Url,
    client: Client,
    auth_header: Option<HeaderValue>,
}

impl NodeRpc {
    /// Create a new client. `base` like "http://127.0.0.1:28081".
    /// Optional basic auth via (user, pass).
    pub fn new(base: &str, auth: Option<(String, String)>) -> Result<Self, RpcError> {
        let base = Url::parse(base)?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .default_headers(headers)
            .build()?;

        let auth_header = match auth {
            Some((user, pass)) => {
                let token = format!("{user}:{pass}");
                let enc = general_purpose::STANDARD.encode(token);
                let header_value = HeaderValue::from_str(&format!("Basic {}", enc))
                    .map_err(|e| RpcError::Decode(format!("auth header encode: {e}")))?;
                Some(header_value)
            }
            None => None,
        };

        Ok(Self {
            base,
            client,
            auth_header,
        })
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(a) = &self.auth_header {
            h.insert(AUTHORIZATION, a.clone());
        }
        h
    }

    fn json_rpc<P, R>(&self, method: &str, params: Option<&P>) -> Result<R, RpcError>
    where
        P: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        #[derive(Serialize)]
        struct Request<'a, T> {
            jsonrpc: &'a str,
            id: &'a str,
            method: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            params: Option<&'a T>,
        }

        #[derive(Deserialize)]
        struct Envelope<T> {
            result: Option<T>,
            error: Option<RpcErrorDetail>,
        }

        #[derive(Deserialize)]
        struct RpcErrorDetail {
            code: i64,
            message: String,
        }

        let url = self.base.join("/json_rpc")?;
        let request = Request {
            jsonrpc: "2.0",
            id: "0",
            method,
            params,
        };
        let response = self
            .client
            .post(url)
            .headers(self.auth_headers())
            .json(&request)
            .send()?
            .error_for_status()?;
        let envelope: Envelope<R> = response
            .json()
            .map_err(|e| RpcError::Decode(format!("{method}: {e}")))?;
        if let Some(err) = envelope.error {
            return Err(RpcError::Node(format!(
                "{method} code={} message={}",
                err.code, err.message
            )));
        }
        envelope
            .result
            .ok_or_else(|| RpcError::Decode(format!("{method}: missing result")))
    }

    pub fn get_random_outputs(
        &self,
        request: &GetRandomOutputsRequest,
    ) -> Result<GetRandomOutputsResponse, RpcError> {
        self.json_rpc("get_random_outputs", Some(request))
    }

    pub fn get_status(&self) -> Result<GetStatusResponse, RpcError> {
        self.json_rpc::<(), _>("get_status", None)
    }

    pub fn send_transaction(
        &self,
        request: &SendTransactionRequest,
    ) -> Result<SendTransactionResponse, RpcError> {
        self.json_rpc("send_transaction", Some(request))
    }
}
