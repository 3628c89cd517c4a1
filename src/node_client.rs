//! Client for the upstream Stacks node RPC.
//!
//! The construction flow needs four things from the node: the sender's
//! account state, the current transfer fee rate, the chain tip, and a way to
//! broadcast raw transactions. Everything else in this service is served
//! from the datastore.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::codec::encode_hex;
use crate::error::ApiError;

/// Account state as reported by `/v2/accounts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub nonce: u64,
    pub balance: u128,
}

/// Chain tip summary from `/v2/info`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeInfo {
    pub stacks_tip: String,
    pub stacks_tip_height: u64,
    pub server_version: String,
}

#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn get_account(&self, address: &str) -> Result<AccountInfo, ApiError>;
    /// Estimated microSTX per byte for token transfers.
    async fn get_fee_rate(&self) -> Result<u64, ApiError>;
    async fn get_info(&self) -> Result<NodeInfo, ApiError>;
    /// Broadcasts raw transaction bytes; returns the node-assigned txid
    /// (0x-prefixed).
    async fn broadcast(&self, transaction: &[u8]) -> Result<String, ApiError>;
}

/// Default timeout applied to every node call.
pub const NODE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpNodeClient {
    base_url: Url,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    /// Hex-encoded (0x-prefixed) microSTX balance.
    balance: String,
    nonce: u64,
}

impl HttpNodeClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpNodeClient { base_url, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

/// Transport-level failures surface as the opaque catalog error; timeouts
/// are marked retriable so clients re-send the identical request.
fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::UnknownError {
        message: Some(err.to_string()),
        retriable: err.is_timeout() || err.is_connect(),
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn get_account(&self, address: &str) -> Result<AccountInfo, ApiError> {
        let url = self.endpoint(&format!("/v2/accounts/{address}?proof=0"));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(ApiError::InvalidAccount);
        }
        let account: AccountResponse = response.json().await.map_err(transport_error)?;
        let balance_hex = account.balance.trim_start_matches("0x");
        let balance = u128::from_str_radix(balance_hex, 16).map_err(|_| ApiError::UnknownError {
            message: Some(format!("node returned malformed balance {}", account.balance)),
            retriable: false,
        })?;
        Ok(AccountInfo {
            nonce: account.nonce,
            balance,
        })
    }

    async fn get_fee_rate(&self) -> Result<u64, ApiError> {
        let url = self.endpoint("/v2/fees/transfer");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;
        response.json::<u64>().await.map_err(transport_error)
    }

    async fn get_info(&self) -> Result<NodeInfo, ApiError> {
        let url = self.endpoint("/v2/info");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;
        response.json::<NodeInfo>().await.map_err(transport_error)
    }

    async fn broadcast(&self, transaction: &[u8]) -> Result<String, ApiError> {
        let url = self.endpoint("/v2/transactions");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(transaction.to_vec())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(ApiError::from_node_rejection(body));
        }

        // success body is the quoted txid
        let txid: String = serde_json::from_str(&body).map_err(|_| ApiError::UnknownError {
            message: Some(format!("node returned malformed txid {body}")),
            retriable: false,
        })?;
        let raw = crate::codec::decode_hex(&txid).map_err(|_| ApiError::UnknownError {
            message: Some(format!("node returned malformed txid {txid}")),
            retriable: false,
        })?;
        Ok(encode_hex(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &mockito::ServerGuard) -> HttpNodeClient {
        HttpNodeClient::new(server.url().parse().unwrap(), NODE_TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn test_get_account() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/v2/accounts/STB44HYPYAT2BB2QE513NSP81HTMYWBJP02HPGK6?proof=0",
            )
            .with_body(r#"{"balance":"0x0000000000000000000000000007a120","nonce":3,"balance_proof":"","nonce_proof":""}"#)
            .create_async()
            .await;

        let account = client(&server)
            .get_account("STB44HYPYAT2BB2QE513NSP81HTMYWBJP02HPGK6")
            .await
            .unwrap();
        assert_eq!(account.nonce, 3);
        assert_eq!(account.balance, 500_000);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_fee_rate() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2/fees/transfer")
            .with_body("1")
            .create_async()
            .await;

        assert_eq!(client(&server).get_fee_rate().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_success() {
        let mut server = mockito::Server::new_async().await;
        let txid = "0b98f0fd42eecc13823a7c7fd136a4c61aebc67024ba9a79af6a6d642b30d1c2";
        server
            .mock("POST", "/v2/transactions")
            .match_header("content-type", "application/octet-stream")
            .with_body(format!("\"{txid}\""))
            .create_async()
            .await;

        let result = client(&server).broadcast(&[0x80, 0x80]).await.unwrap();
        assert_eq!(result, format!("0x{txid}"));
    }

    #[tokio::test]
    async fn test_broadcast_rejection_maps_to_catalog() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/transactions")
            .with_status(400)
            .with_body(r#"{"error":"transaction rejected","reason":"BadNonce"}"#)
            .create_async()
            .await;

        let err = client(&server).broadcast(&[0x80]).await.unwrap_err();
        assert_eq!(err.code(), 628);
    }

    #[tokio::test]
    async fn test_broadcast_insufficient_funds() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v2/transactions")
            .with_status(400)
            .with_body(r#"{"error":"transaction rejected","reason":"NotEnoughFunds"}"#)
            .create_async()
            .await;

        let err = client(&server).broadcast(&[0x80]).await.unwrap_err();
        assert_eq!(err, ApiError::InsufficientFunds);
    }
}
