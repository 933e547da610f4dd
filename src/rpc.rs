use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::core::error::ChainError;
use crate::types::{
    AccountSnapshot, ActionsPage, KeyAccounts, TableRows, TableRowsQuery, TransactOptions,
    TransactionOp, TransactionReceipt,
};

/// Chain node operations the sync layer depends on.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn get_account(&self, account: &str) -> Result<AccountSnapshot, ChainError>;

    async fn get_actions(
        &self,
        account: &str,
        pos: i64,
        offset: i64,
    ) -> Result<ActionsPage, ChainError>;

    /// Raw `"amount SYMBOL"` strings held by `account` under `contract`.
    async fn get_currency_balance(
        &self,
        contract: &str,
        account: &str,
        symbol: &str,
    ) -> Result<Vec<String>, ChainError>;

    async fn get_key_accounts(&self, public_key: &str) -> Result<KeyAccounts, ChainError>;

    async fn get_table_rows(&self, query: &TableRowsQuery) -> Result<TableRows, ChainError>;

    /// Sign and submit a transaction. Read-only clients cannot do this.
    async fn transact(
        &self,
        _op: &TransactionOp,
        _options: &TransactOptions,
    ) -> Result<TransactionReceipt, ChainError> {
        Err(ChainError::Unsupported("transact requires a signing client"))
    }
}

/// Error body produced by nodeos for failed API calls.
#[derive(Debug, Default, Deserialize)]
struct NodeErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: Option<NodeErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct NodeErrorDetail {
    #[serde(default)]
    name: String,
    #[serde(default)]
    what: String,
    #[serde(default)]
    details: Vec<NodeErrorMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct NodeErrorMessage {
    #[serde(default)]
    message: String,
}

impl NodeErrorBody {
    /// nodeos reports lookups of missing accounts as a 500 with this exception.
    fn is_unknown_key(&self) -> bool {
        self.error.as_ref().is_some_and(|detail| {
            detail.name == "unknown_key_exception"
                || detail
                    .details
                    .iter()
                    .any(|entry| entry.message.starts_with("unknown key"))
        })
    }

    fn describe(&self) -> String {
        match &self.error {
            Some(detail) if !detail.what.is_empty() => detail.what.clone(),
            Some(detail) if !detail.name.is_empty() => detail.name.clone(),
            _ => self.message.clone(),
        }
    }
}

/// Map a failed HTTP answer to the tagged error kind.
fn classify_failure(status: StatusCode, body: &str, what: &str) -> ChainError {
    let parsed: NodeErrorBody = serde_json::from_str(body).unwrap_or_default();
    if status == StatusCode::NOT_FOUND || parsed.is_unknown_key() {
        return ChainError::not_found(what);
    }
    let message = parsed.describe();
    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        message
    };
    ChainError::server(status.as_u16(), message)
}

/// JSON-over-HTTP client for the nodeos chain and history APIs.
#[derive(Clone, Debug)]
pub struct HttpChainRpc {
    client: Client,
    base: Url,
}

impl HttpChainRpc {
    pub fn new(node: &str, timeout: Duration) -> Result<Self, ChainError> {
        let mut base = Url::parse(node)
            .map_err(|err| ChainError::validation(format!("invalid node url {node}: {err}")))?;
        // endpoints are joined relative to the node path, which must end in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ChainError::Transport(err.to_string()))?;
        Ok(Self { client, base })
    }

    /// Endpoint URL under the node path, e.g. `https://host/wax/v1/chain/get_account`.
    fn endpoint(&self, path: &str) -> Result<Url, ChainError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ChainError::validation(format!("invalid endpoint {path}: {err}")))
    }

    async fn post<B, T>(&self, path: &str, body: &B, what: &str) -> Result<T, ChainError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "chain rpc request");

        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| ChainError::Transport(err.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| ChainError::Transport(err.to_string()))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(classify_failure(status, &text, what));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ChainRpc for HttpChainRpc {
    async fn get_account(&self, account: &str) -> Result<AccountSnapshot, ChainError> {
        self.post(
            "v1/chain/get_account",
            &json!({ "account_name": account }),
            &format!("account {account}"),
        )
        .await
    }

    async fn get_actions(
        &self,
        account: &str,
        pos: i64,
        offset: i64,
    ) -> Result<ActionsPage, ChainError> {
        self.post(
            "v1/history/get_actions",
            &json!({ "account_name": account, "pos": pos, "offset": offset }),
            &format!("actions of {account}"),
        )
        .await
    }

    async fn get_currency_balance(
        &self,
        contract: &str,
        account: &str,
        symbol: &str,
    ) -> Result<Vec<String>, ChainError> {
        self.post(
            "v1/chain/get_currency_balance",
            &json!({ "code": contract, "account": account, "symbol": symbol }),
            &format!("{contract}:{symbol} balance of {account}"),
        )
        .await
    }

    async fn get_key_accounts(&self, public_key: &str) -> Result<KeyAccounts, ChainError> {
        self.post(
            "v1/history/get_key_accounts",
            &json!({ "public_key": public_key }),
            "accounts for key",
        )
        .await
    }

    async fn get_table_rows(&self, query: &TableRowsQuery) -> Result<TableRows, ChainError> {
        self.post(
            "v1/chain/get_table_rows",
            query,
            &format!("{}/{} rows", query.code, query.table),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_500_is_not_found() {
        let body = r#"{
            "code": 500,
            "message": "Internal Service Error",
            "error": {
                "code": 0,
                "name": "exception",
                "what": "unspecified",
                "details": [{ "message": "unknown key (eosio::chain::name): nosuchacct" }]
            }
        }"#;
        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, body, "account nosuchacct");
        assert_eq!(err, ChainError::not_found("account nosuchacct"));
    }

    #[test]
    fn other_500_is_server_error() {
        let body = r#"{
            "code": 500,
            "message": "Internal Service Error",
            "error": { "code": 3010001, "name": "name_type_exception", "what": "Invalid name" }
        }"#;
        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, body, "account Bad");
        assert_eq!(err, ChainError::server(500, "Invalid name"));
    }

    #[test]
    fn gateway_error_without_body_uses_reason() {
        let err = classify_failure(StatusCode::BAD_GATEWAY, "<html>", "account alice");
        assert_eq!(err, ChainError::server(502, "Bad Gateway"));
    }

    #[test]
    fn http_404_is_not_found() {
        let err = classify_failure(StatusCode::NOT_FOUND, "", "actions of alice");
        assert!(err.is_not_found());
    }

    #[test]
    fn endpoints_keep_node_path_prefix() {
        let timeout = Duration::from_secs(1);
        for node in ["https://node.example/wax", "https://node.example/wax/"] {
            let rpc = HttpChainRpc::new(node, timeout).unwrap();
            assert_eq!(
                rpc.endpoint("v1/chain/get_account").unwrap().as_str(),
                "https://node.example/wax/v1/chain/get_account"
            );
        }
        let rpc = HttpChainRpc::new("https://node.example", timeout).unwrap();
        assert_eq!(
            rpc.endpoint("v1/history/get_actions").unwrap().as_str(),
            "https://node.example/v1/history/get_actions"
        );
    }

    #[tokio::test]
    async fn requests_go_under_node_path() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let read = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..read]).to_string();
            let body = r#"{"account_name":"alice","permissions":[]}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request
        });

        let rpc = HttpChainRpc::new(&format!("http://{addr}/wax"), Duration::from_secs(5)).unwrap();
        let snapshot = rpc.get_account("alice").await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(snapshot.account_name, "alice");
        assert!(
            request.starts_with("POST /wax/v1/chain/get_account HTTP/1.1"),
            "unexpected request line: {request}"
        );
    }

    #[test]
    fn rejects_invalid_node_url() {
        let err = HttpChainRpc::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
    }
}
