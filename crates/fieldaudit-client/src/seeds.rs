//! # Parameter Seeding
//!
//! Harvests realistic identifier values from list endpoints of the live API
//! before any endpoint is probed. Every harvest call is best-effort: a
//! failure, a non-200 status or an empty list leaves that seed unset.
//!
//! Seeding runs sequentially and produces an immutable [`Seeds`] value that
//! every prober then reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::ApiClient;

/// Number of token/collection entries scanned for one with holdings.
const HOLDING_SCAN_LIMIT: usize = 5;

/// Harvested example values for filling parameterized paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seeds {
    /// A chain address, preferring one that holds tokens or NFTs.
    pub address: Option<String>,
    /// A block height.
    pub height: Option<String>,
    /// A transaction id.
    pub tx_id: Option<String>,
    /// A fungible token identifier that has holders.
    pub token: Option<String>,
    /// An NFT collection type that has holders.
    pub nft_type: Option<String>,
    /// An NFT item id within `nft_type`.
    pub nft_item_id: Option<String>,
    /// A contract identifier.
    pub identifier: Option<String>,
    /// An EVM transaction hash.
    pub evm_hash: Option<String>,
    /// An EVM token contract address.
    pub evm_token_address: Option<String>,
}

impl Seeds {
    /// Every seed as `(name, value)` in a fixed order.
    pub fn entries(&self) -> [(&'static str, Option<&str>); 9] {
        [
            ("address", self.address.as_deref()),
            ("height", self.height.as_deref()),
            ("tx_id", self.tx_id.as_deref()),
            ("token", self.token.as_deref()),
            ("nft_type", self.nft_type.as_deref()),
            ("nft_item_id", self.nft_item_id.as_deref()),
            ("identifier", self.identifier.as_deref()),
            ("evm_hash", self.evm_hash.as_deref()),
            ("evm_token_address", self.evm_token_address.as_deref()),
        ]
    }

    /// Number of seeds that were harvested.
    pub fn harvested(&self) -> usize {
        self.entries().iter().filter(|(_, v)| v.is_some()).count()
    }
}

/// Harvest seeds from the live API.
pub async fn seed(client: &ApiClient) -> Seeds {
    let mut seeds = Seeds::default();

    if let Some(account) = first_item(client, "/flow/v1/account", 1).await {
        seeds.address = string_field(&account, "address");
        seeds.height = scalar_field(&account, "height");
    }

    if let Some(block) = first_item(client, "/flow/v1/block", 1).await {
        if let Some(height) = scalar_field(&block, "height") {
            seeds.height = Some(height);
        }
    }

    if let Some(tx) = first_item(client, "/flow/v1/transaction", 1).await {
        seeds.tx_id = string_field(&tx, "id");
    }

    if let Some(contract) = first_item(client, "/flow/v1/contract", 1).await {
        seeds.identifier = string_field(&contract, "identifier");
    }

    // Holder addresses override the account listing: they are more likely
    // to produce non-empty downstream responses.
    if let Some((token, holding)) = first_with_holding(client, "/flow/v1/ft").await {
        seeds.token = Some(token);
        if let Some(address) = string_field(&holding, "address") {
            seeds.address = Some(address);
        }
    }

    if let Some((nft_type, holding)) = first_with_holding(client, "/flow/v1/nft").await {
        seeds.nft_type = Some(nft_type);
        if let Some(owner) = string_field(&holding, "owner") {
            seeds.address = Some(owner);
        }
        seeds.nft_item_id = scalar_field(&holding, "nft_id").or_else(|| scalar_field(&holding, "id"));
    }

    if let Some(evm_tx) = first_item(client, "/flow/v1/evm/transaction", 1).await {
        seeds.evm_hash = string_field(&evm_tx, "hash");
    }

    if let Some(evm_token) = first_item(client, "/flow/v1/evm/token", 1).await {
        seeds.evm_token_address =
            string_field(&evm_token, "address").or_else(|| string_field(&evm_token, "id"));
    }

    for (name, value) in seeds.entries() {
        match value {
            Some(value) => tracing::debug!(seed = name, value, "seed harvested"),
            None => tracing::warn!(seed = name, "seed not harvested"),
        }
    }
    seeds
}

/// The `data` array of a list envelope fetched with `limit`/`offset`.
async fn list(client: &ApiClient, path: &str, limit: usize) -> Vec<Value> {
    let query = format!("{path}?limit={limit}&offset=0");
    match client.get_ok_json(&query).await {
        Some(Value::Object(mut envelope)) => match envelope.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

async fn first_item(client: &ApiClient, path: &str, limit: usize) -> Option<Value> {
    list(client, path, limit).await.into_iter().next().filter(Value::is_object)
}

/// Scan a token/collection list for the first entry whose holding list is
/// non-empty. Returns the entry's `id` and its first holding.
async fn first_with_holding(client: &ApiClient, path: &str) -> Option<(String, Value)> {
    for entry in list(client, path, HOLDING_SCAN_LIMIT).await {
        let Some(id) = string_field(&entry, "id") else {
            continue;
        };
        let holding_path = format!("{path}/{}/holding", encode_segment(&id));
        if let Some(holding) = first_item(client, &holding_path, 1).await {
            return Some((id, holding));
        }
    }
    None
}

/// Percent-encode a value for use as exactly one path segment.
pub fn encode_segment(value: &str) -> String {
    // form-urlencoding writes spaces as `+`; a literal `+` is already `%2B`.
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(String::from)
}

fn scalar_field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
