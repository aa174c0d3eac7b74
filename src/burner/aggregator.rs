//! Swap aggregator HTTP client.
//!
//! Speaks the Jupiter-style `/quote`, `/swap` and `/swap-instructions`
//! endpoints. Quote responses come in two shapes depending on API version:
//! a ranked route collection (`{"data": [...]}`) or one quote object whose
//! `routePlan` lists its hops. Both are normalized into [`Quote`].

use crate::burner::error::BurnError;
use crate::burner::types::{SwapFlow, TransactionPayload};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

/// Parameters of an exact-input quote.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount: u64,
    pub slippage_bps: u16,
}

/// Which request body key the aggregator expects the route under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteShape {
    /// Entry of a ranked collection, posted back as `route`
    Ranked,
    /// Whole quote object, posted back as `quoteResponse`
    QuoteResponse,
}

/// One candidate conversion path, kept opaque and echoed back on swap.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub shape: RouteShape,
    pub raw: Value,
}

impl Route {
    pub fn out_amount(&self) -> Option<u64> {
        let field = self.raw.get("outAmount")?;
        field
            .as_u64()
            .or_else(|| field.as_str().and_then(|s| s.parse().ok()))
    }
}

/// Candidate routes, best first as ranked by the aggregator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Quote {
    pub routes: Vec<Route>,
}

impl Quote {
    /// Normalize either response shape.
    pub fn from_response(body: Value) -> Result<Self, BurnError> {
        if let Some(data) = body.get("data") {
            let entries = data
                .as_array()
                .ok_or_else(|| BurnError::Decode("quote 'data' is not an array".to_string()))?;
            let routes = entries
                .iter()
                .cloned()
                .map(|raw| Route {
                    shape: RouteShape::Ranked,
                    raw,
                })
                .collect();
            return Ok(Self { routes });
        }

        let has_hops = body
            .get("routePlan")
            .and_then(Value::as_array)
            .map(|plan| !plan.is_empty())
            .unwrap_or(false);
        let routes = if has_hops {
            vec![Route {
                shape: RouteShape::QuoteResponse,
                raw: body,
            }]
        } else {
            Vec::new()
        };
        Ok(Self { routes })
    }
}

/// Aggregator endpoints used by the swap router.
#[async_trait]
pub trait SwapAggregator: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, BurnError>;

    async fn swap_payload(
        &self,
        route: &Route,
        user: &Pubkey,
        flow: SwapFlow,
    ) -> Result<TransactionPayload, BurnError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapTransactionResponse {
    swap_transaction: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapInstructionsResponse {
    #[serde(default)]
    compute_budget_instructions: Vec<ApiInstruction>,
    #[serde(default)]
    setup_instructions: Vec<ApiInstruction>,
    swap_instruction: ApiInstruction,
    #[serde(default)]
    cleanup_instruction: Option<ApiInstruction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInstruction {
    program_id: String,
    accounts: Vec<ApiAccountMeta>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAccountMeta {
    pubkey: String,
    is_signer: bool,
    is_writable: bool,
}

fn parse_pubkey(value: &str) -> Result<Pubkey, BurnError> {
    Pubkey::from_str(value).map_err(|e| BurnError::Decode(format!("pubkey '{}': {}", value, e)))
}

impl ApiInstruction {
    fn into_instruction(self) -> Result<Instruction, BurnError> {
        let program_id = parse_pubkey(&self.program_id)?;
        let accounts = self
            .accounts
            .into_iter()
            .map(|meta| {
                let pubkey = parse_pubkey(&meta.pubkey)?;
                Ok(if meta.is_writable {
                    AccountMeta::new(pubkey, meta.is_signer)
                } else {
                    AccountMeta::new_readonly(pubkey, meta.is_signer)
                })
            })
            .collect::<Result<Vec<_>, BurnError>>()?;
        let data = BASE64
            .decode(&self.data)
            .map_err(|e| BurnError::Decode(format!("instruction data: {}", e)))?;
        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl SwapInstructionsResponse {
    /// Flatten in execution order: compute budget, setup, swap, cleanup.
    fn into_instructions(self) -> Result<Vec<Instruction>, BurnError> {
        self.compute_budget_instructions
            .into_iter()
            .chain(self.setup_instructions)
            .chain(std::iter::once(self.swap_instruction))
            .chain(self.cleanup_instruction)
            .map(ApiInstruction::into_instruction)
            .collect()
    }
}

/// Error codes the quote endpoint uses when no path exists for the pair.
const NO_ROUTE_ERROR_CODES: &[&str] = &["COULD_NOT_FIND_ANY_ROUTE", "NO_ROUTES_FOUND"];

/// Whether a rejected quote body means "no route" rather than a bad request.
pub fn is_no_route_error(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("errorCode")
                .and_then(Value::as_str)
                .map(|code| NO_ROUTE_ERROR_CODES.contains(&code))
        })
        .unwrap_or(false)
}

/// Decode a base64 bincode-serialized versioned transaction.
pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, BurnError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| BurnError::Decode(format!("swap transaction base64: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| BurnError::Decode(format!("swap transaction bytes: {}", e)))
}

/// Jupiter-compatible aggregator client with a client-side request budget.
pub struct JupiterClient {
    http_client: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl JupiterClient {
    pub fn new(base_url: impl Into<String>, requests_per_second: u32) -> Result<Self, BurnError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(Quota::per_second(rps)),
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, BurnError> {
        self.limiter.until_ready().await;
        let response = self
            .http_client
            .post(format!("{}/{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, BurnError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BurnError::from_http_status(status, &body));
        }
        Ok(response.json::<Value>().await?)
    }

    fn swap_body(route: &Route, user: &Pubkey) -> Value {
        let route_key = match route.shape {
            RouteShape::Ranked => "route",
            RouteShape::QuoteResponse => "quoteResponse",
        };
        json!({
            route_key: route.raw,
            "userPublicKey": user.to_string(),
            "wrapAndUnwrapSol": true,
            "wrapUnwrapSOL": true,
        })
    }
}

#[async_trait]
impl SwapAggregator for JupiterClient {
    #[instrument(skip(self), fields(amount = request.amount))]
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, BurnError> {
        self.limiter.until_ready().await;
        let response = self
            .http_client
            .get(format!("{}/quote", self.base_url))
            .query(&[
                ("inputMint", request.input_mint.to_string()),
                ("outputMint", request.output_mint.to_string()),
                ("amount", request.amount.to_string()),
                ("slippageBps", request.slippage_bps.to_string()),
                ("swapMode", "ExactIn".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            if is_no_route_error(&body) {
                debug!("Aggregator reported no route: {}", body);
                return Ok(Quote::default());
            }
            return Err(BurnError::from_http_status(status, &body));
        }

        let quote = Quote::from_response(Self::read_json(response).await?)?;
        debug!("Aggregator returned {} routes", quote.routes.len());
        Ok(quote)
    }

    #[instrument(skip(self, route), fields(user = %user))]
    async fn swap_payload(
        &self,
        route: &Route,
        user: &Pubkey,
        flow: SwapFlow,
    ) -> Result<TransactionPayload, BurnError> {
        let body = Self::swap_body(route, user);
        match flow {
            SwapFlow::Transaction => {
                let value = self.post_json("swap", &body).await?;
                let response: SwapTransactionResponse = serde_json::from_value(value)
                    .map_err(|e| BurnError::Decode(format!("swap response: {}", e)))?;
                Ok(TransactionPayload::Prebuilt(decode_transaction(
                    &response.swap_transaction,
                )?))
            }
            SwapFlow::Instructions => {
                let value = self.post_json("swap-instructions", &body).await?;
                let response: SwapInstructionsResponse = serde_json::from_value(value)
                    .map_err(|e| BurnError::Decode(format!("swap-instructions response: {}", e)))?;
                Ok(TransactionPayload::Instructions(response.into_instructions()?))
            }
        }
    }
}
