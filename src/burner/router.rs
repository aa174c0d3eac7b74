//! Swap router: quote, validate, then fetch the payload for the best route.

use crate::burner::aggregator::{QuoteRequest, Route, SwapAggregator};
use crate::burner::error::BurnError;
use crate::burner::retry::RetryPolicy;
use crate::burner::types::{SwapFlow, TransactionPayload};
use nonempty::NonEmpty;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{info, instrument};

/// A swap ready for submission along with the route it came from.
#[derive(Debug, Clone)]
pub struct PreparedSwap {
    pub route: Route,
    pub payload: TransactionPayload,
}

pub struct SwapRouter {
    aggregator: Arc<dyn SwapAggregator>,
    retry: RetryPolicy,
    slippage_bps: u16,
    flow: SwapFlow,
}

impl SwapRouter {
    pub fn new(
        aggregator: Arc<dyn SwapAggregator>,
        retry: RetryPolicy,
        slippage_bps: u16,
        flow: SwapFlow,
    ) -> Self {
        Self {
            aggregator,
            retry,
            slippage_bps,
            flow,
        }
    }

    /// Quote an exact-input swap and fetch the payload for the top route.
    ///
    /// An empty route collection is [`BurnError::NoRouteFound`] and is not
    /// retried.
    #[instrument(skip(self), fields(input = %input_mint, output = %output_mint))]
    pub async fn get_swap_transaction(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        exact_input_amount: u64,
        user: &Pubkey,
    ) -> Result<PreparedSwap, BurnError> {
        let request = QuoteRequest {
            input_mint: *input_mint,
            output_mint: *output_mint,
            amount: exact_input_amount,
            slippage_bps: self.slippage_bps,
        };
        let quote = self
            .retry
            .execute("quote", || self.aggregator.quote(&request))
            .await?;

        let routes = NonEmpty::from_vec(quote.routes).ok_or_else(|| BurnError::NoRouteFound {
            input: input_mint.to_string(),
            output: output_mint.to_string(),
            amount: exact_input_amount,
        })?;
        let route = routes.head;
        info!(
            "Selected top route (expected out: {})",
            route
                .out_amount()
                .map(|amount| amount.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        let payload = self
            .retry
            .execute("swap_payload", || {
                self.aggregator.swap_payload(&route, user, self.flow)
            })
            .await?;

        Ok(PreparedSwap { route, payload })
    }
}
