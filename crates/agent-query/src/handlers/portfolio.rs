//! Portfolio valuation

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;

use super::{HandlerContext, IntentHandler, format_change, format_price};
use crate::error::Result;
use crate::market::MarketDataProvider;
use crate::response::Response;

/// Weight above which a single position is flagged
pub const CONCENTRATION_WARNING_WEIGHT: f64 = 0.40;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Position {
    symbol: String,
    quantity: f64,
    price: f64,
    value: f64,
    weight: f64,
    change_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    gain: Option<f64>,
}

/// Values the caller's holdings at current prices
pub struct PortfolioHandler {
    market: Arc<dyn MarketDataProvider>,
}

impl PortfolioHandler {
    pub fn new(market: Arc<dyn MarketDataProvider>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl IntentHandler for PortfolioHandler {
    async fn handle(&self, ctx: &HandlerContext) -> Result<Response> {
        let Some(portfolio) = ctx.portfolio.as_ref().filter(|p| !p.is_empty()) else {
            return Ok(Response::PortfolioAnalysis {
                response: "I don't have your holdings yet. Share the symbols and quantities \
                           you own and I'll review allocation and risk."
                    .to_string(),
                symbols: Vec::new(),
                data: ctx.portfolio_metrics.clone().map(|m| json!({ "metrics": m })),
            });
        };

        let fetches = portfolio
            .holdings
            .iter()
            .map(|holding| self.market.fetch(&holding.symbol));
        let results = join_all(fetches).await;

        let mut positions = Vec::with_capacity(portfolio.holdings.len());
        let mut unpriced = Vec::new();
        for (holding, result) in portfolio.holdings.iter().zip(results) {
            match result {
                Ok(quote) => {
                    let value = holding.quantity * quote.price;
                    positions.push(Position {
                        symbol: holding.symbol.clone(),
                        quantity: holding.quantity,
                        price: quote.price,
                        value,
                        weight: 0.0,
                        change_percent: quote.change_percent,
                        gain: holding.cost_basis.map(|cost| value - cost),
                    });
                }
                Err(e) => {
                    tracing::warn!(symbol = %holding.symbol, error = %e, "Skipping unpriced holding");
                    unpriced.push(holding.symbol.clone());
                }
            }
        }

        if positions.is_empty() {
            let symbol = unpriced.first().cloned();
            return Ok(Response::error(
                "I couldn't price any of your holdings right now. Please try again in a moment.",
                symbol,
            ));
        }

        let total: f64 = positions.iter().map(|p| p.value).sum();
        if total > 0.0 {
            for position in &mut positions {
                position.weight = position.value / total;
            }
        }
        positions.sort_by(|a, b| b.value.total_cmp(&a.value));

        let mut lines = vec![format!(
            "Your portfolio is worth {} across {} priced positions.",
            format_price(total),
            positions.len()
        )];
        for position in &positions {
            lines.push(format!(
                "{}: {} ({:.1}% of the portfolio, {} today)",
                position.symbol,
                format_price(position.value),
                position.weight * 100.0,
                format_change(position.change_percent)
            ));
        }
        if let Some(top) = positions
            .iter()
            .find(|p| p.weight > CONCENTRATION_WARNING_WEIGHT)
        {
            lines.push(format!(
                "{} makes up {:.0}% of your holdings; that is a concentrated position.",
                top.symbol,
                top.weight * 100.0
            ));
        }
        if !unpriced.is_empty() {
            lines.push(format!("No price available for {}.", unpriced.join(", ")));
        }

        Ok(Response::PortfolioAnalysis {
            response: lines.join("\n"),
            symbols: portfolio.symbols(),
            data: Some(json!({
                "totalValue": total,
                "positions": positions,
                "unpriced": unpriced,
                "metrics": ctx.portfolio_metrics,
            })),
        })
    }
}
