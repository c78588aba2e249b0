//! Price-backed analysis handlers

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;

use super::{HandlerContext, IntentHandler, format_change, format_price, label, market_failure};
use crate::error::{QueryError, Result};
use crate::market::{MarketDataProvider, MarketQuote};
use crate::response::Response;

fn missing_symbol(handler: &str) -> QueryError {
    QueryError::Other(format!("{handler} handler called without a symbol"))
}

/// Single-instrument snapshot
pub struct StandardAnalysisHandler {
    market: Arc<dyn MarketDataProvider>,
}

impl StandardAnalysisHandler {
    pub fn new(market: Arc<dyn MarketDataProvider>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl IntentHandler for StandardAnalysisHandler {
    async fn handle(&self, ctx: &HandlerContext) -> Result<Response> {
        let symbol = ctx.primary_symbol().ok_or_else(|| missing_symbol("standard"))?;

        let quote = match self.market.fetch(symbol).await {
            Ok(quote) => quote,
            Err(e) => return Ok(market_failure(symbol, &e)),
        };

        let analysis = format!(
            "{} is trading at {}, {} on the session.",
            label(symbol),
            format_price(quote.price),
            format_change(quote.change_percent)
        );

        Ok(Response::StandardAnalysis {
            analysis,
            symbol: symbol.to_string(),
            data: Some(serde_json::to_value(&quote)?),
        })
    }
}

/// Short description of a daily move
pub fn trend_direction(change_percent: f64) -> &'static str {
    if change_percent >= 3.0 {
        "showing strong upward momentum"
    } else if change_percent >= 0.5 {
        "trending higher"
    } else if change_percent > -0.5 {
        "trading roughly flat"
    } else if change_percent > -3.0 {
        "drifting lower"
    } else {
        "under heavy selling pressure"
    }
}

/// Trend read with chart bookkeeping
///
/// A chart is requested when the query asked for one or the session has not
/// seen a chart for the symbol yet.
pub struct TrendAnalysisHandler {
    market: Arc<dyn MarketDataProvider>,
}

impl TrendAnalysisHandler {
    pub fn new(market: Arc<dyn MarketDataProvider>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl IntentHandler for TrendAnalysisHandler {
    async fn handle(&self, ctx: &HandlerContext) -> Result<Response> {
        let symbol = ctx.primary_symbol().ok_or_else(|| missing_symbol("trend"))?;

        let quote = match self.market.fetch(symbol).await {
            Ok(quote) => quote,
            Err(e) => return Ok(market_failure(symbol, &e)),
        };

        let already_charted = ctx
            .state
            .as_ref()
            .is_some_and(|state| state.chart_shown(symbol));
        let needs_chart = ctx.requires_chart || !already_charted;

        let mut analysis = format!(
            "{} is {}: last at {} ({} today).",
            label(symbol),
            trend_direction(quote.change_percent),
            format_price(quote.price),
            format_change(quote.change_percent)
        );
        if needs_chart {
            analysis.push_str(" The price chart is below.");
        }

        Ok(Response::TrendAnalysis {
            analysis,
            symbol: symbol.to_string(),
            needs_chart,
            data: Some(serde_json::to_value(&quote)?),
        })
    }
}

/// Side-by-side comparison of two or more instruments
pub struct ComparisonHandler {
    market: Arc<dyn MarketDataProvider>,
}

impl ComparisonHandler {
    pub fn new(market: Arc<dyn MarketDataProvider>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl IntentHandler for ComparisonHandler {
    async fn handle(&self, ctx: &HandlerContext) -> Result<Response> {
        if ctx.symbols.len() < 2 {
            return Err(QueryError::Other(
                "comparison handler needs at least two symbols".to_string(),
            ));
        }

        let fetches = ctx.symbols.iter().map(|symbol| self.market.fetch(symbol));
        let mut quotes: Vec<MarketQuote> = Vec::with_capacity(ctx.symbols.len());
        for (symbol, result) in ctx.symbols.iter().zip(join_all(fetches).await) {
            match result {
                Ok(quote) => quotes.push(quote),
                Err(e) => return Ok(market_failure(symbol, &e)),
            }
        }

        let best = quotes
            .iter()
            .max_by(|a, b| a.change_percent.total_cmp(&b.change_percent))
            .map(|quote| quote.symbol.clone());

        let mut lines: Vec<String> = quotes
            .iter()
            .map(|quote| {
                format!(
                    "{}: {} ({})",
                    label(&quote.symbol),
                    format_price(quote.price),
                    format_change(quote.change_percent)
                )
            })
            .collect();
        if let Some(best) = &best {
            lines.push(format!("{best} is the stronger performer today."));
        }

        Ok(Response::Comparison {
            response: lines.join("\n"),
            symbols: ctx.symbols.clone(),
            data: Some(json!({
                "quotes": quotes,
                "bestPerformer": best,
            })),
        })
    }
}
