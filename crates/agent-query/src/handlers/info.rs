//! Educational and company profile handlers

use std::sync::Arc;

use async_trait::async_trait;

use super::{HandlerContext, IntentHandler, format_change, format_price};
use crate::error::{QueryError, Result};
use crate::glossary;
use crate::market::MarketDataProvider;
use crate::response::Response;
use crate::symbols::lexicon::display_name;

/// Explains a financial concept from the glossary
pub struct EducationalHandler;

#[async_trait]
impl IntentHandler for EducationalHandler {
    async fn handle(&self, ctx: &HandlerContext) -> Result<Response> {
        let response = match glossary::find_term(&ctx.query.to_lowercase()) {
            Some((term, explanation)) => format!("{term}: {explanation}"),
            None => "I can explain concepts like the P/E ratio, market cap, ETFs, dividends \
                     or volatility. Which one would you like to go through?"
                .to_string(),
        };

        Ok(Response::Educational { response })
    }
}

/// Profile of a named company with its latest quote
///
/// The quote is optional here: a failed fetch still yields the profile.
pub struct CompanyInfoHandler {
    market: Arc<dyn MarketDataProvider>,
}

impl CompanyInfoHandler {
    pub fn new(market: Arc<dyn MarketDataProvider>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl IntentHandler for CompanyInfoHandler {
    async fn handle(&self, ctx: &HandlerContext) -> Result<Response> {
        let symbol = ctx.primary_symbol().ok_or_else(|| {
            QueryError::Other("company info handler called without a symbol".to_string())
        })?;

        let mut response = match display_name(symbol) {
            Some(name) => format!("{symbol} is the ticker for {name}."),
            None => format!("I don't have a company profile for {symbol}."),
        };

        let quote = match self.market.fetch(symbol).await {
            Ok(quote) => {
                response.push_str(&format!(
                    " It last traded at {} ({} today).",
                    format_price(quote.price),
                    format_change(quote.change_percent)
                ));
                Some(serde_json::to_value(&quote)?)
            }
            Err(e) => {
                tracing::debug!(symbol, error = %e, "Company profile without a quote");
                None
            }
        };

        Ok(Response::CompanyInfo {
            response,
            symbol: symbol.to_string(),
            data: quote,
        })
    }
}
