//! Handlers that need no market data

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Timelike, Utc, Weekday};
use serde_json::json;

use super::{HandlerContext, IntentHandler};
use crate::error::Result;
use crate::response::Response;

const CAPABILITIES: &str = "I can help with:\n\
- Prices and quick analysis for stocks, crypto and commodities (\"AAPL price\")\n\
- Trends and charts (\"show me the bitcoin chart\")\n\
- Comparisons (\"compare MSFT and GOOGL\")\n\
- A market overview (\"how are the markets today\")\n\
- Your portfolio's allocation and concentration\n\
- Explanations of financial terms (\"what is a P/E ratio\")";

/// Describes what the assistant can do
pub struct CapabilityHandler;

#[async_trait]
impl IntentHandler for CapabilityHandler {
    async fn handle(&self, _ctx: &HandlerContext) -> Result<Response> {
        Ok(Response::Capability {
            response: CAPABILITIES.to_string(),
        })
    }
}

/// Greets the user, picking up the session's last symbol when there is one
pub struct GreetingHandler;

#[async_trait]
impl IntentHandler for GreetingHandler {
    async fn handle(&self, ctx: &HandlerContext) -> Result<Response> {
        let lower = ctx.query.to_lowercase();
        let opener = if lower.starts_with("thank") || lower.starts_with("cheers") {
            "You're welcome!"
        } else {
            "Hello!"
        };

        let active = ctx
            .state
            .as_ref()
            .and_then(|state| state.active_symbol.as_deref());
        let response = match active {
            Some(symbol) => format!(
                "{opener} We were last looking at {symbol}. Ask for its trend, a comparison or \
                 anything else on the markets."
            ),
            None => format!(
                "{opener} Ask me about any stock, crypto or commodity, for example \"AAPL price\" \
                 or \"compare MSFT and GOOGL\"."
            ),
        };

        Ok(Response::Greeting { response })
    }
}

/// Polite refusal that steers back to finance
pub struct NonFinancialHandler;

#[async_trait]
impl IntentHandler for NonFinancialHandler {
    async fn handle(&self, _ctx: &HandlerContext) -> Result<Response> {
        Ok(Response::NonFinancial {
            response: "I focus on markets and investing, so I can't help with that one. \
                       Ask me about a stock, a crypto asset, a commodity or your portfolio."
                .to_string(),
        })
    }
}

/// Phase of the US equity trading day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSession {
    PreMarket,
    Open,
    AfterHours,
    Closed,
}

impl MarketSession {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreMarket => "pre_market",
            Self::Open => "open",
            Self::AfterHours => "after_hours",
            Self::Closed => "closed",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::PreMarket => "in pre-market trading; the regular session opens at 09:30 ET",
            Self::Open => "open; the regular session closes at 16:00 ET",
            Self::AfterHours => "in after-hours trading",
            Self::Closed => "closed",
        }
    }
}

fn dst_boundary(year: i32, month: u32, nth: u8, utc_hour: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, nth)?
        .and_hms_opt(utc_hour, 0, 0)
        .map(|naive| naive.and_utc())
}

/// New York offset from UTC
///
/// Daylight time runs from 02:00 local on the second Sunday of March to
/// 02:00 local on the first Sunday of November.
pub fn eastern_offset(now: DateTime<Utc>) -> FixedOffset {
    let year = now.year();
    let daylight = match (dst_boundary(year, 3, 2, 7), dst_boundary(year, 11, 1, 6)) {
        (Some(start), Some(end)) => now >= start && now < end,
        _ => false,
    };
    let hours = if daylight { 4 } else { 5 };
    FixedOffset::west_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}

/// US equity session at `now`, ignoring exchange holidays
pub fn market_session(now: DateTime<Utc>) -> MarketSession {
    let local = now.with_timezone(&eastern_offset(now));
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return MarketSession::Closed;
    }

    let minutes = local.hour() * 60 + local.minute();
    match minutes {
        240..570 => MarketSession::PreMarket,
        570..960 => MarketSession::Open,
        960..1200 => MarketSession::AfterHours,
        _ => MarketSession::Closed,
    }
}

/// Current date, time and US market session
pub struct DateTimeHandler;

#[async_trait]
impl IntentHandler for DateTimeHandler {
    async fn handle(&self, ctx: &HandlerContext) -> Result<Response> {
        let now = ctx.now;
        let eastern = now.with_timezone(&eastern_offset(now));
        let session = market_session(now);

        let response = format!(
            "It's {} ({} ET). US stock markets are {}.",
            now.format("%A, %B %-d, %Y, %H:%M UTC"),
            eastern.format("%H:%M"),
            session.describe()
        );

        Ok(Response::DateTime {
            response,
            data: Some(json!({
                "utc": now.to_rfc3339(),
                "eastern": eastern.to_rfc3339(),
                "weekday": now.format("%A").to_string(),
                "marketSession": session.as_str(),
            })),
        })
    }
}
