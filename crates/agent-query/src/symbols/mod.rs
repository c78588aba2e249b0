//! Instrument symbol handling
//!
//! Symbol extraction is the highest-leverage correctness surface of the
//! resolver: a wrong symbol silently returns the wrong instrument. The pieces
//! here are deliberately conservative:
//!
//! - [`validator`]: stopword-driven plausibility checks for a single token
//! - [`fuzzy`]: single-edit correction of near-miss tickers
//! - [`extractor`]: tokenizes free text into an ordered, unique symbol list
//! - [`lexicon`]: the curated word lists behind all of the above

pub mod extractor;
pub mod fuzzy;
pub mod lexicon;
pub mod validator;

pub use extractor::{SymbolExtractor, extract_safe_symbols};
pub use fuzzy::{edit_distance, fuzzy_match};
pub use validator::{is_valid_marked_ticker, is_valid_ticker};
