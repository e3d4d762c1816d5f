use analysis_core::AnalysisError;

/// Trim and upper-case a ticker, rejecting blanks.
pub fn normalize_stock_symbol(symbol: &str) -> Result<String, AnalysisError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AnalysisError::InvalidSymbol("symbol must not be empty".to_string()));
    }
    Ok(symbol)
}

/// `btc` → `BTC/USD`; a symbol that already names its quote (`ETH/EUR`, `ETH-EUR`)
/// keeps it.
pub fn normalize_crypto_symbol(symbol: &str, quote_currency: &str) -> Result<String, AnalysisError> {
    let symbol = normalize_stock_symbol(symbol)?;
    let quote = quote_currency.trim().to_uppercase();

    let pair = match symbol.split_once(['/', '-']) {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() => format!("{}/{}", base, quote),
        Some(_) => {
            return Err(AnalysisError::InvalidSymbol(format!("malformed pair: {}", symbol)));
        }
        None if quote.is_empty() => {
            return Err(AnalysisError::InvalidSymbol("quote currency must not be empty".to_string()));
        }
        None => format!("{}/{}", symbol, quote),
    };
    Ok(pair)
}

/// Exchange product id for a `BASE/QUOTE` pair (`BTC/USD` → `BTC-USD`)
pub fn product_id(pair: &str) -> String {
    pair.replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_quote_currency() {
        assert_eq!(normalize_crypto_symbol(" btc ", "usd").unwrap(), "BTC/USD");
    }

    #[test]
    fn test_keeps_existing_quote() {
        assert_eq!(normalize_crypto_symbol("eth/eur", "USD").unwrap(), "ETH/EUR");
        assert_eq!(normalize_crypto_symbol("SOL-USDT", "USD").unwrap(), "SOL/USDT");
    }

    #[test]
    fn test_rejects_blank_and_malformed() {
        assert!(matches!(normalize_crypto_symbol("  ", "USD"), Err(AnalysisError::InvalidSymbol(_))));
        assert!(normalize_crypto_symbol("BTC/", "USD").is_err());
        assert!(normalize_stock_symbol("").is_err());
    }

    #[test]
    fn test_product_id() {
        assert_eq!(product_id("BTC/USD"), "BTC-USD");
    }

    #[test]
    fn test_stock_symbol_uppercased() {
        assert_eq!(normalize_stock_symbol(" aapl").unwrap(), "AAPL");
    }
}
