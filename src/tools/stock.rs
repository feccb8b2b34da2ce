//! Stock quote tool backed by a small demonstration data set.

use async_trait::async_trait;
use chrono::Local;

use super::{str_arg, Arguments, ParamType, Tool, ToolParameter};

struct Quote {
    symbol: &'static str,
    name: &'static str,
    price: f64,
    change: f64,
    change_percent: f64,
    volume: &'static str,
    market_cap: &'static str,
    pe_ratio: f64,
    sector: &'static str,
}

const QUOTES: &[Quote] = &[
    Quote {
        symbol: "AAPL",
        name: "Apple Inc.",
        price: 175.43,
        change: 2.15,
        change_percent: 1.24,
        volume: "45.2M",
        market_cap: "$2.7T",
        pe_ratio: 28.5,
        sector: "Technology",
    },
    Quote {
        symbol: "GOOGL",
        name: "Alphabet Inc.",
        price: 142.56,
        change: -1.23,
        change_percent: -0.85,
        volume: "23.8M",
        market_cap: "$1.8T",
        pe_ratio: 25.2,
        sector: "Technology",
    },
    Quote {
        symbol: "MSFT",
        name: "Microsoft Corporation",
        price: 378.85,
        change: 5.67,
        change_percent: 1.52,
        volume: "18.9M",
        market_cap: "$2.8T",
        pe_ratio: 32.1,
        sector: "Technology",
    },
    Quote {
        symbol: "TSLA",
        name: "Tesla, Inc.",
        price: 248.42,
        change: -8.95,
        change_percent: -3.48,
        volume: "67.3M",
        market_cap: "$789B",
        pe_ratio: 45.8,
        sector: "Automotive",
    },
    Quote {
        symbol: "AMZN",
        name: "Amazon.com, Inc.",
        price: 145.24,
        change: 3.21,
        change_percent: 2.26,
        volume: "34.7M",
        market_cap: "$1.5T",
        pe_ratio: 38.9,
        sector: "Consumer Discretionary",
    },
];

pub struct StockQuote;

#[async_trait]
impl Tool for StockQuote {
    fn name(&self) -> &str {
        "stock"
    }

    fn description(&self) -> &str {
        "Get real-time stock market data, prices, and financial information."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required(
                "symbol",
                ParamType::String,
                "Stock symbol (e.g., 'AAPL', 'GOOGL', 'MSFT', 'TSLA')",
            ),
            ToolParameter::optional(
                "action",
                ParamType::String,
                "Action to perform: 'price' (current price), 'info' (company info), 'chart' (price history)",
            )
            .with_enum(["price", "info", "chart"]),
        ]
    }

    async fn execute(&self, args: &Arguments) -> anyhow::Result<String> {
        let symbol = str_arg(args, "symbol").unwrap_or_default().to_uppercase();
        let action = str_arg(args, "action").unwrap_or_else(|| "price".to_string());

        let Some(quote) = QUOTES.iter().find(|q| q.symbol == symbol) else {
            let known: Vec<&str> = QUOTES.iter().map(|q| q.symbol).collect();
            return Ok(format!(
                "Error: Stock symbol '{}' not found in demo data. Available symbols: {}",
                symbol,
                known.join(", ")
            ));
        };
        let updated = Local::now().format("%Y-%m-%d %H:%M:%S");

        Ok(match action.as_str() {
            "price" => format!(
                "{} ({})\nCurrent Price: ${:.2}\nChange: {:+.2} ({:+.2}%)\nVolume: {}\nMarket Cap: {}\nLast Updated: {}",
                quote.name,
                quote.symbol,
                quote.price,
                quote.change,
                quote.change_percent,
                quote.volume,
                quote.market_cap,
                updated
            ),
            "info" => format!(
                "Company Information: {} ({})\nCurrent Price: ${:.2}\nP/E Ratio: {:.1}\nSector: {}\nMarket Cap: {}\nVolume: {}\nLast Updated: {}",
                quote.name,
                quote.symbol,
                quote.price,
                quote.pe_ratio,
                quote.sector,
                quote.market_cap,
                quote.volume,
                updated
            ),
            "chart" => format!(
                "Price History: {} ({})\nCurrent: ${:.2}\n52-Week High: ${:.2}\n52-Week Low: ${:.2}\n30-Day Avg: ${:.2}\n90-Day Avg: ${:.2}",
                quote.name,
                quote.symbol,
                quote.price,
                quote.price * 1.15,
                quote.price * 0.85,
                quote.price * 1.02,
                quote.price * 0.98
            ),
            other => format!(
                "Error: Unknown action '{}'. Available actions: price, info, chart",
                other
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn symbol_lookup_is_case_insensitive() {
        let mut args = Arguments::new();
        args.insert("symbol".into(), json!("msft"));
        let out = StockQuote.execute(&args).await.unwrap();
        assert!(out.starts_with("Microsoft Corporation (MSFT)"));
        assert!(out.contains("Change: +5.67 (+1.52%)"));
    }

    #[tokio::test]
    async fn chart_derives_ranges_from_price() {
        let mut args = Arguments::new();
        args.insert("symbol".into(), json!("AAPL"));
        args.insert("action".into(), json!("chart"));
        let out = StockQuote.execute(&args).await.unwrap();
        assert!(out.contains("52-Week High: $201.74"));
        assert!(out.contains("52-Week Low: $149.12"));
    }

    #[tokio::test]
    async fn unknown_symbol_and_action_explain_themselves() {
        let mut args = Arguments::new();
        args.insert("symbol".into(), json!("ZZZZ"));
        let out = StockQuote.execute(&args).await.unwrap();
        assert!(out.contains("Available symbols: AAPL, GOOGL, MSFT, TSLA, AMZN"));

        args.insert("symbol".into(), json!("TSLA"));
        args.insert("action".into(), json!("forecast"));
        let out = StockQuote.execute(&args).await.unwrap();
        assert!(out.starts_with("Error: Unknown action 'forecast'"));
    }
}
