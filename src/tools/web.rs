//! Web search and news headline tools.
//!
//! Both return deterministic demonstration results; swap in a real backend by
//! registering a different tool under the same name.

use async_trait::async_trait;

use super::{count_arg, str_arg, Arguments, ParamType, Tool, ToolParameter};

const MAX_RESULTS: usize = 10;
const DEFAULT_RESULTS: usize = 5;

struct SearchHit {
    title: String,
    url: &'static str,
    snippet: String,
}

fn hit(title: &str, url: &'static str, snippet: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url,
        snippet: snippet.to_string(),
    }
}

fn canned_results(query: &str) -> Vec<SearchHit> {
    let q = query.to_lowercase();
    if q.contains("rust") {
        vec![
            hit(
                "Rust Programming Language",
                "https://www.rust-lang.org",
                "A language empowering everyone to build reliable and efficient software.",
            ),
            hit(
                "The Rust Book",
                "https://doc.rust-lang.org/book/",
                "An introductory book about Rust.",
            ),
            hit(
                "crates.io",
                "https://crates.io",
                "The Rust community's crate registry.",
            ),
        ]
    } else if q.contains("weather") {
        vec![
            hit(
                "Weather Forecasts",
                "https://weather.com",
                "Local and national weather forecasts.",
            ),
            hit(
                "National Weather Service",
                "https://www.weather.gov",
                "Official forecasts, warnings and meteorological products.",
            ),
        ]
    } else if q.contains("stock") || q.contains("market") {
        vec![
            hit(
                "Yahoo Finance",
                "https://finance.yahoo.com",
                "Stock quotes, market news and portfolio tools.",
            ),
            hit(
                "MarketWatch",
                "https://www.marketwatch.com",
                "Financial market news, stock quotes, and economic data.",
            ),
        ]
    } else {
        vec![
            hit(
                &format!("Search Results for: {}", query),
                "https://duckduckgo.com",
                &format!("Find information about {} on the web.", query),
            ),
            hit(
                "Wikipedia",
                "https://wikipedia.org",
                "Free encyclopedia with articles on various topics.",
            ),
            hit(
                "Google Search",
                "https://google.com",
                "Search the web for information and resources.",
            ),
            hit(
                "Bing Search",
                "https://bing.com",
                "Web search engine with news, images, and videos.",
            ),
            hit(
                "DuckDuckGo",
                "https://duckduckgo.com",
                "Privacy-focused search engine that doesn't track users.",
            ),
        ]
    }
}

/// Search the web.
pub struct WebSearch;

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information and real-time data."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required("query", ParamType::String, "Search query to look up on the web"),
            ToolParameter::optional(
                "num_results",
                ParamType::String,
                "Number of results to return (1-10, default: 5)",
            ),
        ]
    }

    async fn execute(&self, args: &Arguments) -> anyhow::Result<String> {
        let query = str_arg(args, "query").unwrap_or_default();
        if query.trim().is_empty() {
            return Ok("Error: query must not be empty".to_string());
        }
        let wanted = count_arg(args, "num_results", DEFAULT_RESULTS, MAX_RESULTS);

        let results = canned_results(&query);
        let shown = &results[..wanted.min(results.len())];

        let mut out = format!("Web Search Results for: {}\n\n", query);
        for (i, item) in shown.iter().enumerate() {
            out.push_str(&format!(
                "{}. {}\n   {}\n   {}\n\n",
                i + 1,
                item.title,
                item.url,
                item.snippet
            ));
        }
        out.push_str(&format!(
            "Showing {} of {} available results",
            shown.len(),
            results.len()
        ));
        Ok(out)
    }
}

struct Headline {
    title: &'static str,
    source: &'static str,
    published: &'static str,
}

const TECHNOLOGY: &[Headline] = &[
    Headline { title: "AI Breakthrough in Natural Language Processing", source: "TechNews", published: "2 hours ago" },
    Headline { title: "New Quantum Computing Milestone Achieved", source: "ScienceDaily", published: "4 hours ago" },
    Headline { title: "Major Tech Company Announces Revolutionary Product", source: "TechCrunch", published: "6 hours ago" },
    Headline { title: "Open Source Project Reaches One Million Contributors", source: "DevWeekly", published: "8 hours ago" },
];

const BUSINESS: &[Headline] = &[
    Headline { title: "Global Markets Rally on Economic Data", source: "Financial Times", published: "1 hour ago" },
    Headline { title: "Startup Funding Reaches Record High", source: "Business Insider", published: "3 hours ago" },
    Headline { title: "Central Bank Holds Interest Rates Steady", source: "Reuters", published: "5 hours ago" },
];

const SPORTS: &[Headline] = &[
    Headline { title: "Championship Final Goes to Extra Time", source: "ESPN", published: "1 hour ago" },
    Headline { title: "Record Broken at International Athletics Meet", source: "Sports Weekly", published: "3 hours ago" },
    Headline { title: "Transfer Window Closes With Surprise Signing", source: "Goal", published: "6 hours ago" },
];

const GENERAL: &[Headline] = &[
    Headline { title: "Climate Summit Reaches Historic Agreement", source: "World News", published: "1 hour ago" },
    Headline { title: "New Study Reveals Health Benefits of Walking", source: "HealthDaily", published: "3 hours ago" },
    Headline { title: "City Unveils Plan for Green Public Transport", source: "Metro", published: "5 hours ago" },
    Headline { title: "Cultural Festival Draws Record Crowds", source: "CultureMag", published: "7 hours ago" },
    Headline { title: "Space Mission Successfully Launched", source: "SpaceNews", published: "9 hours ago" },
];

/// Latest headlines by topic.
pub struct News;

#[async_trait]
impl Tool for News {
    fn name(&self) -> &str {
        "news"
    }

    fn description(&self) -> &str {
        "Get real-time news headlines and articles from various sources."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::optional(
                "topic",
                ParamType::String,
                "News topic or category (e.g., 'technology', 'business', 'sports', 'general')",
            ),
            ToolParameter::optional(
                "country",
                ParamType::String,
                "Country code for news (e.g., 'us', 'gb', 'jp') - optional",
            ),
            ToolParameter::optional(
                "count",
                ParamType::String,
                "Number of articles to fetch (1-10, default: 5)",
            ),
        ]
    }

    async fn execute(&self, args: &Arguments) -> anyhow::Result<String> {
        let topic = str_arg(args, "topic")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "general".to_string());
        let country = str_arg(args, "country")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "us".to_string());
        let wanted = count_arg(args, "count", DEFAULT_RESULTS, MAX_RESULTS);

        let headlines = match topic.to_lowercase().as_str() {
            "technology" | "tech" => TECHNOLOGY,
            "business" => BUSINESS,
            "sports" => SPORTS,
            _ => GENERAL,
        };
        let shown = &headlines[..wanted.min(headlines.len())];

        let mut out = format!(
            "Latest {} News ({}):\n\n",
            title_case(&topic),
            country.to_uppercase()
        );
        for (i, article) in shown.iter().enumerate() {
            out.push_str(&format!(
                "{}. {}\n   {} - {}\n\n",
                i + 1,
                article.title,
                article.source,
                article.published
            ));
        }
        out.push_str(&format!(
            "Showing {} of {} available articles",
            shown.len(),
            headlines.len()
        ));
        Ok(out)
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
