//! Prompt builders for the generative stages
//!
//! Every builder returns the full user prompt text; the matching system
//! instruction lives next to it. Prompts pin today's date so the model
//! never reasons from its training cutoff.

use crate::config::MarketConfig;
use chrono::{Datelike, NaiveDate, Utc};
use pulse_models::{ForecastPoint, MarketSnapshot, NewsItem, Persona};
use pulse_sources::{RawArticle, SearchHit};

/// Date context injected into every prompt.
#[derive(Debug, Clone)]
pub struct DateContext {
    pub today: NaiveDate,
}

impl DateContext {
    pub fn now() -> Self {
        Self {
            today: Utc::now().date_naive(),
        }
    }

    pub fn for_date(today: NaiveDate) -> Self {
        Self { today }
    }

    fn quarter(&self) -> u32 {
        (self.today.month0() / 3) + 1
    }

    fn context_text(&self) -> String {
        format!(
            "TODAY'S DATE CONTEXT:\n\
             - Current Date: {} ({})\n\
             - Quarter: Q{}/{}\n\n\
             IMPORTANT: Use this date for ALL time-sensitive recommendations.",
            self.today,
            self.today.weekday(),
            self.quarter(),
            self.today.year()
        )
    }
}

/// System instruction for the news scoring call.
pub fn scoring_system(market: &MarketConfig) -> String {
    format!(
        "You are a financial analyst specialized in {} markets. Analyze news and \
         score impacts for 3 regions (Global, Asia, Local/Thailand). Return \
         structured JSON with a 'news' array.",
        market.name
    )
}

/// User prompt for the news scoring call.
pub fn scoring_prompt(market: &MarketConfig, ctx: &DateContext, articles: &[RawArticle]) -> String {
    let mut news_block = String::new();
    for (idx, article) in articles.iter().enumerate() {
        let n = idx + 1;
        news_block.push_str(&format!(
            "{n}. Title: {}\n   Summary: {}\n   Publisher: {}\n   Date: {}\n   Link: {}\n   Thumbnail: {}\n",
            article.title.as_deref().unwrap_or("N/A"),
            article.summary.as_deref().unwrap_or("N/A"),
            article.provider.as_deref().unwrap_or("N/A"),
            article
                .published_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            article.link.as_deref().unwrap_or("N/A"),
            article.image_url.as_deref().unwrap_or(""),
        ));
    }

    format!(
        "You are a {} market analyst. Analyze these news articles and score their impact.\n\n\
         {}\n\n\
         News Articles:\n{news_block}\n\
         Task:\n\
         For EACH news article, provide:\n\
         1. A brief summary (1-2 sentences in Thai)\n\
         2. Impact score (0-100) for THREE regions (use lowercase: 'global', 'asia', 'local'):\n\
            - global: Impact on global {} markets\n\
            - asia: Impact on Asian markets\n\
            - local: Impact specifically on Thailand\n\
         3. Reason for each score (1 sentence in Thai)\n\n\
         Scoring Guidelines:\n\
         - 90-100: Major impact, immediate price movement expected\n\
         - 70-89: Significant impact, medium-term effects\n\
         - 40-69: Moderate impact, indirect effects\n\
         - 0-39: Minor impact, limited effects\n\n\
         Return JSON: {{\"news\": [{{\"title\", \"summary\", \"publishedDate\", \"imageUrl\", \
         \"link\", \"scores\": [{{\"region\", \"score\", \"reason\"}}]}}]}}",
        market.name_th,
        ctx.context_text(),
        market.name
    )
}

/// System instruction for the forecast extraction call.
pub fn forecast_system() -> &'static str {
    "You are a financial analyst. Extract price forecasts for different quarters. \
     Return structured JSON with a 'forecasts' array."
}

/// User prompt for the forecast extraction call.
///
/// `quarters` is the exact (label, target date) list the output must
/// cover, in order.
pub fn forecast_prompt(
    market: &MarketConfig,
    ctx: &DateContext,
    quarters: &[(String, NaiveDate)],
    hits: &[SearchHit],
) -> String {
    let mut evidence = String::new();
    for hit in hits {
        evidence.push_str(&format!(
            "- {} ({})\n  {}\n",
            hit.title,
            hit.link,
            hit.snippet.as_deref().unwrap_or("")
        ));
    }
    if evidence.is_empty() {
        evidence.push_str("(no search results available)\n");
    }

    let quarter_list = quarters
        .iter()
        .map(|(label, date)| format!("{label} (date {date})"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Extract {} price forecasts from these search results and provide actionable \
         recommendations.\n\n\
         {}\n\n\
         Search Results:\n{evidence}\n\
         Task:\n\
         Find price forecasts for exactly these four quarters: {quarter_list}.\n\
         Return exactly 4 forecasts (one per quarter, in that order).\n\n\
         For EACH forecast provide:\n\
         1. quarter: the label given above, e.g. \"{}\"\n\
         2. date: the target date given above (YYYY-MM-DD)\n\
         3. price_forecast: e.g. \"$68 per barrel\" or \"16.5 cents/lb\" or \"\u{e3f}32.5\"\n\
         4. source: where this forecast came from\n\
         5. actionRecommendation: SHORT actionable advice in Thai (1 sentence) for \
         procurement/finance teams this quarter\n\n\
         If exact forecasts are not found, make reasonable estimates based on trends and \
         say so in the source field.\n\
         Return JSON: {{\"forecasts\": [{{\"quarter\", \"date\", \"price_forecast\", \
         \"source\", \"actionRecommendation\"}}]}}",
        market.name,
        ctx.context_text(),
        quarters.first().map(|(l, _)| l.as_str()).unwrap_or("Q1/26"),
    )
}

/// System instruction for the persona recommendation call.
pub fn persona_system(market: &MarketConfig) -> String {
    format!(
        "You are a market intelligence analyst for {} ({}) markets. Produce one \
         concrete recommendation for the named audience. Answer in Thai. Return \
         structured JSON.",
        market.name_th, market.name
    )
}

/// User prompt for one persona's recommendation.
pub fn persona_prompt(
    market: &MarketConfig,
    ctx: &DateContext,
    persona: Persona,
    snapshot: &MarketSnapshot,
    forecasts: &[ForecastPoint],
    top_news: &[NewsItem],
    research: &[SearchHit],
) -> String {
    let forecast_lines = forecasts
        .iter()
        .map(|f| format!("- {} ({}): {} [{}]", f.quarter, f.date, f.price_forecast, f.source))
        .collect::<Vec<_>>()
        .join("\n");

    let news_lines = top_news
        .iter()
        .map(|n| format!("- {} (impact {})", n.title, n.max_score()))
        .collect::<Vec<_>>()
        .join("\n");

    let research_lines = research
        .iter()
        .map(|h| format!("- {}: {}", h.title, h.snippet.as_deref().unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are advising the {} audience on the {} market.\n\n\
         {}\n\n\
         Current Market Data:\n\
         Price: {:.2} {} ({:+.2}%)\n\
         30-day range: {:.2} to {:.2} ({:+.2}% over the window)\n\n\
         Price Forecasts:\n{forecast_lines}\n\n\
         Top News (sorted by impact):\n{news_lines}\n\n\
         Research Snippets:\n{research_lines}\n\n\
         Task: produce ONE recommendation for this audience with:\n\
         1. market_situation: current situation relevant to this audience (2-3 sentences, Thai)\n\
         2. power_insight: the single most decision-relevant insight (1-2 sentences, Thai)\n\
         3. action_recommendation: what to do now, specific and time-bound (1-2 sentences, Thai)\n\
         4. risk_assessment: one of \"low\", \"medium\", \"high\"\n\
         5. opportunity_level: one of \"low\", \"medium\", \"high\"\n\n\
         Return JSON: {{\"market_situation\", \"power_insight\", \"action_recommendation\", \
         \"risk_assessment\", \"opportunity_level\"}}",
        persona.audience(),
        market.name_th,
        ctx.context_text(),
        snapshot.current_price,
        snapshot.unit,
        snapshot.price_change_pct,
        snapshot.low_30d,
        snapshot.high_30d,
        snapshot.change_30d_pct,
    )
}

/// System instruction for the report rendering call.
pub fn report_system(market: &MarketConfig) -> String {
    format!(
        "You are a senior commodity strategist. Create COMPREHENSIVE, ACTIONABLE {} \
         market intelligence reports in Thai. Be SPECIFIC with numbers, dates, and \
         actions. Return structured JSON with a single 'html' field.",
        market.name_th
    )
}

/// User prompt for the full report.
pub fn report_prompt(
    market: &MarketConfig,
    ctx: &DateContext,
    snapshot: &MarketSnapshot,
    forecasts: &[ForecastPoint],
    news: &[NewsItem],
    recommendations_json: &str,
    regional_json: &str,
) -> String {
    let forecast_lines = forecasts
        .iter()
        .map(|f| format!("- {} ({}): {} [{}]", f.quarter, f.date, f.price_forecast, f.source))
        .collect::<Vec<_>>()
        .join("\n");

    let news_lines = news
        .iter()
        .take(15)
        .map(|n| format!("- {} (impact {}): {}", n.title, n.max_score(), n.summary))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a senior commodity strategist with 20+ years experience in {} ({}) markets.\n\n\
         {}\n\n\
         Create a COMPREHENSIVE {} market intelligence report.\n\n\
         Market Data:\n\
         - Price: {:.2} {} ({:+.2}%)\n\
         - Forecasts:\n{forecast_lines}\n\
         - Regional Analysis: {regional_json}\n\
         - Persona Recommendations: {recommendations_json}\n\
         - News:\n{news_lines}\n\n\
         CRITICAL: This is a PREMIUM intelligence product. Make it ACTIONABLE and SPECIFIC.\n\n\
         Required Sections:\n\
         1. Executive Summary (4-5 paragraphs with exact dates and numbers)\n\
         2. Market Situation Deep Dive (supply, demand, geopolitics)\n\
         3. Regional Impact Analysis (global, asia, local)\n\
         4. Quarterly Forecast Table with action recommendations\n\
         5. Recommendations per Audience (SME, supply chain, investor)\n\
         6. Risk Matrix\n\
         7. Action Timeline\n\n\
         Write the report in Thai as a self-contained HTML fragment.\n\
         Return JSON: {{\"html\": \"...\"}}",
        market.name_th,
        market.name,
        ctx.context_text(),
        market.name_th,
        snapshot.current_price,
        snapshot.unit,
        snapshot.price_change_pct,
    )
}
