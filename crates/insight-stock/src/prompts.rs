//! Prompt templates for the summary and analyst steps
//!
//! Both templates are compiled once into a shared MiniJinja environment.
//! Values are passed in already formatted so the prompt text matches what
//! the client sees in the response (e.g. `N/A`, `["headline"]`).

use crate::error::Result;
use minijinja::{Environment, context};

const SUMMARY_TEMPLATE: &str = "insight.summary";
const ANALYST_TEMPLATE: &str = "insight.analyst";

const SUMMARY_SOURCE: &str = "\
Stock Symbol: {{ symbol }}
Current Price: {{ price }}
Historical Trend: {{ timeframe }}
Latest News: {{ news }}

Please generate an AI-powered summary of this data.";

const ANALYST_SOURCE: &str = "\
You are a financial analyst providing stock insights.

Previous Conversation:
{{ history }}

Current Stock: {{ symbol }} priced at ${{ price }}.
User's Question: {{ question }}

Please analyze the data and provide a meaningful response rather than repeating previous information.";

/// Compiled prompt templates
#[derive(Debug)]
pub struct PromptSet {
    env: Environment<'static>,
}

impl PromptSet {
    /// Compile the built-in templates
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(SUMMARY_TEMPLATE, SUMMARY_SOURCE)?;
        env.add_template(ANALYST_TEMPLATE, ANALYST_SOURCE)?;
        Ok(Self { env })
    }

    /// Data summary handed to the analyst step as the question
    pub fn summary(
        &self,
        symbol: &str,
        price: &str,
        timeframe: &str,
        news: &str,
    ) -> Result<String> {
        let template = self.env.get_template(SUMMARY_TEMPLATE)?;
        Ok(template.render(context! { symbol, price, timeframe, news })?)
    }

    /// Analyst prompt with the rendered conversation history
    pub fn analyst(
        &self,
        history: &str,
        symbol: &str,
        price: &str,
        question: &str,
    ) -> Result<String> {
        let template = self.env.get_template(ANALYST_TEMPLATE)?;
        Ok(template.render(context! { history, symbol, price, question })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt() {
        let prompts = PromptSet::new().unwrap();
        let text = prompts
            .summary("AAPL", "189.5", "1y", r#"["Apple beats", "iPhone sales"]"#)
            .unwrap();

        assert_eq!(
            text,
            "Stock Symbol: AAPL\n\
             Current Price: 189.5\n\
             Historical Trend: 1y\n\
             Latest News: [\"Apple beats\", \"iPhone sales\"]\n\
             \n\
             Please generate an AI-powered summary of this data."
        );
    }

    #[test]
    fn test_analyst_prompt() {
        let prompts = PromptSet::new().unwrap();
        let text = prompts
            .analyst("User: hi\nBot: hello", "TSLA", "N/A", "What now?")
            .unwrap();

        assert!(text.starts_with("You are a financial analyst providing stock insights."));
        assert!(text.contains("Previous Conversation:\nUser: hi\nBot: hello\n"));
        assert!(text.contains("Current Stock: TSLA priced at $N/A."));
        assert!(text.contains("User's Question: What now?"));
        assert!(text.ends_with("rather than repeating previous information."));
    }

    #[test]
    fn test_values_are_not_escaped() {
        let prompts = PromptSet::new().unwrap();
        let text = prompts.summary("A&B", "<1>", "ytd", "{\"error\": \"x\"}").unwrap();
        assert!(text.contains("Stock Symbol: A&B"));
        assert!(text.contains("Current Price: <1>"));
        assert!(text.contains("Latest News: {\"error\": \"x\"}"));
    }
}
