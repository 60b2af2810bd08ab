//! Insight orchestration
//!
//! [`InsightOrchestrator::handle`] gathers the real-time price, a rendered
//! trend chart and the latest headlines for a symbol, records the exchange in
//! the shared conversation history and asks the language model for a summary.
//! Provider failures are substituted in-band (see [`crate::policy`]) so a
//! request always produces a complete [`InsightResponse`].

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use insight_llm::providers::{
    HuggingFaceConfig, HuggingFaceProvider, OpenAIConfig, OpenAIProvider,
};
use insight_llm::{CompletionRequest, LLMProvider, Message};
use tracing::{debug, info, instrument};

use crate::api::{MarketDataProvider, NewsApiClient, NewsProvider, YahooFinanceClient};
use crate::chart::{ChartRenderer, PngChartRenderer};
use crate::config::{InsightConfig, LlmBackend};
use crate::conversation::{ChatMessage, ConversationStore};
use crate::error::Result;
use crate::model::{InsightResponse, RealTimePrice, StockQuery, TrendChart};
use crate::policy::{resolve_news, resolve_price, resolve_summary, resolve_trend};
use crate::prompts::PromptSet;

/// Coordinates the providers behind a "get insights" request
pub struct InsightOrchestrator {
    market: Arc<dyn MarketDataProvider>,
    news: Arc<dyn NewsProvider>,
    chart: Arc<dyn ChartRenderer>,
    llm: Arc<dyn LLMProvider>,
    store: Arc<ConversationStore>,
    prompts: PromptSet,
    config: InsightConfig,
}

impl InsightOrchestrator {
    /// Create an orchestrator from explicit collaborators
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        news: Arc<dyn NewsProvider>,
        chart: Arc<dyn ChartRenderer>,
        llm: Arc<dyn LLMProvider>,
        store: Arc<ConversationStore>,
        config: InsightConfig,
    ) -> Result<Self> {
        Ok(Self {
            market,
            news,
            chart,
            llm,
            store,
            prompts: PromptSet::new()?,
            config,
        })
    }

    /// Wire up the production providers described by `config`
    pub fn from_config(config: InsightConfig) -> Result<Self> {
        let market = YahooFinanceClient::new(config.request_timeout)?;
        let news = NewsApiClient::new(config.news_api_key.clone(), config.request_timeout)?
            .with_api_base(config.news_api_base.clone());
        let llm = build_llm(&config)?;
        let store = ConversationStore::new(config.history_capacity);

        info!(
            llm = llm.name(),
            model = %config.llm_model,
            history_capacity = config.history_capacity,
            "Insight orchestrator configured"
        );

        Self::new(
            Arc::new(market),
            Arc::new(news),
            Arc::new(PngChartRenderer::from_config(&config)),
            llm,
            Arc::new(store),
            config,
        )
    }

    /// Shared conversation history
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Answer a "get insights" request
    ///
    /// Never fails: each provider failure becomes a placeholder or an
    /// `{"error": ...}` value in the corresponding response field.
    #[instrument(skip_all, fields(symbol = %query.symbol, timeframe = %query.timeframe))]
    pub async fn handle(&self, query: &StockQuery) -> InsightResponse {
        info!("Handling insight request");

        let real_time_price = resolve_price(self.market.latest_price(&query.symbol).await);
        let historical_trend = resolve_trend(self.trend_chart(query).await);
        let latest_news = resolve_news(self.headlines(&query.symbol).await);

        // The raw news result is recorded as the bot's turn before any AI text exists
        self.store
            .append_exchange(
                ChatMessage::user(query.user_message.as_str()),
                ChatMessage::bot(&latest_news),
            )
            .await;

        let summary = async {
            let question = self.prompts.summary(
                &query.symbol,
                &real_time_price.to_string(),
                query.timeframe.as_str(),
                &latest_news.to_string(),
            )?;
            self.ask_analyst(&question, &query.symbol, &real_time_price)
                .await
        };
        let ai_summary = resolve_summary(summary.await);

        let conversation_history = self.store.snapshot().await;
        info!(history_len = conversation_history.len(), "Insight request complete");

        InsightResponse {
            symbol: query.symbol.clone(),
            real_time_price,
            historical_trend,
            latest_news,
            ai_summary,
            conversation_history,
        }
    }

    /// Ask the language model, with the conversation so far as context
    ///
    /// On success the question and the trimmed answer are appended to the
    /// history as one exchange. On failure nothing is appended.
    pub async fn ask_analyst(
        &self,
        question: &str,
        symbol: &str,
        price: &RealTimePrice,
    ) -> Result<String> {
        let history = self.store.format_for_prompt().await;
        let prompt = self
            .prompts
            .analyst(&history, symbol, &price.to_string(), question)?;

        let request = CompletionRequest::new(&self.config.llm_model)
            .with_message(Message::user(prompt))
            .with_max_tokens(self.config.max_new_tokens);

        let response = self.llm.complete(request).await?;
        let answer = response.text().trim().to_string();
        debug!(
            provider = self.llm.name(),
            stop_reason = ?response.stop_reason,
            usage = ?response.usage,
            chars = answer.chars().count(),
            "Analyst answered"
        );

        self.store
            .append_exchange(ChatMessage::user(question), ChatMessage::bot(answer.as_str()))
            .await;

        Ok(answer)
    }

    async fn trend_chart(&self, query: &StockQuery) -> Result<TrendChart> {
        let series = self
            .market
            .price_history(&query.symbol, query.timeframe)
            .await?;
        let png = self.chart.render(&query.symbol, query.timeframe, &series)?;

        // price_history never returns an empty series; render rejects one too
        let latest_price = series.last().map_or(f64::NAN, |p| p.close);

        Ok(TrendChart {
            trend_plot: STANDARD.encode(png),
            latest_price,
            series,
        })
    }

    async fn headlines(&self, symbol: &str) -> Result<Vec<String>> {
        let articles = self.news.latest_articles(symbol).await?;
        Ok(articles
            .into_iter()
            .take(self.config.max_headlines)
            .filter_map(|a| a.title)
            .collect())
    }
}

fn build_llm(config: &InsightConfig) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.llm_backend {
        LlmBackend::HuggingFace => {
            let mut hf = HuggingFaceConfig::new(config.llm_api_key.clone())
                .with_timeout(config.llm_timeout);
            if let Some(base) = &config.llm_api_base {
                hf = hf.with_api_base(base.clone());
            }
            Arc::new(HuggingFaceProvider::with_config(hf)?)
        }
        LlmBackend::OpenAI => {
            let mut openai = OpenAIConfig::new(config.llm_api_key.clone())
                .with_timeout(config.llm_timeout);
            if let Some(base) = &config.llm_api_base {
                openai = openai.with_api_base(base.clone());
            }
            Arc::new(OpenAIProvider::with_config(openai)?)
        }
    };

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockMarketDataProvider, MockNewsProvider};
    use crate::chart::MockChartRenderer;
    use crate::conversation::{ChatRole, MessageContent};
    use crate::error::StockError;
    use crate::model::{ErrorValue, LatestNews, NewsArticle, PricePoint, Timeframe};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use insight_llm::{CompletionResponse, LLMError, StopReason};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    /// Language model stub that records prompts and fails on demand
    #[derive(Default)]
    struct StubLlm {
        reply: Option<String>,
        fail_when: Option<&'static str>,
        calls: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl StubLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl LLMProvider for StubLlm {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> insight_llm::Result<CompletionResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let prompt = request.flattened_prompt();
            self.requests.lock().unwrap().push(request);

            let fail = self.fail_when.is_some_and(|needle| prompt.contains(needle));
            match (&self.reply, fail) {
                (Some(text), false) => Ok(CompletionResponse {
                    message: Message::assistant(text.clone()),
                    stop_reason: StopReason::EndTurn,
                    usage: None,
                }),
                _ => Err(LLMError::ModelLoading("model is currently loading".to_string())),
            }
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    struct StubMarket {
        series: Vec<PricePoint>,
    }

    #[async_trait]
    impl MarketDataProvider for StubMarket {
        async fn latest_price(&self, _symbol: &str) -> Result<f64> {
            Ok(self.series.last().map_or(0.0, |p| p.close))
        }

        async fn price_history(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
        ) -> Result<Vec<PricePoint>> {
            Ok(self.series.clone())
        }
    }

    struct StubNews {
        count: usize,
    }

    #[async_trait]
    impl NewsProvider for StubNews {
        async fn latest_articles(&self, symbol: &str) -> Result<Vec<NewsArticle>> {
            Ok(articles(symbol, self.count))
        }
    }

    fn articles(symbol: &str, count: usize) -> Vec<NewsArticle> {
        (1..=count)
            .map(|i| NewsArticle {
                title: Some(format!("{symbol} headline {i}")),
                description: None,
                url: None,
                published_at: None,
            })
            .collect()
    }

    fn series(len: usize) -> Vec<PricePoint> {
        let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        (0..len)
            .map(|i| PricePoint {
                timestamp: start + Duration::days(i as i64),
                close: 150.0 + i as f64,
            })
            .collect()
    }

    fn orchestrator(
        market: impl MarketDataProvider + 'static,
        news: impl NewsProvider + 'static,
        chart: impl ChartRenderer + 'static,
        llm: Arc<StubLlm>,
    ) -> InsightOrchestrator {
        InsightOrchestrator::new(
            Arc::new(market),
            Arc::new(news),
            Arc::new(chart),
            llm,
            Arc::new(ConversationStore::unbounded()),
            InsightConfig::default(),
        )
        .unwrap()
    }

    fn query(user_message: &str) -> StockQuery {
        StockQuery::new("AAPL", Timeframe::OneYear, user_message)
    }

    #[tokio::test]
    async fn test_market_failure_gives_placeholder_price() {
        let mut market = MockMarketDataProvider::new();
        market.expect_latest_price().times(1).returning(|_| {
            Err(StockError::ProviderUnavailable {
                provider: "yahoo-finance",
                reason: "connection reset".to_string(),
            })
        });
        market.expect_price_history().times(1).returning(|symbol, _| {
            Err(StockError::DataAbsent {
                symbol: symbol.to_string(),
                reason: "no quotes".to_string(),
            })
        });
        let mut chart = MockChartRenderer::new();
        chart.expect_render().times(0);

        let llm = Arc::new(StubLlm::replying("Hold."));
        let orch = orchestrator(market, StubNews { count: 2 }, chart, Arc::clone(&llm));

        let response = orch.handle(&query("How is it doing?")).await;

        assert_eq!(response.real_time_price, RealTimePrice::unavailable());
        assert!(response.historical_trend.chart().is_none());
        assert_eq!(response.ai_summary.text(), Some("Hold."));

        let prompt = llm.requests.lock().unwrap()[0].flattened_prompt();
        assert!(prompt.contains("Current Stock: AAPL priced at $N/A."));
        assert!(prompt.contains("Current Price: N/A"));
    }

    #[tokio::test]
    async fn test_keeps_first_five_headlines_in_order() {
        let mut news = MockNewsProvider::new();
        news.expect_latest_articles()
            .withf(|symbol| symbol == "AAPL")
            .times(1)
            .returning(|symbol| Ok(articles(symbol, 6)));

        let orch = orchestrator(
            StubMarket { series: series(5) },
            news,
            PngChartRenderer::default(),
            Arc::new(StubLlm::replying("ok")),
        );

        let response = orch.handle(&query("news?")).await;
        let expected: Vec<String> = (1..=5).map(|i| format!("AAPL headline {i}")).collect();
        assert_eq!(response.latest_news, LatestNews::Headlines(expected));
    }

    #[tokio::test]
    async fn test_skips_untitled_articles() {
        let mut news = MockNewsProvider::new();
        news.expect_latest_articles().times(1).returning(|symbol| {
            let mut list = articles(symbol, 3);
            list[1].title = None;
            Ok(list)
        });

        let orch = orchestrator(
            StubMarket { series: series(5) },
            news,
            PngChartRenderer::default(),
            Arc::new(StubLlm::replying("ok")),
        );

        let response = orch.handle(&query("news?")).await;
        assert_eq!(
            response.latest_news,
            LatestNews::Headlines(vec![
                "AAPL headline 1".to_string(),
                "AAPL headline 3".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn test_series_matches_provider_for_one_year() {
        let mut market = MockMarketDataProvider::new();
        market.expect_latest_price().returning(|_| Ok(401.0));
        market
            .expect_price_history()
            .withf(|symbol, timeframe| symbol == "AAPL" && *timeframe == Timeframe::OneYear)
            .times(1)
            .returning(|_, _| Ok(series(252)));
        let mut chart = MockChartRenderer::new();
        chart
            .expect_render()
            .withf(|symbol, timeframe, points| {
                symbol == "AAPL" && *timeframe == Timeframe::OneYear && points.len() == 252
            })
            .times(1)
            .returning(|_, _, _| Ok(PNG_SIGNATURE.to_vec()));

        let llm = Arc::new(StubLlm::replying("ok"));
        let orch = orchestrator(market, StubNews { count: 1 }, chart, llm);
        let response = orch.handle(&query("trend?")).await;

        let trend = response.historical_trend.chart().unwrap();
        assert_eq!(trend.series.len(), 252);
        assert_eq!(trend.latest_price, 150.0 + 251.0);
        assert_eq!(response.real_time_price, RealTimePrice::Value(401.0));
    }

    #[tokio::test]
    async fn test_trend_plot_decodes_to_png() {
        let orch = orchestrator(
            StubMarket { series: series(40) },
            StubNews { count: 3 },
            PngChartRenderer::default(),
            Arc::new(StubLlm::replying("ok")),
        );

        let response = orch.handle(&query("chart?")).await;
        let encoded = &response.historical_trend.chart().unwrap().trend_plot;
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(bytes[..8], PNG_SIGNATURE);
    }

    #[tokio::test]
    async fn test_successful_request_appends_two_exchanges() {
        let llm = Arc::new(StubLlm::replying("  Apple looks steady.\n"));
        let orch = orchestrator(
            StubMarket { series: series(3) },
            StubNews { count: 2 },
            PngChartRenderer::default(),
            Arc::clone(&llm),
        );

        let response = orch.handle(&query("Should I buy?")).await;
        assert_eq!(response.ai_summary.text(), Some("Apple looks steady."));

        let history = &response.conversation_history;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], ChatMessage::user("Should I buy?"));
        assert_eq!(
            history[1],
            ChatMessage::bot(MessageContent::Headlines(vec![
                "AAPL headline 1".to_string(),
                "AAPL headline 2".to_string(),
            ]))
        );
        // The constructed summary prompt, not the user's question, is stored as the user turn
        assert_eq!(history[2].role, ChatRole::User);
        let summary_prompt = history[2].content.to_string();
        assert!(summary_prompt.starts_with(
            "Stock Symbol: AAPL\nCurrent Price: 152\nHistorical Trend: 1y\n"
        ));
        assert!(summary_prompt.ends_with("Please generate an AI-powered summary of this data."));
        assert_eq!(history[3], ChatMessage::bot("Apple looks steady."));

        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 250);
        let prompt = requests[0].flattened_prompt();
        assert!(prompt.contains(concat!(
            "Previous Conversation:\nUser: Should I buy?\n",
            "Bot: [\"AAPL headline 1\", \"AAPL headline 2\"]\n",
        )));
        assert!(prompt.contains(&format!("User's Question: {summary_prompt}")));
    }

    #[tokio::test]
    async fn test_llm_failure_gives_error_summary_and_two_appends() {
        let llm = Arc::new(StubLlm::failing());
        let orch = orchestrator(
            StubMarket { series: series(3) },
            StubNews { count: 2 },
            PngChartRenderer::default(),
            Arc::clone(&llm),
        );

        let response = orch.handle(&query("Anything?")).await;

        assert!(response.ai_summary.text().is_none());
        assert_eq!(response.conversation_history.len(), 2);
        assert_eq!(orch.store().len().await, 2);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_news_failure_is_recorded_as_bot_error() {
        let mut news = MockNewsProvider::new();
        news.expect_latest_articles().times(1).returning(|_| {
            Err(StockError::ProviderRejected {
                provider: "newsapi",
                status: 401,
                reason: "Failed to fetch news".to_string(),
            })
        });

        let orch = orchestrator(
            StubMarket { series: series(3) },
            news,
            PngChartRenderer::default(),
            Arc::new(StubLlm::failing()),
        );
        let response = orch.handle(&query("news?")).await;

        let error = ErrorValue::new("Failed to fetch news");
        assert_eq!(response.latest_news, LatestNews::Failed(error.clone()));
        assert_eq!(
            response.conversation_history[1],
            ChatMessage::bot(MessageContent::Error(error))
        );
    }

    #[tokio::test]
    async fn test_history_is_replayed_into_later_prompts() {
        let llm = Arc::new(StubLlm::replying("first answer"));
        let orch = orchestrator(
            StubMarket { series: series(3) },
            StubNews { count: 1 },
            PngChartRenderer::default(),
            Arc::clone(&llm),
        );

        orch.handle(&query("one")).await;
        let response = orch.handle(&query("two")).await;

        assert_eq!(response.conversation_history.len(), 8);
        let requests = llm.requests.lock().unwrap();
        let second = requests[1].flattened_prompt();
        assert!(second.contains("User: one\n"));
        assert!(second.contains("Bot: first answer\nUser: two\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_lose_no_appends() {
        let llm = Arc::new(StubLlm {
            reply: Some("fine".to_string()),
            fail_when: Some("Current Stock: FAIL"),
            ..StubLlm::default()
        });
        let orch = Arc::new(orchestrator(
            StubMarket { series: series(3) },
            StubNews { count: 2 },
            PngChartRenderer::new(200, 120, 0),
            llm,
        ));

        let requests = 16;
        let handles: Vec<_> = (0..requests)
            .map(|i| {
                let orch = Arc::clone(&orch);
                let symbol = if i % 2 == 0 { format!("OK{i}") } else { format!("FAIL{i}") };
                let query = StockQuery::new(symbol, Timeframe::OneMonth, format!("question {i}"));
                tokio::spawn(async move { orch.handle(&query).await })
            })
            .collect();

        let mut expected = 0;
        for handle in futures::future::join_all(handles).await {
            let response = handle.unwrap();
            expected += if response.ai_summary.text().is_some() { 4 } else { 2 };
        }

        assert_eq!(expected, 8 * 4 + 8 * 2);
        assert_eq!(orch.store().len().await, expected);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_answer_length_logged_in_characters() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let orch = orchestrator(
            StubMarket { series: series(5) },
            StubNews { count: 1 },
            PngChartRenderer::default(),
            Arc::new(StubLlm::replying("Été ok!")),
        );
        orch.ask_analyst("Q?", "AAPL", &RealTimePrice::Value(1.0))
            .await
            .unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("chars=7"), "{output}");
    }
}
