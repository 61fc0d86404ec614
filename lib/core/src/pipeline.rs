//! Streaming match pipeline.
//!
//! The pipeline runs in two phases. [`MatchPipeline::prepare`] does all
//! the work that can fail for the request as a whole: synthesizing the
//! ideal listing and conversation summary, embedding the summary,
//! retrieving candidates and filtering them. [`MatchPipeline::stream`]
//! then scores the prepared candidates concurrently and emits events on
//! a channel. Splitting the phases lets callers return an upfront error
//! instead of a broken stream.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::conversation::Message;
use crate::error::Result;
use crate::filter::filter_listings;
use crate::listing::{IdealCriteria, Listing, ListingScore, MatchEvent, ScoredMatch};

/// Language model operations the pipeline depends on.
#[async_trait]
pub trait MatchProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn summarize(&self, conversation: &[Message]) -> Result<String>;
    async fn ideal_criteria(&self, conversation: &[Message]) -> Result<IdealCriteria>;
    async fn score_listing(
        &self,
        summary: &str,
        ideal: &IdealCriteria,
        listing: &Listing,
    ) -> Result<ListingScore>;
}

/// Vector search over the listing index.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<Listing>>;
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Candidates to pull from the store before filtering.
    pub top_k: usize,
    /// Cap on candidates sent to the scoring model. `None` scores all
    /// filtered candidates.
    pub max_scored: Option<usize>,
    /// Event channel capacity.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 50,
            max_scored: Some(15),
            channel_capacity: 64,
        }
    }
}

/// Everything needed to stream scores, produced by the fallible phase.
#[derive(Debug)]
pub struct PreparedSearch {
    pub ideal: IdealCriteria,
    pub summary: String,
    pub candidates: Vec<Listing>,
}

pub struct MatchPipeline {
    provider: Arc<dyn MatchProvider>,
    store: Arc<dyn CandidateStore>,
    config: PipelineConfig,
}

impl MatchPipeline {
    pub fn new(
        provider: Arc<dyn MatchProvider>,
        store: Arc<dyn CandidateStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Runs the setup stages. Any failure here is fatal for the request.
    pub async fn prepare(&self, conversation: &[Message]) -> Result<PreparedSearch> {
        let (ideal, summary) = tokio::try_join!(
            self.provider.ideal_criteria(conversation),
            self.provider.summarize(conversation),
        )?;
        debug!(?ideal, "synthesized ideal listing");

        let embedding = self.provider.embed(&summary).await?;
        let retrieved = self.store.search(&embedding, self.config.top_k).await?;
        info!(retrieved = retrieved.len(), "retrieved candidates");

        let mut candidates = filter_listings(&retrieved, &ideal);
        if let Some(cap) = self.config.max_scored {
            candidates.truncate(cap);
        }
        info!(candidates = candidates.len(), "candidates after hard filter");

        Ok(PreparedSearch {
            ideal,
            summary,
            candidates,
        })
    }

    /// Scores the prepared candidates concurrently. Events arrive in
    /// completion order, bracketed by `Init` and `Done`. Dropping the
    /// receiver cancels the remaining work.
    pub fn stream(&self, prepared: PreparedSearch) -> mpsc::Receiver<MatchEvent> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let provider = Arc::clone(&self.provider);
        tokio::spawn(run_scoring(provider, prepared, tx));
        rx
    }
}

async fn run_scoring(
    provider: Arc<dyn MatchProvider>,
    prepared: PreparedSearch,
    tx: mpsc::Sender<MatchEvent>,
) {
    let PreparedSearch {
        ideal,
        summary,
        candidates,
    } = prepared;

    // A failed send means the client went away; scoring tasks notice
    // the same way and stop producing.
    let _ = tx
        .send(MatchEvent::Init {
            total: candidates.len(),
            ideal_listing: ideal.clone(),
            summary: summary.clone(),
        })
        .await;

    let summary = Arc::new(summary);
    let ideal = Arc::new(ideal);
    let mut set = JoinSet::new();
    for (index, listing) in candidates.into_iter().enumerate() {
        let provider = Arc::clone(&provider);
        let summary = Arc::clone(&summary);
        let ideal = Arc::clone(&ideal);
        let tx = tx.clone();
        set.spawn(async move {
            match provider.score_listing(&summary, &ideal, &listing).await {
                Ok(score) => {
                    let _ = tx
                        .send(MatchEvent::Score {
                            matched: ScoredMatch {
                                index,
                                listing,
                                score: score.overall,
                                reasoning: score.reasoning,
                            },
                        })
                        .await;
                }
                Err(e) => {
                    // One bad candidate never breaks the stream.
                    warn!(listing = %listing.id, error = %e, "scoring failed, dropping candidate");
                }
            }
        });
    }

    while set.join_next().await.is_some() {}

    let _ = tx.send(MatchEvent::Done).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::time::Duration;

    struct StubProvider {
        fail_for: Vec<String>,
        delays_ms: Vec<u64>,
        fail_embed: bool,
    }

    impl StubProvider {
        fn ok() -> Self {
            Self {
                fail_for: Vec::new(),
                delays_ms: Vec::new(),
                fail_embed: false,
            }
        }
    }

    #[async_trait]
    impl MatchProvider for StubProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            if self.fail_embed {
                return Err(Error::Provider("embedding unavailable".to_string()));
            }
            Ok(vec![0.1, 0.2, 0.3])
        }

        async fn summarize(&self, _conversation: &[Message]) -> Result<String> {
            Ok("renter wants a pet-friendly flat".to_string())
        }

        async fn ideal_criteria(&self, _conversation: &[Message]) -> Result<IdealCriteria> {
            Ok(IdealCriteria::default())
        }

        async fn score_listing(
            &self,
            _summary: &str,
            _ideal: &IdealCriteria,
            listing: &Listing,
        ) -> Result<ListingScore> {
            if self.fail_for.contains(&listing.id) {
                return Err(Error::Provider("model refused".to_string()));
            }
            if let Some(idx) = listing.id.strip_prefix("l-").and_then(|s| s.parse::<usize>().ok()) {
                if let Some(ms) = self.delays_ms.get(idx) {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                }
            }
            Ok(ListingScore {
                overall: 80,
                reasoning: json!({"id": listing.id}),
            })
        }
    }

    struct StubStore {
        listings: Vec<Listing>,
    }

    #[async_trait]
    impl CandidateStore for StubStore {
        async fn search(&self, _embedding: &[f32], top_k: usize) -> Result<Vec<Listing>> {
            Ok(self.listings.iter().take(top_k).cloned().collect())
        }
    }

    fn listings(n: usize) -> Vec<Listing> {
        (0..n)
            .map(|i| Listing {
                id: format!("l-{i}"),
                price: Some(700),
                ..Default::default()
            })
            .collect()
    }

    async fn collect(mut rx: mpsc::Receiver<MatchEvent>) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn happy_path_brackets_scores_with_init_and_done() {
        let pipeline = MatchPipeline::new(
            Arc::new(StubProvider::ok()),
            Arc::new(StubStore {
                listings: listings(3),
            }),
            PipelineConfig::default(),
        );
        let prepared = pipeline.prepare(&[Message::user("hi")]).await.unwrap();
        let events = collect(pipeline.stream(prepared)).await;

        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], MatchEvent::Init { total: 3, .. }));
        assert!(matches!(events.last(), Some(MatchEvent::Done)));
        let scores = events
            .iter()
            .filter(|e| matches!(e, MatchEvent::Score { .. }))
            .count();
        assert_eq!(scores, 3);
    }

    #[tokio::test]
    async fn failed_candidate_is_dropped_silently() {
        let pipeline = MatchPipeline::new(
            Arc::new(StubProvider {
                fail_for: vec!["l-1".to_string()],
                delays_ms: Vec::new(),
                fail_embed: false,
            }),
            Arc::new(StubStore {
                listings: listings(3),
            }),
            PipelineConfig::default(),
        );
        let prepared = pipeline.prepare(&[Message::user("hi")]).await.unwrap();
        let events = collect(pipeline.stream(prepared)).await;

        // Init still announces all three; one score never arrives.
        assert!(matches!(events[0], MatchEvent::Init { total: 3, .. }));
        let indices: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                MatchEvent::Score { matched } => Some(matched.index),
                _ => None,
            })
            .collect();
        assert_eq!(indices.len(), 2);
        assert!(!indices.contains(&1));
        assert!(matches!(events.last(), Some(MatchEvent::Done)));
    }

    #[tokio::test]
    async fn scores_arrive_in_completion_order() {
        let pipeline = MatchPipeline::new(
            Arc::new(StubProvider {
                fail_for: Vec::new(),
                delays_ms: vec![120, 10, 60],
                fail_embed: false,
            }),
            Arc::new(StubStore {
                listings: listings(3),
            }),
            PipelineConfig::default(),
        );
        let prepared = pipeline.prepare(&[Message::user("hi")]).await.unwrap();
        let events = collect(pipeline.stream(prepared)).await;

        let indices: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                MatchEvent::Score { matched } => Some(matched.index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![1, 2, 0]);
    }

    #[tokio::test]
    async fn setup_failure_surfaces_before_any_event() {
        let pipeline = MatchPipeline::new(
            Arc::new(StubProvider {
                fail_for: Vec::new(),
                delays_ms: Vec::new(),
                fail_embed: true,
            }),
            Arc::new(StubStore {
                listings: listings(3),
            }),
            PipelineConfig::default(),
        );
        let err = pipeline.prepare(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[tokio::test]
    async fn max_scored_caps_candidates() {
        let pipeline = MatchPipeline::new(
            Arc::new(StubProvider::ok()),
            Arc::new(StubStore {
                listings: listings(40),
            }),
            PipelineConfig {
                top_k: 50,
                max_scored: Some(15),
                channel_capacity: 64,
            },
        );
        let prepared = pipeline.prepare(&[Message::user("hi")]).await.unwrap();
        assert_eq!(prepared.candidates.len(), 15);
    }

    #[tokio::test]
    async fn unbounded_scoring_when_cap_disabled() {
        let pipeline = MatchPipeline::new(
            Arc::new(StubProvider::ok()),
            Arc::new(StubStore {
                listings: listings(20),
            }),
            PipelineConfig {
                top_k: 50,
                max_scored: None,
                channel_capacity: 64,
            },
        );
        let prepared = pipeline.prepare(&[Message::user("hi")]).await.unwrap();
        assert_eq!(prepared.candidates.len(), 20);
    }
}
