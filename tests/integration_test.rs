use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use flatmatch::prelude::*;

struct ScriptedProvider {
    ideal: IdealCriteria,
}

#[async_trait]
impl MatchProvider for ScriptedProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn summarize(&self, _conversation: &[Message]) -> Result<String> {
        Ok("Professional looking for a pet-friendly double under £700 in Hackney".to_string())
    }

    async fn ideal_criteria(&self, _conversation: &[Message]) -> Result<IdealCriteria> {
        Ok(self.ideal.clone())
    }

    async fn score_listing(
        &self,
        _summary: &str,
        _ideal: &IdealCriteria,
        listing: &Listing,
    ) -> Result<ListingScore> {
        Ok(ListingScore {
            overall: 85,
            reasoning: json!({"overall_reasoning": format!("{} fits well", listing.title)}),
        })
    }
}

fn listing(id: &str, price: i64, pets: Option<&str>) -> Listing {
    Listing {
        id: id.to_string(),
        title: format!("Room {id}"),
        price: Some(price),
        location: Some("Hackney, London".to_string()),
        pets: pets.map(str::to_string),
        ..Default::default()
    }
}

fn pipeline_with(listings: Vec<(Listing, Vec<f32>)>, ideal: IdealCriteria) -> MatchPipeline {
    let store = MemoryStore::new();
    for (l, v) in listings {
        store.add(l, v);
    }
    MatchPipeline::new(
        Arc::new(ScriptedProvider { ideal }),
        Arc::new(store),
        PipelineConfig::default(),
    )
}

#[tokio::test]
async fn conversation_to_scored_stream() {
    let ideal = IdealCriteria {
        max_rent: Some(700),
        pets_ok: Some(true),
        ..Default::default()
    };
    let pipeline = pipeline_with(
        vec![
            (listing("over-budget", 1200, Some("Yes")), vec![0.9, 0.1]),
            (listing("no-pets", 650, None), vec![0.8, 0.2]),
            (listing("match", 680, Some("Yes")), vec![0.7, 0.3]),
        ],
        ideal,
    );

    let conversation = vec![
        Message::user("I have a dog and my budget is 700 a month"),
        Message::assistant("Got it, pet-friendly under £700."),
    ];
    let prepared = pipeline.prepare(&conversation).await.unwrap();
    assert_eq!(prepared.candidates.len(), 1);
    assert_eq!(prepared.candidates[0].id, "match");

    let mut rx = pipeline.stream(prepared);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 3);
    match &events[0] {
        MatchEvent::Init { total, summary, .. } => {
            assert_eq!(*total, 1);
            assert!(summary.contains("pet-friendly"));
        }
        other => panic!("expected init, got {other:?}"),
    }
    match &events[1] {
        MatchEvent::Score { matched } => {
            assert_eq!(matched.listing.id, "match");
            assert_eq!(matched.score, 85);
            assert_eq!(matched.index, 0);
        }
        other => panic!("expected score, got {other:?}"),
    }
    assert!(matches!(events[2], MatchEvent::Done));
}

#[tokio::test]
async fn empty_store_still_closes_the_stream() {
    let pipeline = pipeline_with(Vec::new(), IdealCriteria::default());
    let prepared = pipeline
        .prepare(&[Message::user("anything")])
        .await
        .unwrap();
    let mut rx = pipeline.stream(prepared);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], MatchEvent::Init { total: 0, .. }));
    assert!(matches!(events[1], MatchEvent::Done));
}

#[tokio::test]
async fn events_serialize_for_the_wire() {
    let ideal = IdealCriteria {
        max_rent: Some(700),
        ..Default::default()
    };
    let pipeline = pipeline_with(vec![(listing("a", 650, None), vec![1.0, 0.0])], ideal);
    let prepared = pipeline.prepare(&[Message::user("under 700")]).await.unwrap();
    let mut rx = pipeline.stream(prepared);

    while let Some(event) = rx.recv().await {
        let json = serde_json::to_value(&event).unwrap();
        assert!(matches!(
            json["type"].as_str(),
            Some("init") | Some("score") | Some("done")
        ));
    }
}
