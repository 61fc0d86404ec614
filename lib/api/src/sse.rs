//! Server-sent event framing for the match stream.

use actix_web::error::ErrorInternalServerError;
use bytes::Bytes;
use futures_util::stream::{unfold, Stream};
use tokio::sync::mpsc;

use flatmatch_core::MatchEvent;

/// Frames one event as an SSE data line.
pub fn event_frame(event: &MatchEvent) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

/// Adapts the pipeline's event channel into an actix body stream. The
/// stream ends when the pipeline drops its sender after `done`.
pub fn event_stream(
    rx: mpsc::Receiver<MatchEvent>,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let frame = event_frame(&event).map_err(ErrorInternalServerError);
        Some((frame, rx))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatmatch_core::IdealCriteria;

    #[test]
    fn frame_is_a_data_line() {
        let frame = event_frame(&MatchEvent::Done).unwrap();
        assert_eq!(&frame[..], b"data: {\"type\":\"done\"}\n\n");
    }

    #[test]
    fn init_frame_carries_payload() {
        let frame = event_frame(&MatchEvent::Init {
            total: 2,
            ideal_listing: IdealCriteria::default(),
            summary: "two-bed near a park".to_string(),
        })
        .unwrap();
        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("data: {"));
        assert!(text.ends_with("\n\n"));
        assert!(text.contains("\"total\":2"));
        assert!(text.contains("two-bed near a park"));
    }

    #[tokio::test]
    async fn stream_ends_when_sender_drops() {
        use futures_util::StreamExt;

        let (tx, rx) = mpsc::channel(4);
        tx.send(MatchEvent::Done).await.unwrap();
        drop(tx);

        let frames: Vec<_> = event_stream(rx).collect().await;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_ok());
    }
}
