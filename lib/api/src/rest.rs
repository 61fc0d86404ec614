use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use flatmatch_core::{HardRule, MatchPipeline, Message, Role};
use flatmatch_provider::OpenAiClient;

use crate::{chat, sse};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MatchPipeline>,
    pub provider: Arc<OpenAiClient>,
}

#[derive(Deserialize)]
struct ConversationRequest {
    conversation: Vec<Message>,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    conversation_history: Vec<Message>,
}

#[derive(Serialize)]
struct ChatResponse {
    #[serde(rename = "assistantMessage")]
    assistant_message: String,
    #[serde(rename = "searchSuggested")]
    search_suggested: bool,
    #[serde(rename = "hardRules")]
    hard_rules: Vec<HardRule>,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(state: AppState, bind: String) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(state.clone()))
                .route("/health", web::get().to(health))
                .route("/api/chat", web::post().to(chat_turn))
                .route(
                    "/api/find-matches-stream",
                    web::post().to(find_matches_stream),
                )
        })
        .bind(bind)?
        .run()
        .await
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "healthy"}))
}

/// Setup errors surface as a JSON error before any bytes of the stream
/// are written; once streaming starts the protocol is init, scores in
/// completion order, done.
async fn find_matches_stream(
    state: web::Data<AppState>,
    request: web::Json<ConversationRequest>,
) -> HttpResponse {
    let prepared = match state.pipeline.prepare(&request.conversation).await {
        Ok(prepared) => prepared,
        Err(e) => {
            error!(error = %e, "match preparation failed");
            return HttpResponse::BadGateway().json(json!({"error": e.to_string()}));
        }
    };

    let rx = state.pipeline.stream(prepared);
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .streaming(sse::event_stream(rx))
}

/// Stateless chat turn: extracts hard rules from everything the user
/// has said, then generates the assistant's reply.
async fn chat_turn(state: web::Data<AppState>, request: web::Json<ChatRequest>) -> HttpResponse {
    let user_text = all_user_text(&request.conversation_history, &request.message);
    let rules = match state.provider.extract_rules(&user_text, &[]).await {
        Ok(rules) => rules,
        Err(e) => {
            error!(error = %e, "rule extraction failed");
            return HttpResponse::BadGateway().json(json!({"error": e.to_string()}));
        }
    };

    match chat::generate_response(
        &state.provider,
        &request.message,
        &request.conversation_history,
        &rules,
    )
    .await
    {
        Ok((assistant_message, search_suggested)) => HttpResponse::Ok().json(ChatResponse {
            assistant_message,
            search_suggested,
            hard_rules: rules,
        }),
        Err(e) => {
            error!(error = %e, "chat completion failed");
            HttpResponse::BadGateway().json(json!({"error": e.to_string()}))
        }
    }
}

fn all_user_text(history: &[Message], message: &str) -> String {
    let mut parts: Vec<&str> = history
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .collect();
    parts.push(message);
    parts.join(" ")
}
