use crate::config::Config;
use crate::conversation::Message;
use crate::error::{ChatError, ChatResult};
use crate::params::GenerationParameters;
use futures::{Stream, StreamExt};
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted during LLM streaming
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    /// Text delta from streaming response, never empty
    TextDelta(String),
    /// Provider signalled the end of the reply
    StreamComplete,
    /// Stream broke off; no further events follow
    Error(String),
}

/// Request to send to LLM: the full transcript plus sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub params: GenerationParameters,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>, params: GenerationParameters) -> Self {
        Self { messages, params }
    }
}

/// Source of streamed replies.
///
/// Every call is a fresh request; the returned receiver yields fragments in
/// arrival order and closes after `StreamComplete` or `Error`.
pub trait CompletionClient {
    fn stream_response(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = ChatResult<mpsc::Receiver<LlmEvent>>> + Send;
}

/// LLM client for streaming responses from an OpenAI-compatible endpoint
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(config: &Config, api_key: String) -> Self {
        Self {
            // No timeout: a reply streams for as long as the provider keeps sending.
            client: reqwest::Client::new(),
            url: config.completions_url(),
            model: config.model.clone(),
            api_key,
        }
    }

    fn payload(&self, request: &ChatRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.params.temperature,
            "max_tokens": request.params.max_tokens,
            "top_p": request.params.top_p,
            "stream": true
        })
    }
}

/// Decode an SSE body into events on `tx`.
///
/// Bytes are buffered until a full line arrives, so a character split across
/// two reads is decoded whole. Returns as soon as the receiver is gone.
async fn process_sse_stream<S, B, E>(stream: S, tx: mpsc::Sender<LlmEvent>)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ChatError>,
{
    futures::pin_mut!(stream);
    let mut buffer: Vec<u8> = Vec::new();
    let mut fragments = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let error: ChatError = e.into();
                warn!(%error, "stream body failed");
                let _ = tx.send(LlmEvent::Error(error.to_string())).await;
                return;
            }
        };
        buffer.extend_from_slice(chunk.as_ref());

        // Process complete lines
        while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
            let event = match parse_sse_line(&String::from_utf8_lossy(&line)) {
                SseLine::Delta(delta) => {
                    fragments += 1;
                    LlmEvent::TextDelta(delta)
                }
                SseLine::Done => {
                    debug!(fragments, "stream complete");
                    let _ = tx.send(LlmEvent::StreamComplete).await;
                    return;
                }
                SseLine::Failed(message) => {
                    warn!(%message, "provider reported an error mid-stream");
                    let _ = tx.send(LlmEvent::Error(ChatError::Stream(message).to_string())).await;
                    return;
                }
                SseLine::Ignored => continue,
            };
            if tx.send(event).await.is_err() {
                debug!(fragments, "receiver dropped, abandoning stream");
                return;
            }
        }
    }

    // Flush any remaining buffer line (without newline)
    match parse_sse_line(&String::from_utf8_lossy(&buffer)) {
        SseLine::Delta(delta) => {
            if tx.send(LlmEvent::TextDelta(delta)).await.is_err() {
                return;
            }
        }
        SseLine::Failed(message) => {
            let _ = tx.send(LlmEvent::Error(ChatError::Stream(message).to_string())).await;
            return;
        }
        SseLine::Done | SseLine::Ignored => {}
    }

    debug!(fragments, "stream ended without [DONE]");
    let _ = tx.send(LlmEvent::StreamComplete).await;
}

impl CompletionClient for LlmClient {
    async fn stream_response(&self, request: ChatRequest) -> ChatResult<mpsc::Receiver<LlmEvent>> {
        info!(
            model = %self.model,
            messages = request.messages.len(),
            temperature = request.params.temperature,
            max_tokens = request.params.max_tokens,
            top_p = request.params.top_p,
            "requesting completion"
        );

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.payload(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "completion request rejected");
            return Err(ChatError::Api { status: status.as_u16(), body });
        }

        let (tx, rx) = mpsc::channel(1000);
        tokio::spawn(process_sse_stream(response.bytes_stream(), tx));
        Ok(rx)
    }
}

/// One decoded SSE line
#[derive(Debug, PartialEq)]
pub enum SseLine {
    Delta(String),
    Done,
    Failed(String),
    /// Comments, keep-alives, role-only or empty deltas
    Ignored,
}

/// Decode a single `data:` line of an OpenAI-style completion stream.
pub fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Ignored;
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return SseLine::Done;
    }

    let Ok(chunk) = serde_json::from_str::<serde_json::Value>(data) else {
        return SseLine::Ignored;
    };

    if let Some(error) = chunk.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return SseLine::Failed(message);
    }

    chunk
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
        .filter(|content| !content.is_empty())
        .map(|content| SseLine::Delta(content.to_string()))
        .unwrap_or(SseLine::Ignored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Role;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn delta(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": content}}]})
        )
    }

    fn client_for(server: &MockServer) -> LlmClient {
        let config = Config {
            base_url: format!("{}/openai/v1", server.uri()),
            ..Config::default()
        };
        LlmClient::new(&config, "test-api-key".to_string())
    }

    fn request() -> ChatRequest {
        ChatRequest::new(
            vec![Message::system("be brief"), Message::user("What is 2+2?")],
            GenerationParameters::default(),
        )
    }

    async fn drain(mut rx: mpsc::Receiver<LlmEvent>) -> Vec<LlmEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn chunked(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>, ChatError>> {
        futures::stream::iter(parts.into_iter().map(Ok))
    }

    #[test]
    fn parses_content_deltas() {
        assert_eq!(parse_sse_line(&delta("Hel")), SseLine::Delta("Hel".to_string()));
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Ignored);
        assert_eq!(parse_sse_line(""), SseLine::Ignored);
    }

    #[test]
    fn skips_empty_and_role_only_deltas() {
        assert_eq!(parse_sse_line(&delta("")), SseLine::Ignored);
        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(role_only), SseLine::Ignored);
        let finish = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_sse_line(finish), SseLine::Ignored);
    }

    #[test]
    fn surfaces_in_stream_errors() {
        let line = r#"data: {"error":{"message":"rate limit reached","type":"tokens"}}"#;
        assert_eq!(parse_sse_line(line), SseLine::Failed("rate limit reached".to_string()));
    }

    #[test]
    fn payload_carries_transcript_and_parameters() {
        let client = LlmClient::new(&Config::default(), "k".to_string());
        let payload = client.payload(&request());

        assert_eq!(payload["model"], "llama-3.1-8b-instant");
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["max_tokens"], 1024);
        assert_eq!(payload["messages"][0]["role"], Role::System.as_str());
        assert_eq!(payload["messages"][1]["content"], "What is 2+2?");
        assert!(payload["temperature"].as_f64().is_some());
        assert!(payload["top_p"].as_f64().is_some());
    }

    #[tokio::test]
    async fn streams_fragments_in_order() {
        let server = MockServer::start().await;
        let body = format!(
            "{}{}{}{}data: [DONE]\n\n",
            delta("4"),
            delta(""),
            delta(" is"),
            delta(" the answer.")
        );

        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(body_partial_json(serde_json::json!({"stream": true, "model": "llama-3.1-8b-instant"})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let rx = client_for(&server).stream_response(request()).await.unwrap();
        let events = drain(rx).await;

        assert_eq!(
            events,
            vec![
                LlmEvent::TextDelta("4".to_string()),
                LlmEvent::TextDelta(" is".to_string()),
                LlmEvent::TextDelta(" the answer.".to_string()),
                LlmEvent::StreamComplete,
            ]
        );
    }

    #[tokio::test]
    async fn flushes_a_trailing_line_without_done() {
        let server = MockServer::start().await;
        let body = format!("{}data: {}", delta("partial"), serde_json::json!({"choices": [{"delta": {"content": " tail"}}]}));

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let rx = client_for(&server).stream_response(request()).await.unwrap();
        let events = drain(rx).await;

        assert_eq!(
            events,
            vec![
                LlmEvent::TextDelta("partial".to_string()),
                LlmEvent::TextDelta(" tail".to_string()),
                LlmEvent::StreamComplete,
            ]
        );
    }

    #[tokio::test]
    async fn rejected_request_is_an_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client_for(&server).stream_response(request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Api { status: 401, ref body } if body == "invalid api key"));
    }

    #[tokio::test]
    async fn mid_stream_error_ends_the_stream() {
        let server = MockServer::start().await;
        let body = format!(
            "{}data: {}\n\n{}",
            delta("Hi"),
            serde_json::json!({"error": {"message": "overloaded"}}),
            delta("never seen")
        );

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let rx = client_for(&server).stream_response(request()).await.unwrap();
        let events = drain(rx).await;

        assert_eq!(
            events,
            vec![
                LlmEvent::TextDelta("Hi".to_string()),
                LlmEvent::Error("Stream error: overloaded".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn character_split_between_reads_is_decoded_whole() {
        let bytes = delta("café").into_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let body = chunked(vec![
            bytes[..split].to_vec(),
            bytes[split..].to_vec(),
            b"data: [DONE]\n\n".to_vec(),
        ]);

        let (tx, rx) = mpsc::channel(16);
        process_sse_stream(body, tx).await;

        assert_eq!(
            drain(rx).await,
            vec![LlmEvent::TextDelta("café".to_string()), LlmEvent::StreamComplete]
        );
    }

    #[tokio::test]
    async fn byte_at_a_time_body_keeps_every_fragment_intact() {
        let text = format!("{}{}", delta("naïve "), delta("🦀 crab"));
        let body = chunked(text.into_bytes().into_iter().map(|b| vec![b]).collect());

        let (tx, rx) = mpsc::channel(16);
        process_sse_stream(body, tx).await;

        let events = drain(rx).await;
        let reply: String = events
            .iter()
            .filter_map(|event| match event {
                LlmEvent::TextDelta(delta) => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(reply, "naïve 🦀 crab");
        assert_eq!(events.last(), Some(&LlmEvent::StreamComplete));
    }

    #[tokio::test]
    async fn stops_reading_once_the_receiver_is_gone() {
        let body = chunked(vec![delta("a").into_bytes()]).chain(futures::stream::pending());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let finished =
            tokio::time::timeout(std::time::Duration::from_secs(1), process_sse_stream(body, tx)).await;
        assert!(finished.is_ok());
    }
}
