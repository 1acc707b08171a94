use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::config::Config;
use crate::error::ChatError;

/// Body of a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Data-URI of the attached image, serialized as `null` when absent
    pub image: Option<String>,
}

/// A reply the backend understood well enough to answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    /// Markdown text to show as the bot turn
    Text(String),
    /// The backend reported a failure with this message
    Failure(String),
}

/// Wire shape of the backend's answer
#[derive(Debug, Deserialize)]
struct ReplyBody {
    success: bool,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<ReplyBody> for ChatReply {
    type Error = ChatError;

    fn try_from(body: ReplyBody) -> Result<Self, Self::Error> {
        match body {
            ReplyBody {
                success: true,
                response: Some(text),
                ..
            } => Ok(ChatReply::Text(text)),
            ReplyBody {
                success: false,
                error: Some(message),
                ..
            } => Ok(ChatReply::Failure(message)),
            ReplyBody { success, .. } => Err(ChatError::Malformed(format!(
                "success={} without matching payload field",
                success
            ))),
        }
    }
}

/// The one collaborator the controller talks to over the network
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatError>;
}

/// JSON-over-HTTP backend
#[derive(Clone)]
pub struct HttpChatBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpChatBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ChatError> {
        Self::new(config.chat_url(), config.request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        tracing::debug!(
            url = %self.url,
            message_len = request.message.len(),
            has_image = request.image.is_some(),
            "posting chat request"
        );

        // reqwest's `json` sets `Content-Type: application/json`
        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status));
        }

        let bytes = response.bytes().await?;
        let body: ReplyBody =
            serde_json::from_slice(&bytes).map_err(|e| ChatError::Malformed(e.to_string()))?;

        ChatReply::try_from(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend_for(server: &MockServer) -> HttpChatBackend {
        HttpChatBackend::new(format!("{}/chat", server.uri()), Duration::from_secs(5)).unwrap()
    }

    fn request(message: &str, image: Option<&str>) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            image: image.map(str::to_string),
        }
    }

    #[test]
    fn test_request_serializes_missing_image_as_null() {
        let body = serde_json::to_value(request("hi", None)).unwrap();
        assert_eq!(body, json!({ "message": "hi", "image": null }));
    }

    #[tokio::test]
    async fn test_success_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "message": "hello", "image": null })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "response": "Hi **there**" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = backend_for(&server).await.send(&request("hello", None)).await.unwrap();
        assert_eq!(reply, ChatReply::Text("Hi **there**".to_string()));
    }

    #[tokio::test]
    async fn test_image_is_sent_as_data_uri() {
        let server = MockServer::start().await;
        let uri = "data:image/png;base64,YWJj";
        Mock::given(method("POST"))
            .and(body_json(json!({ "message": "", "image": uri })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "success": true, "response": "a cat" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = backend_for(&server).await.send(&request("", Some(uri))).await.unwrap();
        assert_eq!(reply, ChatReply::Text("a cat".to_string()));
    }

    #[tokio::test]
    async fn test_server_failure_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": false, "error": "bad input" })),
            )
            .mount(&server)
            .await;

        let reply = backend_for(&server).await.send(&request("x", None)).await.unwrap();
        assert_eq!(reply, ChatReply::Failure("bad input".to_string()));
    }

    #[tokio::test]
    async fn test_non_2xx_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = backend_for(&server).await.send(&request("x", None)).await.unwrap_err();
        assert!(matches!(err, ChatError::Status(status) if status.as_u16() == 500));
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_unexpected_shapes_are_network_errors() {
        let bodies = [
            json!({ "success": true }),
            json!({ "success": false }),
            json!({ "response": "missing flag" }),
            json!(["not", "an", "object"]),
        ];

        for body in bodies {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
                .mount(&server)
                .await;

            let err = backend_for(&server).await.send(&request("x", None)).await.unwrap_err();
            assert!(matches!(err, ChatError::Malformed(_)), "body {body} gave {err:?}");
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend_for(&server).await.send(&request("x", None)).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let server = MockServer::start().await;
        let url = format!("{}/chat", server.uri());
        drop(server);

        let backend = HttpChatBackend::new(url, Duration::from_secs(2)).unwrap();
        let err = backend.send(&request("x", None)).await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
    }
}
