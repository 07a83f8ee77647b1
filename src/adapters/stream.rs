use crate::domain::model::{DocumentationResult, GenerationPayload};
use crate::domain::ports::ResultObserver;
use crate::utils::error::{DeepWikiError, Result};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// 連上後端 WebSocket、送出 payload，並把收到的片段依序拼接。
///
/// 伺服器以 1000/1001（或無狀態碼）關閉連線視為完成；其他關閉碼、
/// 沒有 close frame 就斷線、或傳輸錯誤都會回傳錯誤。
pub async fn capture_stream(
    ws_url: &str,
    payload: &GenerationPayload,
    connect_timeout: Duration,
    observer: Option<&ResultObserver>,
) -> Result<String> {
    tracing::info!("Connecting to WebSocket at {}...", ws_url);

    let (mut socket, _) =
        match tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(ws_url)).await
        {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => return Err(classify_connect_error(ws_url, e)),
            Err(_) => {
                return Err(DeepWikiError::TimeoutError {
                    operation: format!("WebSocket connection to {}", ws_url),
                    seconds: connect_timeout.as_secs(),
                })
            }
        };

    socket
        .send(Message::Text(serde_json::to_string(payload)?))
        .await?;
    tracing::info!("✔ Initial payload sent. Capturing token stream...");

    let mut content = String::new();
    let mut fragments = 0usize;

    loop {
        let message = match socket.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                return Err(DeepWikiError::StreamTerminatedError {
                    message: e.to_string(),
                })
            }
            None => {
                return Err(DeepWikiError::StreamTerminatedError {
                    message: "connection ended without a close frame".to_string(),
                })
            }
        };

        let fragment = match message {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Message::Close(frame) => {
                check_close_frame(frame.as_ref())?;
                break;
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        fragments += 1;
        content.push_str(&fragment);
        if let Some(observer) = observer {
            // 觀察者已經離開時不影響擷取
            let _ = observer.send(DocumentationResult::Fragment(fragment));
        }
    }

    // 回覆 close handshake；對方可能已經斷線
    let _ = socket.close(None).await;

    tracing::info!("✔ Server closed connection. Finished capturing stream.");
    tracing::info!(
        "Assembled content of {} characters from {} fragments.",
        content.chars().count(),
        fragments
    );
    Ok(content)
}

fn check_close_frame(frame: Option<&CloseFrame<'_>>) -> Result<()> {
    match frame {
        None => Ok(()),
        Some(frame) if matches!(frame.code, CloseCode::Normal | CloseCode::Away) => Ok(()),
        Some(frame) => Err(DeepWikiError::StreamClosedError {
            code: u16::from(frame.code),
            reason: frame.reason.to_string(),
        }),
    }
}

fn classify_connect_error(ws_url: &str, error: WsError) -> DeepWikiError {
    match error {
        WsError::Io(e) => DeepWikiError::ConnectionError {
            url: ws_url.to_string(),
            message: e.to_string(),
        },
        WsError::Http(response) => {
            let status = response.status();
            let body = response
                .body()
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            DeepWikiError::BackendStatusError {
                step: "websocket handshake".to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            }
        }
        other => DeepWikiError::WebSocketError(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ChatMessage, Language, Provider, RepoHost};
    use std::future::Future;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::WebSocketStream;

    fn payload() -> GenerationPayload {
        GenerationPayload {
            repo_url: "https://github.com/owner/repo".to_string(),
            repo_type: RepoHost::Github,
            model: "gpt-4o".to_string(),
            provider: Provider::OpenAi,
            language: Language::En,
            comprehensive: true,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "document it".to_string(),
            }],
            token: None,
        }
    }

    async fn spawn_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });
        format!("ws://{}/ws/chat", addr)
    }

    async fn close_with(mut ws: WebSocketStream<TcpStream>, code: CloseCode, reason: &'static str) {
        ws.close(Some(CloseFrame {
            code,
            reason: reason.into(),
        }))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    }

    #[tokio::test]
    async fn test_capture_concatenates_fragments_in_order() {
        let url = spawn_server(|mut ws| async move {
            let request = ws.next().await.unwrap().unwrap();
            let body: serde_json::Value = serde_json::from_str(request.to_text().unwrap()).unwrap();
            assert_eq!(body["repo_url"], "https://github.com/owner/repo");
            assert_eq!(body["comprehensive"], true);
            assert_eq!(body["type"], "github");

            for token in ["# Wiki", "\n\n", "Hello ", "world"] {
                ws.send(Message::Text(token.to_string())).await.unwrap();
            }
            close_with(ws, CloseCode::Normal, "done").await;
        })
        .await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let content = capture_stream(&url, &payload(), Duration::from_secs(5), Some(&tx))
            .await
            .unwrap();

        assert_eq!(content, "# Wiki\n\nHello world");

        drop(tx);
        let mut relayed = Vec::new();
        while let Some(DocumentationResult::Fragment(fragment)) = rx.recv().await {
            relayed.push(fragment);
        }
        assert_eq!(relayed, vec!["# Wiki", "\n\n", "Hello ", "world"]);
    }

    #[tokio::test]
    async fn test_binary_frames_are_decoded() {
        let url = spawn_server(|mut ws| async move {
            let _ = ws.next().await;
            ws.send(Message::Binary("héllo".as_bytes().to_vec()))
                .await
                .unwrap();
            close_with(ws, CloseCode::Away, "").await;
        })
        .await;

        let content = capture_stream(&url, &payload(), Duration::from_secs(5), None)
            .await
            .unwrap();
        assert_eq!(content, "héllo");
    }

    #[tokio::test]
    async fn test_abnormal_close_code_is_an_error() {
        let url = spawn_server(|mut ws| async move {
            let _ = ws.next().await;
            ws.send(Message::Text("partial".to_string())).await.unwrap();
            close_with(ws, CloseCode::Error, "provider failed").await;
        })
        .await;

        let err = capture_stream(&url, &payload(), Duration::from_secs(5), None)
            .await
            .unwrap_err();
        match err {
            DeepWikiError::StreamClosedError { code, reason } => {
                assert_eq!(code, 1011);
                assert_eq!(reason, "provider failed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_connection_is_an_error() {
        let url = spawn_server(|mut ws| async move {
            let _ = ws.next().await;
            ws.send(Message::Text("partial".to_string())).await.unwrap();
            drop(ws);
        })
        .await;

        let err = capture_stream(&url, &payload(), Duration::from_secs(5), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeepWikiError::StreamTerminatedError { .. }));
    }

    #[tokio::test]
    async fn test_refused_connection_names_the_url() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("ws://{}/ws/chat", listener.local_addr().unwrap());
        drop(listener);

        let err = capture_stream(&url, &payload(), Duration::from_secs(5), None)
            .await
            .unwrap_err();
        match err {
            DeepWikiError::ConnectionError { url: failed, .. } => assert_eq!(failed, url),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stalled_handshake_times_out() {
        // 接受 TCP 連線但從不回應 WebSocket 握手
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/chat", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(tcp);
        });

        let err = capture_stream(&url, &payload(), Duration::from_secs(1), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DeepWikiError::TimeoutError { seconds: 1, .. }));
        assert_eq!(err.exit_code(), 2);
        server.abort();
    }
}
