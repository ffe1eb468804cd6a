//! End-to-end tests against a local WebSocket chat server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use chzzk_auth::{AuthError, ChannelDirectory, ChatTokens, Credentials};
use chzzk_client::{
    EventDispatcher, IdentityCheck, MemoryTranscript, SessionError, SessionManager,
    SessionOptions, TransportError, WsConnector,
};
use chzzk_core::{AccessToken, ChannelId, Labels, Locale, StreamerId, UserIdHash};

const TIMEOUT: Duration = Duration::from_secs(5);
const START: i64 = 1_700_000_000;

type ServerWs = WebSocketStream<TcpStream>;

/// Directory with a fixed channel id.
struct StaticDirectory;

#[async_trait]
impl ChannelDirectory for StaticDirectory {
    async fn user_identity(&self, _: &Credentials) -> Result<UserIdHash, AuthError> {
        Ok(UserIdHash::from("user-hash"))
    }

    async fn channel_identity(
        &self,
        _: &StreamerId,
        _: &Credentials,
    ) -> Result<ChannelId, AuthError> {
        Ok(ChannelId::from("N1live"))
    }

    async fn channel_display_name(&self, _: &StreamerId) -> Result<String, AuthError> {
        Ok("Live Channel".into())
    }

    async fn access_token(
        &self,
        _: &ChannelId,
        _: &Credentials,
    ) -> Result<ChatTokens, AuthError> {
        Ok(ChatTokens {
            access_token: AccessToken::new("live-token"),
            extra_token: String::new(),
        })
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn send(ws: &mut ServerWs, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn next_json(ws: &mut ServerWs) -> Value {
    loop {
        if let Message::Text(text) = ws.next().await.unwrap().unwrap() {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Answer `connect` and `request_recent_chat`; returns the connect message.
async fn serve_handshake(ws: &mut ServerWs, sid: &str) -> Value {
    let connect = next_json(ws).await;
    assert_eq!(connect["cmd"], 100);
    send(ws, json!({"cmd": 10100, "tid": "1", "retCode": 0, "bdy": {"sid": sid}})).await;

    let recent = next_json(ws).await;
    assert_eq!(recent["cmd"], 5101);
    assert_eq!(recent["sid"], sid);
    send(ws, json!({"cmd": 15101, "tid": "2", "bdy": {"messageList": []}})).await;
    connect
}

fn chat(nickname: &str, msg: &str, secs: i64) -> Value {
    json!({
        "ver": "2",
        "cmd": 93101,
        "bdy": [{
            "uid": format!("uid-{nickname}"),
            "profile": json!({"nickname": nickname}).to_string(),
            "msg": msg,
            "msgTime": (START + secs) * 1000,
        }],
    })
}

async fn manager(url: &str) -> SessionManager {
    SessionManager::new(
        StreamerId::from("streamer1"),
        Credentials::new("aut", "ses"),
        Arc::new(StaticDirectory),
        Arc::new(WsConnector::new(url)),
        SessionOptions {
            reconnect_delay: Duration::from_millis(10),
            ..SessionOptions::default()
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn handshake_over_websocket() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let connect = serve_handshake(&mut ws, "sid-live").await;
        while let Some(Ok(_)) = ws.next().await {}
        connect
    });

    let mgr = manager(&url).await;
    let session = timeout(TIMEOUT, mgr.establish()).await.unwrap().unwrap();
    assert_eq!(session.session_id.as_str(), "sid-live");
    assert!(session.is_connected());
    session.close().await;

    let connect = timeout(TIMEOUT, server).await.unwrap().unwrap();
    assert_eq!(connect["ver"], "2");
    assert_eq!(connect["svcid"], "game");
    assert_eq!(connect["cid"], "N1live");
    assert_eq!(connect["bdy"]["accTkn"], "live-token");
    assert_eq!(connect["bdy"]["devType"], 2001);
}

#[tokio::test]
async fn server_closing_during_handshake_fails_establish() {
    let (listener, url) = bind().await;
    let _server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let _ = next_json(&mut ws).await;
        let _ = ws.close(None).await;
    });

    let mgr = manager(&url).await;
    let err = timeout(TIMEOUT, mgr.establish()).await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn connect_refused_is_transport_error() {
    let (listener, url) = bind().await;
    drop(listener);

    let result = SessionManager::new(
        StreamerId::from("streamer1"),
        Credentials::new("aut", "ses"),
        Arc::new(StaticDirectory),
        Arc::new(WsConnector::new(url)),
        SessionOptions::default(),
    )
    .await
    .unwrap()
    .establish()
    .await;
    assert!(matches!(
        result,
        Err(SessionError::Transport(TransportError::WebSocket(_)))
    ));
}

#[tokio::test]
async fn run_loop_pongs_records_and_reconnects() {
    let (listener, url) = bind().await;
    let server = tokio::spawn(async move {
        // First connection: ping, chat, then drop the socket.
        let mut ws = accept(&listener).await;
        let _ = serve_handshake(&mut ws, "sid-1").await;
        send(&mut ws, json!({"ver": "2", "cmd": 0})).await;
        let pong = next_json(&mut ws).await;
        send(&mut ws, chat("Alice", "hello", 0)).await;
        let _ = ws.close(None).await;
        drop(ws);

        // Second connection: one more chat, then wait for the client to leave.
        let mut ws = accept(&listener).await;
        let _ = serve_handshake(&mut ws, "sid-2").await;
        send(&mut ws, chat("Bob", "again", 90)).await;
        while let Some(Ok(_)) = ws.next().await {}
        pong
    });

    let mgr = manager(&url).await;
    let session = timeout(TIMEOUT, mgr.establish()).await.unwrap().unwrap();
    let labels = Labels::for_locale(Locale::En);
    let transcript = MemoryTranscript::new(labels.clone());
    let mut dispatcher = EventDispatcher::new(
        mgr,
        Box::new(transcript.clone()),
        labels,
        IdentityCheck::OnPing,
    );

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        let transcript = transcript.clone();
        tokio::spawn(async move {
            while transcript.records().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            cancel.cancel();
        })
    };

    let start = DateTime::<Utc>::from_timestamp(START, 0).unwrap();
    let summary = timeout(TIMEOUT, dispatcher.run(session, start, &cancel))
        .await
        .unwrap();
    timeout(TIMEOUT, watcher).await.unwrap().unwrap();

    assert_eq!(
        transcript.lines(),
        vec![
            "[2023-11-14 22:13:20 (+0:00:00)][chat] Alice : hello".to_string(),
            "[2023-11-14 22:14:50 (+0:01:30)][chat] Bob : again".to_string(),
        ]
    );
    assert_eq!(summary.pongs, 1);
    assert_eq!(summary.reconnects, 1);
    assert_eq!(summary.records, 2);

    let pong = timeout(TIMEOUT, server).await.unwrap().unwrap();
    assert_eq!(pong, json!({"ver": "2", "cmd": 10000}));
}
