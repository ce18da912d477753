use std::time::Duration;

use std::convert::Infallible;

use axum::Router;
use axum::body::Body;
use axum::http::StatusCode;
use axum::routing::get;
use futures::StreamExt;
use ingest::IngestError;
use ingest::stream::{ProducerState, StreamError};
use sea_orm::{EntityTrait, PaginatorTrait};
use store::entity::{hashtag, tweet};

use crate::support::{TestEnv, eventually, serve, status_json};

fn stream_body() -> String {
    [
        status_json(1, "fr").to_string(),
        String::new(),
        "{not json".to_string(),
        r#"{"limit":{"track":3}}"#.to_string(),
        status_json(2, "en").to_string(),
        r#"{"delete":{"status":{"id":5}}}"#.to_string(),
    ]
    .join("\r\n")
        + "\r\n"
}

/// The same lines, after which the connection stays open without data.
fn open_stream() -> Body {
    let lines = futures::stream::iter([Ok::<_, Infallible>(stream_body())]);
    Body::from_stream(lines.chain(futures::stream::pending()))
}

#[tokio::test]
async fn stores_only_accepted_languages() {
    let app = Router::new().route("/stream", get(|| async { stream_body() }));
    let addr = serve(app).await;
    let env = TestEnv::new(format!("http://{addr}/stream"));
    let db = env.db().await;

    let pipeline = ingest::pipeline::start(&env.config).await.unwrap();

    let conn = &db;
    let stored = eventually(Duration::from_secs(10), || async move {
        tweet::Entity::find_by_id(2).one(conn).await.unwrap().is_some()
    })
    .await;
    assert!(stored, "english post should be stored");

    pipeline.coordinator.shutdown().await.unwrap();

    assert!(tweet::Entity::find_by_id(1).one(&db).await.unwrap().is_none());
    assert_eq!(tweet::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(hashtag::Entity::find().count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn wildcard_accepts_every_language() {
    let app = Router::new().route("/stream", get(|| async { stream_body() }));
    let addr = serve(app).await;
    let mut env = TestEnv::new(format!("http://{addr}/stream"));
    env.config.stream.languages = vec!["all".into()];
    let db = env.db().await;

    let pipeline = ingest::pipeline::start(&env.config).await.unwrap();
    let conn = &db;
    let stored = eventually(Duration::from_secs(10), || async move {
        tweet::Entity::find().count(conn).await.unwrap() == 2
    })
    .await;
    assert!(stored, "both posts should be stored");

    pipeline.coordinator.shutdown().await.unwrap();
}

#[tokio::test]
async fn producer_reports_state_and_closes_on_shutdown() {
    let app = Router::new().route("/stream", get(|| async { open_stream() }));
    let addr = serve(app).await;
    let env = TestEnv::new(format!("http://{addr}/stream"));

    let pipeline = ingest::pipeline::start(&env.config).await.unwrap();
    let mut state = pipeline.producer_states[0].clone();

    tokio::time::timeout(
        Duration::from_secs(10),
        state.wait_for(|s| *s == ProducerState::Streaming),
    )
    .await
    .expect("producer should connect")
    .unwrap();

    pipeline.coordinator.shutdown().await.unwrap();
    assert_eq!(*state.borrow(), ProducerState::Closed);
}

#[tokio::test]
async fn rejected_credentials_stop_the_process() {
    let app = Router::new().route("/stream", get(|| async { StatusCode::UNAUTHORIZED }));
    let addr = serve(app).await;
    let env = TestEnv::new(format!("http://{addr}/stream"));

    let pipeline = ingest::pipeline::start(&env.config).await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), pipeline.token.cancelled())
        .await
        .expect("fatal error should trigger shutdown");

    let err = pipeline.coordinator.shutdown().await.unwrap_err();
    assert!(matches!(
        err,
        IngestError::Stream(StreamError::InvalidCredentials(401))
    ));
}

#[tokio::test]
async fn shutdown_drains_queued_events() {
    let app = Router::new().route("/stream", get(|| async { open_stream() }));
    let addr = serve(app).await;
    let mut env = TestEnv::new(format!("http://{addr}/stream"));
    env.config.stream.languages = vec!["ALL".into()];
    let db = env.db().await;

    let pipeline = ingest::pipeline::start(&env.config).await.unwrap();
    let queue = pipeline.queue.clone();
    let mut state = pipeline.producer_states[0].clone();

    // Stored rows are read before the queue, so an event is never counted twice.
    let (conn, pending) = (&db, &queue);
    let accepted = eventually(Duration::from_secs(10), || async move {
        let stored = tweet::Entity::find().count(conn).await.unwrap() as usize;
        stored + pending.unfinished() >= 2
    })
    .await;
    assert!(accepted, "both posts should reach the queue");

    pipeline.coordinator.shutdown().await.unwrap();

    assert_eq!(queue.unfinished(), 0);
    assert!(queue.sender().is_err());
    assert_eq!(tweet::Entity::find().count(&db).await.unwrap(), 2);
    assert_eq!(*state.borrow_and_update(), ProducerState::Closed);
}
