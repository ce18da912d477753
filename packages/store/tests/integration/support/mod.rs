use common::Status;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tempfile::TempDir;

/// A throwaway SQLite database with the schema applied.
pub struct TestDb {
    pub db: DatabaseConnection,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.sqlite").display());
        let db = store::database::connect_url(&url, 1)
            .await
            .expect("Failed to open test database");
        store::database::sync_schema(&db)
            .await
            .expect("Failed to create schema");
        Self { db, _dir: dir }
    }
}

/// Raw upstream JSON for a post with the given hashtags.
pub fn status_json(id: u64, user_id: u64, lang: &str, hashtags: &[&str]) -> Value {
    let tags: Vec<Value> = hashtags.iter().map(|t| json!({ "text": t })).collect();
    json!({
        "id": id,
        "created_at": "Wed Oct 10 20:19:24 +0000 2018",
        "text": format!("post {id}"),
        "source": "web",
        "lang": lang,
        "retweet_count": 0,
        "favorite_count": 0,
        "user": {
            "id": user_id,
            "screen_name": format!("user{user_id}"),
            "name": format!("User {user_id}"),
            "followers_count": 10,
            "friends_count": 5,
            "statuses_count": 1,
            "created_at": "Wed May 23 06:01:13 +0000 2007"
        },
        "entities": { "hashtags": tags }
    })
}

pub fn status(id: u64, user_id: u64, lang: &str, hashtags: &[&str]) -> Status {
    serde_json::from_value(status_json(id, user_id, lang, hashtags)).expect("Invalid test status")
}

/// Same post observed at a different time.
pub fn status_at(id: u64, lang: &str, hashtags: &[&str], created_at: &str) -> Status {
    let mut value = status_json(id, 1, lang, hashtags);
    value["created_at"] = json!(created_at);
    serde_json::from_value(value).expect("Invalid test status")
}
