use chrono::{TimeZone, Utc};
use serde_json::json;

use store::analytics::{self, HashtagCount};
use store::persist;

use crate::support::{TestDb, status_at, status_json};

async fn seed(t: &TestDb) {
    let events = [
        status_at(1, "en", &["rust", "db"], "Mon Jan 01 10:00:00 +0000 2024"),
        status_at(2, "en", &["rust"], "Tue Jan 02 10:00:00 +0000 2024"),
        status_at(3, "fr", &["rust", "paris"], "Wed Jan 03 10:00:00 +0000 2024"),
        status_at(4, "en", &["old"], "Fri Dec 01 10:00:00 +0000 2023"),
    ];
    for event in &events {
        persist::persist_event(&t.db, event, &[]).await.unwrap();
    }
}

fn january() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
    )
}

#[tokio::test]
async fn tweets_in_range_orders_by_date() {
    let t = TestDb::new().await;
    seed(&t).await;
    let (start, end) = january();

    let rows = analytics::tweets_in_range(&t.db, start, end, None, None)
        .await
        .unwrap();
    let ids: Vec<i64> = rows.iter().map(|r| r.tweetid).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn range_bounds_are_inclusive() {
    let t = TestDb::new().await;
    seed(&t).await;
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();

    let rows = analytics::tweets_in_range(&t.db, at, at, None, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tweetid, 2);
}

#[tokio::test]
async fn language_match_ignores_case_and_limit_applies() {
    let t = TestDb::new().await;
    seed(&t).await;
    let (start, end) = january();

    let fr = analytics::tweets_in_range(&t.db, start, end, Some("FR"), None)
        .await
        .unwrap();
    assert_eq!(fr.len(), 1);
    assert_eq!(fr[0].tweetid, 3);

    let limited = analytics::tweets_in_range(&t.db, start, end, Some("en"), Some(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].tweetid, 1);
}

#[tokio::test]
async fn popular_hashtags_ranks_by_count_then_tag() {
    let t = TestDb::new().await;
    seed(&t).await;
    let (start, end) = january();

    let top = analytics::popular_hashtags(&t.db, start, end, None, None)
        .await
        .unwrap();
    assert_eq!(
        top,
        vec![
            HashtagCount { tag: "rust".into(), total: 3 },
            HashtagCount { tag: "db".into(), total: 1 },
            HashtagCount { tag: "paris".into(), total: 1 },
        ]
    );

    let english = analytics::popular_hashtags(&t.db, start, end, Some("en"), Some(1))
        .await
        .unwrap();
    assert_eq!(english, vec![HashtagCount { tag: "rust".into(), total: 2 }]);
}

#[tokio::test]
async fn geotags_only_include_located_posts() {
    let t = TestDb::new().await;
    seed(&t).await;

    let mut located = status_json(5, 1, "en", &[]);
    located["created_at"] = json!("Thu Jan 04 10:00:00 +0000 2024");
    located["geo"] = json!({ "type": "Point", "coordinates": [48.85, 2.35] });
    persist::persist_event(&t.db, &serde_json::from_value(located).unwrap(), &[])
        .await
        .unwrap();

    let (start, end) = january();
    let points = analytics::geotags_in_range(&t.db, start, end, None, None)
        .await
        .unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].latitude, 48.85);
    assert_eq!(points[0].longitude, 2.35);
    assert_eq!(
        points[0].date,
        Utc.with_ymd_and_hms(2024, 1, 4, 10, 0, 0).unwrap()
    );
}
