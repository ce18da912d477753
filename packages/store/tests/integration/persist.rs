use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;

use store::entity::{geotag, hashtag, media, mention, tweet, url_data, user};
use store::persist::{self, MediaContent, StoredMedia, UpsertOutcome};

use crate::support::{TestDb, status, status_json};

mod tweets {
    use super::*;

    #[tokio::test]
    async fn same_event_twice_stores_one_tweet() {
        let t = TestDb::new().await;
        let event = status(100, 7, "en", &["a", "b"]);

        let first = persist::persist_event(&t.db, &event, &[]).await.unwrap();
        let second = persist::persist_event(&t.db, &event, &[]).await.unwrap();

        assert_eq!(first, UpsertOutcome::Created);
        assert_eq!(second, UpsertOutcome::Updated);
        assert_eq!(tweet::Entity::find().count(&t.db).await.unwrap(), 1);
        assert_eq!(user::Entity::find().count(&t.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stores_post_with_author_and_hashtags() {
        let t = TestDb::new().await;
        let event = status(100, 7, "EN", &["a", "b"]);

        persist::persist_event(&t.db, &event, &[]).await.unwrap();

        let stored = tweet::Entity::find_by_id(100)
            .one(&t.db)
            .await
            .unwrap()
            .expect("tweet row");
        assert_eq!(stored.userid, 7);
        assert_eq!(stored.lang.as_deref(), Some("en"));
        assert_eq!(stored.text.as_deref(), Some("post 100"));

        let author = user::Entity::find_by_id(7).one(&t.db).await.unwrap();
        assert!(author.is_some());

        let tags: Vec<String> = hashtag::Entity::find()
            .filter(hashtag::Column::Tweetid.eq(100))
            .order_by_asc(hashtag::Column::Tag)
            .all(&t.db)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.tag)
            .collect();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn reobservation_only_changes_counters() {
        let t = TestDb::new().await;
        let mut value = status_json(100, 7, "en", &["a"]);
        persist::persist_event(&t.db, &serde_json::from_value(value.clone()).unwrap(), &[])
            .await
            .unwrap();

        value["retweet_count"] = json!(12);
        value["favorite_count"] = json!(30);
        value["text"] = json!("edited text is ignored");
        value["entities"]["hashtags"] = json!([{ "text": "a" }, { "text": "late" }]);
        let outcome =
            persist::persist_event(&t.db, &serde_json::from_value(value).unwrap(), &[])
                .await
                .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        let stored = tweet::Entity::find_by_id(100)
            .one(&t.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rtcount, 12);
        assert_eq!(stored.fvcount, 30);
        assert_eq!(stored.text.as_deref(), Some("post 100"));
        assert_eq!(hashtag::Entity::find().count(&t.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn long_text_is_truncated() {
        let t = TestDb::new().await;
        let mut value = status_json(5, 1, "en", &[]);
        value["text"] = json!("x".repeat(800));
        persist::persist_event(&t.db, &serde_json::from_value(value).unwrap(), &[])
            .await
            .unwrap();

        let stored = tweet::Entity::find_by_id(5).one(&t.db).await.unwrap().unwrap();
        assert_eq!(stored.text.unwrap().chars().count(), persist::MAX_TEXT_CHARS);
    }

    #[tokio::test]
    async fn tweet_exists_reflects_store() {
        let t = TestDb::new().await;
        assert!(!persist::tweet_exists(&t.db, 42).await.unwrap());
        persist::persist_event(&t.db, &status(42, 1, "en", &[]), &[])
            .await
            .unwrap();
        assert!(persist::tweet_exists(&t.db, 42).await.unwrap());
    }
}

mod users {
    use super::*;

    #[tokio::test]
    async fn profile_refreshes_but_creation_time_stays() {
        let t = TestDb::new().await;
        let mut first = status_json(1, 7, "en", &[]);
        persist::persist_event(&t.db, &serde_json::from_value(first.clone()).unwrap(), &[])
            .await
            .unwrap();
        let before = user::Entity::find_by_id(7).one(&t.db).await.unwrap().unwrap();

        first["id"] = json!(2);
        first["user"]["followers_count"] = json!(999);
        first["user"]["description"] = json!("new bio");
        first["user"]["created_at"] = json!("Thu Jan 01 00:00:00 +0000 2015");
        persist::persist_event(&t.db, &serde_json::from_value(first).unwrap(), &[])
            .await
            .unwrap();

        let after = user::Entity::find_by_id(7).one(&t.db).await.unwrap().unwrap();
        assert_eq!(after.numfollowers, 999);
        assert_eq!(after.description.as_deref(), Some("new bio"));
        assert_eq!(after.createdat, before.createdat);
        assert!(after.lastupdate >= before.lastupdate);
        assert_eq!(user::Entity::find().count(&t.db).await.unwrap(), 1);
    }
}

mod children {
    use super::*;

    #[tokio::test]
    async fn three_hashtags_make_three_rows() {
        let t = TestDb::new().await;
        persist::persist_event(&t.db, &status(9, 1, "en", &["x", "y", "z"]), &[])
            .await
            .unwrap();

        let rows = hashtag::Entity::find()
            .filter(hashtag::Column::Tweetid.eq(9))
            .count(&t.db)
            .await
            .unwrap();
        assert_eq!(rows, 3);
    }

    #[tokio::test]
    async fn duplicate_tags_collapse() {
        let t = TestDb::new().await;
        persist::persist_event(&t.db, &status(9, 1, "en", &["x", "x"]), &[])
            .await
            .unwrap();
        assert_eq!(hashtag::Entity::find().count(&t.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mentions_urls_and_geotag_are_stored() {
        let t = TestDb::new().await;
        let mut value = status_json(11, 3, "en", &[]);
        value["entities"]["user_mentions"] = json!([{ "id": 20 }, { "id": 21 }]);
        value["entities"]["urls"] = json!([
            { "url": "https://t.co/a", "expanded_url": "https://example.com/a" },
            { "url": "https://t.co/b" }
        ]);
        value["coordinates"] = json!({ "type": "Point", "coordinates": [-122.39, 37.78] });
        persist::persist_event(&t.db, &serde_json::from_value(value).unwrap(), &[])
            .await
            .unwrap();

        let mentions = mention::Entity::find().all(&t.db).await.unwrap();
        assert_eq!(mentions.len(), 2);
        assert!(mentions.iter().all(|m| m.source == 3));

        let mut urls: Vec<String> = url_data::Entity::find()
            .all(&t.db)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.url)
            .collect();
        urls.sort();
        assert_eq!(urls, vec!["https://example.com/a", "https://t.co/b"]);

        let geo = geotag::Entity::find_by_id(11).one(&t.db).await.unwrap().unwrap();
        assert_eq!(geo.latitude, 37.78);
        assert_eq!(geo.longitude, -122.39);
    }

    #[tokio::test]
    async fn media_rows_follow_content_kind() {
        let t = TestDb::new().await;
        let stored = vec![
            StoredMedia {
                index: 0,
                kind: Some("photo".into()),
                native_filename: Some("one.jpg".into()),
                content: MediaContent::Blob(vec![1, 2, 3]),
            },
            StoredMedia {
                index: 1,
                kind: Some("photo".into()),
                native_filename: Some("two.png".into()),
                content: MediaContent::File("/media/ab/cd/ef/rest.png".into()),
            },
        ];
        persist::persist_event(&t.db, &status(12, 1, "en", &[]), &stored)
            .await
            .unwrap();

        let rows = media::Entity::find()
            .order_by_asc(media::Column::Idx)
            .all(&t.db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].blob.as_deref(), Some(&[1u8, 2, 3][..]));
        assert!(rows[0].local_filename.is_none());
        assert!(rows[1].blob.is_none());
        assert_eq!(
            rows[1].local_filename.as_deref(),
            Some("/media/ab/cd/ef/rest.png")
        );
    }

    #[tokio::test]
    async fn insert_children_skips_existing_rows() {
        let t = TestDb::new().await;
        let event = status(13, 1, "en", &["a", "b"]);
        persist::persist_event(&t.db, &event, &[]).await.unwrap();

        let written = persist::insert_children(&t.db, &event, &[]).await.unwrap();
        assert_eq!(written, 0);
        assert_eq!(hashtag::Entity::find().count(&t.db).await.unwrap(), 2);
    }
}

mod conflicts {
    use super::*;

    #[tokio::test]
    async fn upsert_user_reports_outcome() {
        let t = TestDb::new().await;
        let event = status(1, 7, "en", &[]);
        assert_eq!(
            persist::upsert_user(&t.db, &event.user).await.unwrap(),
            UpsertOutcome::Created
        );
        assert_eq!(
            persist::upsert_user(&t.db, &event.user).await.unwrap(),
            UpsertOutcome::Updated
        );
    }

    #[tokio::test]
    async fn oversized_id_is_rejected_without_writes() {
        let t = TestDb::new().await;
        let mut value = status_json(1, 1, "en", &[]);
        value["id"] = json!(u64::MAX);
        let event = serde_json::from_value(value).unwrap();

        let err = persist::persist_event(&t.db, &event, &[]).await.unwrap_err();
        assert!(matches!(err, store::StoreError::IdOutOfRange(u64::MAX)));
        assert_eq!(user::Entity::find().count(&t.db).await.unwrap(), 0);
    }

    fn other_user(userid: i64, username: &str) -> user::ActiveModel {
        user::ActiveModel {
            userid: Set(userid),
            username: Set(username.into()),
            name: Set("Someone".into()),
            location: Set(None),
            description: Set(None),
            numfollowers: Set(0),
            numfriends: Set(0),
            numtweets: Set(0),
            createdat: Set(None),
            timezone: Set(None),
            geoloc: Set(false),
            verified: Set(false),
            lastupdate: Set(Utc::now()),
        }
    }

    #[tokio::test]
    async fn new_post_by_author_stored_elsewhere_is_kept() {
        let t = TestDb::new().await;
        user::Entity::insert(other_user(7, "user7"))
            .exec_without_returning(&t.db)
            .await
            .unwrap();

        let outcome = persist::persist_event(&t.db, &status(100, 7, "en", &["a", "b"]), &[])
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);
        assert!(persist::tweet_exists(&t.db, 100).await.unwrap());
        assert_eq!(hashtag::Entity::find().count(&t.db).await.unwrap(), 2);

        let author = user::Entity::find_by_id(7).one(&t.db).await.unwrap().unwrap();
        assert_eq!(author.name, "User 7");
    }

    #[tokio::test]
    async fn author_conflict_is_an_error_not_a_skip() {
        let t = TestDb::new().await;
        t.db.execute_unprepared(r#"CREATE UNIQUE INDEX "user_username" ON "User" ("username")"#)
            .await
            .unwrap();
        user::Entity::insert(other_user(8, "user7"))
            .exec_without_returning(&t.db)
            .await
            .unwrap();

        let err = persist::persist_event(&t.db, &status(100, 7, "en", &["a", "b"]), &[])
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert!(!persist::tweet_exists(&t.db, 100).await.unwrap());
        assert!(user::Entity::find_by_id(7).one(&t.db).await.unwrap().is_none());
    }
}
