//! Upserts for one decoded event.
//!
//! Users and tweets are insert-or-refresh; child rows are insert-if-absent on
//! their composite key and never updated. [`persist_event`] applies everything
//! for one event in a single transaction.

use chrono::Utc;
use common::{Author, Status};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Set,
    TransactionTrait,
};
use tracing::debug;

use crate::entity::{geotag, hashtag, media, mention, tweet, url_data, user};
use crate::error::{Result, StoreError};

/// Longest post text kept, in characters.
pub const MAX_TEXT_CHARS: usize = 500;

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The row did not exist and was inserted.
    Created,
    /// The row existed and its mutable fields were refreshed.
    Updated,
    /// A concurrent writer inserted the same key first; nothing was written.
    ConflictResolved,
}

/// Fetched media ready to be written alongside its tweet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub index: u32,
    pub kind: Option<String>,
    pub native_filename: Option<String>,
    pub content: MediaContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaContent {
    /// Compressed bytes for the `blob` column.
    Blob(Vec<u8>),
    /// Path of the file on disk.
    File(String),
}

pub fn db_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| StoreError::IdOutOfRange(id))
}

fn count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

fn inserted(result: std::result::Result<u64, DbErr>) -> std::result::Result<bool, DbErr> {
    match result {
        Ok(rows) => Ok(rows > 0),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Insert the author if unseen, otherwise refresh the profile.
pub async fn upsert_user<C: ConnectionTrait>(conn: &C, author: &Author) -> Result<UpsertOutcome> {
    let known = user::Entity::find_by_id(db_id(author.id)?)
        .one(conn)
        .await?
        .is_some();
    write_user(conn, author, known).await
}

/// `known` is whether the row existed when last checked. A row another writer
/// inserted since then is refreshed in place instead of raising a conflict.
async fn write_user<C: ConnectionTrait>(
    conn: &C,
    author: &Author,
    known: bool,
) -> Result<UpsertOutcome> {
    let mut model = user::ActiveModel {
        userid: Set(db_id(author.id)?),
        username: Set(author.screen_name.clone()),
        name: Set(author.name.clone()),
        location: Set(author.location.clone()),
        description: Set(author.description.clone()),
        numfollowers: Set(count(author.followers_count)),
        numfriends: Set(count(author.friends_count)),
        numtweets: Set(count(author.statuses_count)),
        timezone: Set(author.time_zone.clone()),
        geoloc: Set(author.geo_enabled),
        verified: Set(author.verified),
        lastupdate: Set(Utc::now()),
        ..Default::default()
    };

    if known {
        model.update(conn).await?;
        return Ok(UpsertOutcome::Updated);
    }

    model.createdat = Set(author.created_at);
    user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Userid)
                .update_columns([
                    user::Column::Username,
                    user::Column::Name,
                    user::Column::Location,
                    user::Column::Description,
                    user::Column::Numfollowers,
                    user::Column::Numfriends,
                    user::Column::Numtweets,
                    user::Column::Timezone,
                    user::Column::Geoloc,
                    user::Column::Verified,
                    user::Column::Lastupdate,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(UpsertOutcome::Created)
}

/// Insert the post if unseen, otherwise refresh its engagement counters.
pub async fn upsert_tweet<C: ConnectionTrait>(conn: &C, status: &Status) -> Result<UpsertOutcome> {
    let tweetid = db_id(status.id)?;

    if tweet_exists(conn, status.id).await? {
        let counters = tweet::ActiveModel {
            tweetid: Set(tweetid),
            rtcount: Set(count(status.retweet_count)),
            fvcount: Set(count(status.favorite_count)),
            ..Default::default()
        };
        counters.update(conn).await?;
        return Ok(UpsertOutcome::Updated);
    }

    let model = tweet::ActiveModel {
        tweetid: Set(tweetid),
        userid: Set(db_id(status.user.id)?),
        text: Set(Some(truncate_chars(status.body(), MAX_TEXT_CHARS))),
        rtcount: Set(count(status.retweet_count)),
        fvcount: Set(count(status.favorite_count)),
        lang: Set(status.lang.as_ref().map(|l| l.to_ascii_lowercase())),
        date: Set(status.created_at),
        source: Set(status.source.clone()),
    };
    tweet::Entity::insert(model).exec_without_returning(conn).await?;
    Ok(UpsertOutcome::Created)
}

pub async fn tweet_exists<C: ConnectionTrait>(conn: &C, id: u64) -> Result<bool> {
    Ok(tweet::Entity::find_by_id(db_id(id)?)
        .one(conn)
        .await?
        .is_some())
}

/// Insert hashtag, mention, url, geotag and media rows that are not yet present.
///
/// Returns the number of rows written.
pub async fn insert_children<C: ConnectionTrait>(
    conn: &C,
    status: &Status,
    stored_media: &[StoredMedia],
) -> Result<u64> {
    let tweetid = db_id(status.id)?;
    let source = db_id(status.user.id)?;
    let mut written = 0u64;

    for tag in &status.entities.hashtags {
        let model = hashtag::ActiveModel {
            tweetid: Set(tweetid),
            tag: Set(tag.text.clone()),
        };
        let result = hashtag::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([hashtag::Column::Tweetid, hashtag::Column::Tag])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await;
        written += inserted(result)? as u64;
    }

    for mentioned in &status.entities.user_mentions {
        let model = mention::ActiveModel {
            tweetid: Set(tweetid),
            target: Set(db_id(mentioned.id)?),
            source: Set(source),
        };
        let result = mention::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([mention::Column::Tweetid, mention::Column::Target])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await;
        written += inserted(result)? as u64;
    }

    for link in &status.entities.urls {
        let Some(target) = link.target() else {
            continue;
        };
        let model = url_data::ActiveModel {
            tweetid: Set(tweetid),
            url: Set(target.to_string()),
        };
        let result = url_data::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([url_data::Column::Tweetid, url_data::Column::Url])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await;
        written += inserted(result)? as u64;
    }

    if let Some((latitude, longitude)) = status.geo_point() {
        let model = geotag::ActiveModel {
            tweetid: Set(tweetid),
            latitude: Set(latitude),
            longitude: Set(longitude),
        };
        let result = geotag::Entity::insert(model)
            .on_conflict(
                OnConflict::column(geotag::Column::Tweetid)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await;
        written += inserted(result)? as u64;
    }

    for item in stored_media {
        let (blob, local_filename) = match &item.content {
            MediaContent::Blob(bytes) => (Some(bytes.clone()), None),
            MediaContent::File(path) => (None, Some(path.clone())),
        };
        let model = media::ActiveModel {
            tweetid: Set(tweetid),
            idx: Set(item.index as i32),
            mediatype: Set(item.kind.clone()),
            blob: Set(blob),
            native_filename: Set(item.native_filename.clone()),
            local_filename: Set(local_filename),
        };
        let result = media::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([media::Column::Tweetid, media::Column::Idx])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await;
        written += inserted(result)? as u64;
    }

    Ok(written)
}

async fn write_event<C: ConnectionTrait>(
    conn: &C,
    status: &Status,
    stored_media: &[StoredMedia],
) -> Result<UpsertOutcome> {
    upsert_user(conn, &status.user).await?;
    let outcome = upsert_tweet(conn, status).await?;
    if outcome == UpsertOutcome::Created {
        let rows = insert_children(conn, status, stored_media).await?;
        debug!(tweet_id = status.id, rows, "Inserted child rows");
    }
    Ok(outcome)
}

/// Persist author, post and children as one unit of work.
///
/// The returned outcome describes the post. When the unit hits a uniqueness
/// conflict it is rolled back. If another writer has stored the post by then the
/// result is [`UpsertOutcome::ConflictResolved`]; otherwise the unit is retried
/// once, and a second conflict on anything but the post is returned as an error.
pub async fn persist_event(
    db: &DatabaseConnection,
    status: &Status,
    stored_media: &[StoredMedia],
) -> Result<UpsertOutcome> {
    match write_in_txn(db, status, stored_media).await {
        Err(e) if e.is_unique_violation() => {
            if tweet_exists(db, status.id).await? {
                debug!(tweet_id = status.id, "Concurrent insert won the race, skipping");
                return Ok(UpsertOutcome::ConflictResolved);
            }
            debug!(tweet_id = status.id, error = %e, "Conflict on a related row, retrying");
        }
        result => return result,
    }

    match write_in_txn(db, status, stored_media).await {
        Err(e) if e.is_unique_violation() => {
            if tweet_exists(db, status.id).await? {
                Ok(UpsertOutcome::ConflictResolved)
            } else {
                Err(e)
            }
        }
        result => result,
    }
}

async fn write_in_txn(
    db: &DatabaseConnection,
    status: &Status,
    stored_media: &[StoredMedia],
) -> Result<UpsertOutcome> {
    let txn = db.begin().await?;
    match write_event(&txn, status, stored_media).await {
        Ok(outcome) => {
            txn.commit().await?;
            Ok(outcome)
        }
        Err(e) => {
            let _ = txn.rollback().await;
            Err(e)
        }
    }
}
