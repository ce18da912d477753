//! Read-only queries over stored posts.
//!
//! Every query filters on an inclusive `[start, end]` range of `Tweet.date` and
//! an optional language code. Language codes are stored lowercased, so the
//! argument is lowercased before comparing.

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
    Select,
};
use serde::Serialize;

use crate::entity::{geotag, hashtag, tweet};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashtagCount {
    pub tag: String,
    pub total: i64,
}

fn in_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    lang: Option<&str>,
) -> Select<tweet::Entity> {
    let mut select = tweet::Entity::find()
        .filter(tweet::Column::Date.gte(start))
        .filter(tweet::Column::Date.lte(end));
    if let Some(lang) = lang {
        select = select.filter(tweet::Column::Lang.eq(lang.to_ascii_lowercase()));
    }
    select
}

/// Posts in the range, oldest first.
pub async fn tweets_in_range<C: ConnectionTrait>(
    db: &C,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    lang: Option<&str>,
    limit: Option<u64>,
) -> Result<Vec<tweet::Model>> {
    let rows = in_range(start, end, lang)
        .order_by_asc(tweet::Column::Date)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows)
}

/// Coordinates of geotagged posts in the range.
pub async fn geotags_in_range<C: ConnectionTrait>(
    db: &C,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    lang: Option<&str>,
    limit: Option<u64>,
) -> Result<Vec<GeoPoint>> {
    let rows = in_range(start, end, lang)
        .find_also_related(geotag::Entity)
        .filter(geotag::Column::Tweetid.is_not_null())
        .limit(limit)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(post, geo)| {
            geo.map(|g| GeoPoint {
                latitude: g.latitude,
                longitude: g.longitude,
                date: post.date,
            })
        })
        .collect())
}

/// Most used hashtags in the range, most frequent first.
pub async fn popular_hashtags<C: ConnectionTrait>(
    db: &C,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    lang: Option<&str>,
    limit: Option<u64>,
) -> Result<Vec<HashtagCount>> {
    let mut posts = SeaQuery::select()
        .column(tweet::Column::Tweetid)
        .from(tweet::Entity)
        .and_where(tweet::Column::Date.gte(start))
        .and_where(tweet::Column::Date.lte(end))
        .to_owned();
    if let Some(lang) = lang {
        posts.and_where(tweet::Column::Lang.eq(lang.to_ascii_lowercase()));
    }

    let rows: Vec<(String, i64)> = hashtag::Entity::find()
        .select_only()
        .column(hashtag::Column::Tag)
        .column_as(hashtag::Column::Tweetid.count(), "total")
        .filter(hashtag::Column::Tweetid.in_subquery(posts))
        .group_by(hashtag::Column::Tag)
        .order_by(hashtag::Column::Tweetid.count(), Order::Desc)
        .order_by_asc(hashtag::Column::Tag)
        .limit(limit)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(tag, total)| HashtagCount { tag, total })
        .collect())
}

/// The instant `hours:minutes:seconds` before now.
pub fn earlier_time(hours: i64, minutes: i64, seconds: i64) -> DateTime<Utc> {
    Utc::now() - (Duration::hours(hours) + Duration::minutes(minutes) + Duration::seconds(seconds))
}
