//! Decoded upstream events.
//!
//! Only the fields the store needs are decoded. Unknown fields are ignored so
//! upstream additions never break ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A post together with its author and attached entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: u64,
    #[serde(with = "upstream_time")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub extended_tweet: Option<ExtendedTweet>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub favorite_count: u64,
    pub user: Author,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default)]
    pub extended_entities: Option<ExtendedEntities>,
    #[serde(default)]
    pub geo: Option<Geo>,
    #[serde(default)]
    pub coordinates: Option<Geo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedTweet {
    pub full_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub friends_count: u64,
    #[serde(default)]
    pub statuses_count: u64,
    #[serde(default, with = "upstream_time::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub geo_enabled: bool,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub hashtags: Vec<HashtagEntity>,
    #[serde(default)]
    pub user_mentions: Vec<MentionEntity>,
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedEntities {
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashtagEntity {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionEntity {
    pub id: u64,
    #[serde(default)]
    pub screen_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlEntity {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub expanded_url: Option<String>,
}

impl UrlEntity {
    /// The expanded target, falling back to the shortened link.
    pub fn target(&self) -> Option<&str> {
        self.expanded_url.as_deref().or(self.url.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntity {
    #[serde(default)]
    pub media_url_https: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl MediaEntity {
    pub fn fetch_url(&self) -> Option<&str> {
        self.media_url_https.as_deref().or(self.media_url.as_deref())
    }
}

/// GeoJSON-ish point. `geo` is `[lat, lon]`, `coordinates` is `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub coordinates: [f64; 2],
}

/// A media reference handed to the fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRef {
    pub index: u32,
    pub url: String,
    pub kind: Option<String>,
}

impl Status {
    /// The untruncated text when upstream provided one.
    pub fn body(&self) -> &str {
        if let Some(ext) = &self.extended_tweet {
            return &ext.full_text;
        }
        self.full_text.as_deref().unwrap_or(&self.text)
    }

    /// `(latitude, longitude)` if the post is geotagged.
    pub fn geo_point(&self) -> Option<(f64, f64)> {
        if let Some(geo) = &self.geo {
            return Some((geo.coordinates[0], geo.coordinates[1]));
        }
        self.coordinates
            .as_ref()
            .map(|c| (c.coordinates[1], c.coordinates[0]))
    }

    /// Attachments in upstream order. `extended_entities` lists every
    /// attachment while `entities.media` only carries the first.
    pub fn media_refs(&self) -> Vec<MediaRef> {
        let media = match &self.extended_entities {
            Some(ext) if !ext.media.is_empty() => &ext.media,
            _ => &self.entities.media,
        };
        media
            .iter()
            .enumerate()
            .filter_map(|(idx, m)| {
                m.fetch_url().map(|url| MediaRef {
                    index: idx as u32,
                    url: url.to_string(),
                    kind: m.kind.clone(),
                })
            })
            .collect()
    }
}

/// One line of the stream, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Status(Box<Status>),
    Delete,
    Limit { track: u64 },
    Disconnect { code: i64, reason: String },
    Warning { code: String, message: String },
    Other,
}

impl StreamMessage {
    /// Decode one line. Blank keep-alive lines yield `Ok(None)`.
    pub fn decode(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(line)?;
        let message = if let Some(limit) = value.get("limit") {
            StreamMessage::Limit {
                track: limit.get("track").and_then(Value::as_u64).unwrap_or(0),
            }
        } else if value.get("delete").is_some() {
            StreamMessage::Delete
        } else if let Some(disconnect) = value.get("disconnect") {
            StreamMessage::Disconnect {
                code: disconnect.get("code").and_then(Value::as_i64).unwrap_or(0),
                reason: disconnect
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }
        } else if let Some(warning) = value.get("warning") {
            StreamMessage::Warning {
                code: warning
                    .get("code")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                message: warning
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }
        } else if value.get("id").is_some() && value.get("user").is_some() {
            StreamMessage::Status(Box::new(serde_json::from_value(value)?))
        } else {
            StreamMessage::Other
        };

        Ok(Some(message))
    }
}

/// Upstream timestamps look like `Wed Oct 10 20:19:24 +0000 2018`.
pub mod upstream_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_str(s, FORMAT).map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let s = Option::<String>::deserialize(deserializer)?;
            s.map(|s| super::parse(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
