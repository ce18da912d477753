use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "Media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tweetid: i64,
    /// Position of the attachment within its post.
    #[sea_orm(primary_key, auto_increment = false)]
    pub idx: i32,
    #[sea_orm(belongs_to, from = "tweetid", to = "tweetid")]
    pub tweet: HasOne<super::tweet::Entity>,

    /// Upstream media type, e.g. "photo".
    pub mediatype: Option<String>,
    /// zlib-compressed bytes when stored inline.
    pub blob: Option<Vec<u8>>,
    /// Last path segment of the source URL.
    pub native_filename: Option<String>,
    /// Sharded path when stored on the filesystem.
    pub local_filename: Option<String>,
}

impl ActiveModelBehavior for ActiveModel {}
