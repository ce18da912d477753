use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "Tweet")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tweetid: i64,

    pub userid: i64,
    #[sea_orm(belongs_to, from = "userid", to = "userid")]
    pub user: HasOne<super::user::Entity>,

    /// At most 500 characters.
    pub text: Option<String>,
    pub rtcount: i64,
    pub fvcount: i64,
    /// Lowercased language code.
    pub lang: Option<String>,
    pub date: DateTimeUtc,
    /// Client the post was made from.
    pub source: Option<String>,

    #[sea_orm(has_many)]
    pub hashtags: HasMany<super::hashtag::Entity>,
    #[sea_orm(has_many)]
    pub mentions: HasMany<super::mention::Entity>,
    #[sea_orm(has_many)]
    pub urls: HasMany<super::url_data::Entity>,
    #[sea_orm(has_many)]
    pub media: HasMany<super::media::Entity>,
    #[sea_orm(has_one)]
    pub geotag: HasOne<super::geotag::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
