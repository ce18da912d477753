use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "Mention")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tweetid: i64,
    /// Mentioned user.
    #[sea_orm(primary_key, auto_increment = false)]
    pub target: i64,
    #[sea_orm(belongs_to, from = "tweetid", to = "tweetid")]
    pub tweet: HasOne<super::tweet::Entity>,

    /// Author of the mentioning post.
    pub source: i64,
}

impl ActiveModelBehavior for ActiveModel {}
