use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "Hashtag")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tweetid: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag: String,
    #[sea_orm(belongs_to, from = "tweetid", to = "tweetid")]
    pub tweet: HasOne<super::tweet::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
