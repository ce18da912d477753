use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "Geotag")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tweetid: i64,
    #[sea_orm(belongs_to, from = "tweetid", to = "tweetid")]
    pub tweet: HasOne<super::tweet::Entity>,

    pub latitude: f64,
    pub longitude: f64,
}

impl ActiveModelBehavior for ActiveModel {}
