use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "User")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub userid: i64,

    /// Handle, without the leading `@`.
    pub username: String,
    /// Display name.
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub numfollowers: i64,
    pub numfriends: i64,
    pub numtweets: i64,
    pub createdat: Option<DateTimeUtc>,
    pub timezone: Option<String>,
    pub geoloc: bool,
    pub verified: bool,

    /// When this row was last refreshed from a sighting.
    pub lastupdate: DateTimeUtc,

    #[sea_orm(has_many)]
    pub tweets: HasMany<super::tweet::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
