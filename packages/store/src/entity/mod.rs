pub mod geotag;
pub mod hashtag;
pub mod media;
pub mod mention;
pub mod tweet;
pub mod url_data;
pub mod user;
