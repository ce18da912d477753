use clap::Parser;

/// Stream public posts into a relational database.
#[derive(Parser, Debug)]
#[command(name = "tweetdb")]
#[command(about = "Streaming social-media ingestion into a relational store")]
#[command(version)]
pub struct Args {
    /// Config file, extension optional
    #[arg(long, env = "TWEETDB_CONFIG", default_value = "config/config")]
    pub config: String,

    /// Create any missing tables and exit
    #[arg(long, conflicts_with_all = ["drop", "timeline"])]
    pub create: bool,

    /// Drop every table and delete stored media, then exit
    #[arg(long, conflicts_with = "timeline")]
    pub drop: bool,

    /// Confirm --drop
    #[arg(long, requires = "drop")]
    pub yes: bool,

    /// Backfill one user's timeline and exit
    #[arg(long, value_name = "USERID")]
    pub timeline: Option<u64>,

    /// Timeline endpoint used by --timeline
    #[arg(long, default_value = ingest::timeline::DEFAULT_TIMELINE_URL, hide = true)]
    pub timeline_url: String,
}
