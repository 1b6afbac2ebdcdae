pub mod ingest;
pub mod init;
pub mod podcast;
pub mod schedule;
pub mod work;
