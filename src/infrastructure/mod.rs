pub mod database;
pub mod migrations;
pub mod storage;
