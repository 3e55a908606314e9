pub mod categories_repository;
pub mod config;
pub mod error;
pub mod notification;
pub mod schedule_repository;
pub mod settings_repository;
pub mod storage;
pub mod templates_repository;
