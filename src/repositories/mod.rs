pub mod catalog_repository;
pub mod group_repository;
pub mod notification_repository;
pub mod profile_repository;
pub mod room_repository;
pub mod user_repository;
