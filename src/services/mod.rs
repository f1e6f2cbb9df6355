pub mod avatar_storage_service;
