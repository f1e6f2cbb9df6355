use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use diesel::r2d2::{self, ConnectionManager};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::controllers::{
        auth_controller, catalog_controller, debug_controller, group_controller, notification_controller,
        profile_controller, room_controller, user_controller,
};
use crate::ids::IdGenerator;
use crate::repositories::catalog_repository::CatalogRepository;
use crate::repositories::group_repository::GroupRepository;
use crate::repositories::notification_repository::NotificationRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::repositories::room_repository::RoomRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::avatar_storage_service::AvatarStorageService;

pub mod allocation;
pub mod authorization;
pub mod config;
pub mod controllers;
pub mod dtos;
pub mod errors;
pub mod ids;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod services;

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

// Multipart framing on top of the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_pool(config: &Config) -> Result<DbPool, r2d2::PoolError> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        r2d2::Pool::builder().max_size(config.database_pool_size).build(manager)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut connection = pool.get()?;
        let applied = connection.run_pending_migrations(MIGRATIONS)?;

        info!("applied {} pending migration(s)", applied.len());
        Ok(())
}

#[derive(Debug, Clone)]
pub struct AppState {
        pub config: Arc<Config>,

        pub id_generator: IdGenerator,

        pub catalog_repository: CatalogRepository,
        pub group_repository: GroupRepository,
        pub notification_repository: NotificationRepository,
        pub profile_repository: ProfileRepository,
        pub room_repository: RoomRepository,
        pub user_repository: UserRepository,

        pub avatar_storage_service: AvatarStorageService,
}

impl AppState {
        pub fn new(config: Config, pool: DbPool) -> Self {
                AppState {
                        id_generator: IdGenerator::new(config.machine_id, config.node_id),

                        catalog_repository: CatalogRepository::new(pool.clone()),
                        group_repository: GroupRepository::new(pool.clone()),
                        notification_repository: NotificationRepository::new(pool.clone()),
                        profile_repository: ProfileRepository::new(pool.clone()),
                        room_repository: RoomRepository::new(pool.clone()),
                        user_repository: UserRepository::new(pool),

                        avatar_storage_service: AvatarStorageService::new(config.avatar_dir(), config.max_avatar_bytes),

                        config: Arc::new(config),
                }
        }
}

pub fn router(state: AppState) -> Router {
        let avatar_limit = DefaultBodyLimit::max(state.config.max_avatar_bytes + MULTIPART_OVERHEAD_BYTES);
        let uploads = ServeDir::new(&state.config.upload_dir);

        let api = Router::new()
                .route("/register", post(auth_controller::register))
                .route("/login", post(auth_controller::login))
                .route("/user", get(auth_controller::get_auth_user))
                .route("/users/:id/profile", put(user_controller::link_profile))
                .route("/profiles", get(profile_controller::get_profiles).post(profile_controller::create_profile))
                .route("/profiles/unassigned", get(profile_controller::get_profiles_without_group))
                .route("/profiles/available", get(profile_controller::get_unseated_profiles))
                .route(
                        "/profiles/available-for-group/:id",
                        get(profile_controller::get_profiles_available_for_group),
                )
                .route(
                        "/profiles/:id",
                        get(profile_controller::get_profile)
                                .put(profile_controller::update_profile)
                                .delete(profile_controller::delete_profile),
                )
                .route("/profiles/:id/group", put(profile_controller::change_group))
                .route(
                        "/profiles/:id/avatar",
                        post(profile_controller::upload_avatar)
                                .delete(profile_controller::remove_avatar)
                                .layer(avatar_limit),
                )
                .route(
                        "/professions",
                        get(catalog_controller::get_professions).post(catalog_controller::create_profession),
                )
                .route("/subjects", get(catalog_controller::get_subjects).post(catalog_controller::create_subject))
                .route("/groups", get(group_controller::get_groups).post(group_controller::create_group))
                .route(
                        "/groups/:id",
                        get(group_controller::get_group)
                                .put(group_controller::update_group)
                                .delete(group_controller::delete_group),
                )
                .route("/groups/:id/subjects", get(group_controller::get_group_subjects))
                .route("/rooms", get(room_controller::get_rooms).post(room_controller::create_room))
                .route("/rooms/auto-assign", post(room_controller::auto_assign))
                .route(
                        "/rooms/:id",
                        get(room_controller::get_room)
                                .put(room_controller::update_room)
                                .delete(room_controller::delete_room),
                )
                .route("/rooms/:id/members", post(room_controller::add_member))
                .route("/rooms/:id/members/bulk", post(room_controller::add_members))
                .route("/rooms/:id/members/:profile_id", delete(room_controller::remove_member))
                .route("/rooms/:id/groups", post(room_controller::assign_groups))
                .route("/rooms/:id/groups/:group_id", delete(room_controller::remove_group))
                .route(
                        "/notifications",
                        get(notification_controller::get_notifications)
                                .post(notification_controller::create_notification)
                                .delete(notification_controller::delete_notifications),
                )
                .route("/notifications/count", get(notification_controller::get_notification_count))
                .route("/notifications/group-request", post(notification_controller::create_group_request))
                .route("/notifications/read-all", put(notification_controller::mark_all_read))
                .route("/notifications/:id", delete(notification_controller::delete_notification))
                .route("/notifications/:id/read", put(notification_controller::mark_read))
                .route("/notifications/:id/resolve", put(notification_controller::resolve_notification));

        Router::new()
                .route("/health", get(debug_controller::health))
                .nest("/api", api)
                .nest_service("/uploads", uploads)
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .with_state(state)
}
