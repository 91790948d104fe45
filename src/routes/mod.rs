use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

pub mod announcements;
pub mod buildings;
pub mod files;
pub mod health;
pub mod users;
pub mod vehicles;
pub mod visitors;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let user_routes = Router::new()
        .route("/", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/status", get(users::status))
        .route("/all", get(users::list_users))
        .route("/updateUser", put(users::update_user))
        .route("/profile", put(users::update_profile))
        .route("/upload", post(users::upload_users))
        .route("/:id", delete(users::delete_user));

    let building_routes = Router::new()
        .route("/create", post(buildings::create_building))
        .route("/all", get(buildings::list_buildings))
        .route("/upload", post(buildings::upload_buildings))
        .route(
            "/settings",
            get(buildings::get_property_settings).put(buildings::update_property_settings),
        )
        .route("/assoc", post(buildings::create_association))
        .route("/assoc/all", get(buildings::list_associations))
        .route(
            "/assoc/:id",
            get(buildings::get_association)
                .put(buildings::update_association)
                .delete(buildings::delete_association),
        )
        .route(
            "/:id",
            get(buildings::get_building)
                .put(buildings::update_building)
                .delete(buildings::delete_building),
        );

    let announcement_routes = Router::new()
        .route(
            "/",
            get(announcements::list_announcements).post(announcements::create_announcement),
        )
        .route("/image", post(announcements::upload_image))
        .route(
            "/:id",
            get(announcements::get_announcement)
                .put(announcements::update_announcement)
                .delete(announcements::delete_announcement),
        );

    let vehicle_routes = Router::new()
        .route("/setting", get(visitors::get_visit_policy))
        .route("/all", get(vehicles::list_vehicles))
        .route("/upload", post(vehicles::upload_vehicles))
        .route("/approve/:id", put(vehicles::approve_vehicle))
        .route("/:id", delete(vehicles::delete_vehicle));

    let visitor_routes = Router::new()
        .route(
            "/",
            get(visitors::list_own_visitors).post(visitors::create_visitor),
        )
        .route("/all", get(visitors::list_all_visitors))
        .route(
            "/setting",
            get(visitors::get_visit_policy).put(visitors::update_visit_policy),
        )
        .route("/:id", put(visitors::update_visitor));

    Router::new()
        .nest("/api/user", user_routes)
        .nest("/api/build", building_routes)
        .nest("/api/announce", announcement_routes)
        .nest("/api/vehicle", vehicle_routes)
        .nest("/api/visitor", visitor_routes)
        .route("/api/health", get(health::health_check))
        .route("/files/*key", get(files::serve_file))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 32))
}
