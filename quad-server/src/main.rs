use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    routing::{delete, get, post},
    Router,
};
use quad_api::{AuthToken, Uuid, DEFAULT_TAG_SCORE_FLOOR};
use structopt::StructOpt;
use tower_http::trace::TraceLayer;

mod db;
mod error;
mod extractors;
mod fuzz;
mod handlers;
mod query;

use error::Error;
use extractors::*;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(structopt::StructOpt)]
#[structopt(name = "quad-server", about = "Campus forum backend")]
struct Opt {
    /// Postgres connection string
    #[structopt(long, env = "DATABASE_URL")]
    database_url: String,

    #[structopt(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    listen_addr: SocketAddr,

    /// Bearer token allowed to create users and courses
    #[structopt(long, env = "ADMIN_TOKEN")]
    admin_token: Option<Uuid>,

    /// Score a general post needs before feeds show it through a followed tag
    #[structopt(long, env = "TAG_SCORE_FLOOR")]
    tag_score_floor: Option<i64>,
}

pub async fn create_sqlx_pool(db_url: &str) -> anyhow::Result<PgPool> {
    Ok(PgPool::new(
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(8)
            .connect(db_url)
            .await
            .with_context(|| format!("Error opening database {:?}", db_url))?,
    ))
}

pub fn app(db: PgPool, admin_token: Option<AuthToken>, tag_score_floor: i64) -> Router {
    let state = AppState {
        db,
        admin_token,
        feed: FeedConfig { tag_score_floor },
    };
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/admin/create-user", post(handlers::admin_create_user))
        .route(
            "/api/admin/create-course",
            post(handlers::admin_create_course),
        )
        .route("/api/auth", post(handlers::auth))
        .route("/api/unauth", post(handlers::unauth))
        .route("/api/whoami", get(handlers::whoami))
        .route("/api/users/me", get(handlers::me))
        .route("/api/courses", get(handlers::list_courses))
        .route("/api/courses/:id", get(handlers::get_course))
        .route(
            "/api/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/api/posts/:id",
            get(handlers::get_post)
                .put(handlers::edit_post)
                .delete(handlers::delete_post),
        )
        .route("/api/posts/:id/comments", get(handlers::list_comments))
        .route("/api/comments", post(handlers::create_comment))
        .route(
            "/api/comments/:id",
            delete(handlers::delete_comment).put(handlers::edit_comment),
        )
        .route("/api/votes", post(handlers::cast_vote))
        .route("/api/votes/:target_type/:id", get(handlers::get_vote))
        .route("/api/feed", get(handlers::feed))
        .route("/api/users/me/posts", get(handlers::own_posts))
        .route("/api/follows/course", post(handlers::follow_course))
        .route("/api/follows/tag", post(handlers::follow_tag))
        .route(
            "/api/follows/professor-preference",
            post(handlers::set_professor_preference),
        )
        .route(
            "/api/follows/professor-preference/:course_id",
            delete(handlers::clear_professor_preference),
        )
        .route("/api/follows/courses", get(handlers::followed_courses))
        .route("/api/follows/tags", get(handlers::followed_tags))
        .route(
            "/api/follows/professor-preferences",
            get(handlers::professor_preferences),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = Opt::from_args();

    let db = create_sqlx_pool(&opt.database_url).await?;
    MIGRATOR
        .run(&mut *db.acquire().await?)
        .await
        .context("running pending migrations")?;

    let admin_token = opt.admin_token.map(AuthToken);
    if admin_token.is_none() {
        tracing::warn!("no ADMIN_TOKEN set, admin endpoints will reject every request");
    }
    let tag_score_floor = opt.tag_score_floor.unwrap_or(DEFAULT_TAG_SCORE_FLOOR);

    let app = app(db, admin_token, tag_score_floor);

    tracing::info!(addr = %opt.listen_addr, tag_score_floor, "listening");
    axum::Server::bind(&opt.listen_addr)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
