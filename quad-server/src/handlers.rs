use std::collections::BTreeMap;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use quad_api::{
    AuthToken, Comment, CommentEdit, CommentId, Course, CourseId, FeedQuery, FollowCourse,
    FollowTag, ListQuery, NewComment, NewCourse, NewPost, NewSession, NewUser, NewVote,
    OwnPostsQuery, Post, PostEdit, PostId, ProfessorPreference, TargetType, User, UserId, Uuid,
    VoteDirection, VoteOutcome, VoteTarget,
};

use crate::{db, extractors::*, Error};

pub async fn health() -> Json<&'static str> {
    Json("ok")
}

pub async fn admin_create_user(
    AdminAuth: AdminAuth,
    mut conn: PgConn,
    Json(data): Json<NewUser>,
) -> Result<(), Error> {
    data.validate()?;
    db::create_user(&mut *conn, data).await
}

pub async fn admin_create_course(
    AdminAuth: AdminAuth,
    mut conn: PgConn,
    Json(data): Json<NewCourse>,
) -> Result<(), Error> {
    data.validate()?;
    db::create_course(&mut *conn, data).await
}

pub async fn auth(
    mut conn: PgConn,
    Json(data): Json<NewSession>,
) -> Result<Json<AuthToken>, Error> {
    data.validate()?;
    Ok(Json(
        db::login_user(&mut *conn, &data)
            .await
            .context("logging user in")?
            .ok_or_else(Error::permission_denied)?,
    ))
}

pub async fn unauth(user: PreAuth, mut conn: PgConn) -> Result<(), Error> {
    match db::logout_user(&mut *conn, &user.0).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::permission_denied()),
        Err(e) => Err(Error::Anyhow(e)),
    }
}

pub async fn whoami(Auth(user): Auth) -> Json<UserId> {
    Json(user)
}

pub async fn me(Auth(user): Auth, mut conn: PgConn) -> Result<Json<User>, Error> {
    Ok(Json(db::fetch_user(&mut *conn, user).await?))
}

pub async fn list_courses(mut conn: PgConn) -> Result<Json<Vec<Course>>, Error> {
    Ok(Json(db::fetch_courses(&mut *conn).await?))
}

pub async fn get_course(mut conn: PgConn, Path(id): Path<String>) -> Result<Json<Course>, Error> {
    quad_api::validate_name(&id)?;
    Ok(Json(db::fetch_course(&mut *conn, &CourseId(id)).await?))
}

pub async fn list_posts(
    mut conn: PgConn,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Post>>, Error> {
    q.validate()?;
    Ok(Json(
        db::list_posts(&mut *conn, &q)
            .await
            .with_context(|| format!("listing posts for {q:?}"))?,
    ))
}

pub async fn get_post(mut conn: PgConn, Path(id): Path<Uuid>) -> Result<Json<Post>, Error> {
    Ok(Json(db::fetch_post(&mut *conn, PostId(id)).await?))
}

pub async fn create_post(
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<NewPost>,
) -> Result<Json<Post>, Error> {
    data.validate()?;
    Ok(Json(db::create_post(&mut *conn, user, data).await?))
}

pub async fn edit_post(
    Auth(user): Auth,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
    Json(data): Json<PostEdit>,
) -> Result<(), Error> {
    data.validate()?;
    db::edit_post(&mut *conn, user, PostId(id), data).await
}

pub async fn delete_post(
    Auth(user): Auth,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
) -> Result<(), Error> {
    db::delete_post(&mut *conn, user, PostId(id)).await
}

pub async fn own_posts(
    Auth(user): Auth,
    mut conn: PgConn,
    Query(q): Query<OwnPostsQuery>,
) -> Result<Json<Vec<Post>>, Error> {
    Ok(Json(
        db::own_posts(&mut *conn, user, &q)
            .await
            .with_context(|| format!("fetching posts of {user:?}"))?,
    ))
}

pub async fn list_comments(
    mut conn: PgConn,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, Error> {
    Ok(Json(db::list_comments(&mut *conn, PostId(id)).await?))
}

pub async fn create_comment(
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<NewComment>,
) -> Result<Json<Comment>, Error> {
    data.validate()?;
    Ok(Json(db::create_comment(&mut *conn, user, data).await?))
}

pub async fn edit_comment(
    Auth(user): Auth,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
    Json(data): Json<CommentEdit>,
) -> Result<(), Error> {
    data.validate()?;
    db::edit_comment(&mut *conn, user, CommentId(id), data).await
}

pub async fn delete_comment(
    Auth(user): Auth,
    mut conn: PgConn,
    Path(id): Path<Uuid>,
) -> Result<(), Error> {
    db::delete_comment(&mut *conn, user, CommentId(id)).await
}

pub async fn cast_vote(
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<NewVote>,
) -> Result<Json<VoteOutcome>, Error> {
    let (target, direction) = data.parse()?;
    Ok(Json(
        db::cast_vote(&mut *conn, user, target, direction).await?,
    ))
}

pub async fn get_vote(
    Auth(user): Auth,
    mut conn: PgConn,
    Path((target_type, id)): Path<(TargetType, Uuid)>,
) -> Result<Json<Option<VoteDirection>>, Error> {
    Ok(Json(
        db::fetch_vote(&mut *conn, user, VoteTarget::new(target_type, id)).await?,
    ))
}

pub async fn feed(
    Auth(user): Auth,
    State(cfg): State<FeedConfig>,
    mut conn: PgConn,
    Query(q): Query<FeedQuery>,
) -> Result<Json<Vec<Post>>, Error> {
    Ok(Json(
        db::feed(&mut *conn, user, &q, cfg.tag_score_floor)
            .await
            .with_context(|| format!("composing feed for {user:?}"))?,
    ))
}

pub async fn follow_course(
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<FollowCourse>,
) -> Result<(), Error> {
    data.validate()?;
    db::follow_course(&mut *conn, user, data).await
}

pub async fn follow_tag(
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<FollowTag>,
) -> Result<(), Error> {
    data.validate()?;
    db::follow_tag(&mut *conn, user, data).await
}

pub async fn set_professor_preference(
    Auth(user): Auth,
    mut conn: PgConn,
    Json(data): Json<ProfessorPreference>,
) -> Result<(), Error> {
    data.validate()?;
    db::set_professor_preference(&mut *conn, user, data).await
}

pub async fn clear_professor_preference(
    Auth(user): Auth,
    mut conn: PgConn,
    Path(course): Path<String>,
) -> Result<(), Error> {
    quad_api::validate_name(&course)?;
    Ok(db::clear_professor_preference(&mut *conn, user, &CourseId(course)).await?)
}

pub async fn followed_courses(
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<Vec<CourseId>>, Error> {
    Ok(Json(db::fetch_followed_courses(&mut *conn, user).await?))
}

pub async fn followed_tags(Auth(user): Auth, mut conn: PgConn) -> Result<Json<Vec<String>>, Error> {
    Ok(Json(db::fetch_followed_tags(&mut *conn, user).await?))
}

pub async fn professor_preferences(
    Auth(user): Auth,
    mut conn: PgConn,
) -> Result<Json<BTreeMap<CourseId, String>>, Error> {
    Ok(Json(db::fetch_professor_preferences(&mut *conn, user).await?))
}
