use std::collections::BTreeMap;

use anyhow::Context;
use chrono::Utc;
use quad_api::{
    AuthToken, Comment, CommentEdit, CommentId, Course, CourseId, FeedQuery, FollowAction,
    FollowCourse, FollowTag, ListQuery, NewComment, NewCourse, NewPost, NewSession, NewUser,
    OwnPostsQuery, Post, PostEdit, PostId, ProfessorPreference, TargetType, Time, User, UserId,
    Uuid, VoteChange, VoteDirection, VoteOutcome, VoteTarget,
};
use sqlx::Connection;

use crate::{query, Error};

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

const POST_SELECT: &str = "
    SELECT
        p.id, p.author_id, p.title, p.content, p.course_id, p.professor, p.score, p.created_at,
        ARRAY(SELECT pt.tag_name FROM post_tags pt WHERE pt.post_id = p.id) AS tags
    FROM posts p
";

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.author_id, c.content, c.score, c.created_at
    FROM comments c
";

const COURSE_SELECT: &str = r#"
    SELECT
        c.id, c.name, c.code, c.description,
        ARRAY(
            SELECT cp.professor_name FROM course_professors cp
            WHERE cp.course_id = c.id
            ORDER BY cp.professor_name COLLATE "C"
        ) AS professors,
        (SELECT COUNT(*) FROM course_follows cf WHERE cf.course_id = c.id) AS follower_count
    FROM courses c
"#;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    content: String,
    course_id: Option<String>,
    professor: Option<String>,
    tags: Vec<String>,
    score: i64,
    created_at: Time,
}

impl From<PostRow> for Post {
    fn from(r: PostRow) -> Post {
        Post {
            id: PostId(r.id),
            author_id: UserId(r.author_id),
            title: r.title,
            content: r.content,
            course_id: r.course_id.map(CourseId),
            professor: r.professor,
            tags: r.tags.into_iter().collect(),
            score: r.score,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    content: String,
    score: i64,
    created_at: Time,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Comment {
        Comment {
            id: CommentId(r.id),
            post_id: PostId(r.post_id),
            author_id: UserId(r.author_id),
            content: r.content,
            score: r.score,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CourseRow {
    id: String,
    name: String,
    code: String,
    description: Option<String>,
    professors: Vec<String>,
    follower_count: i64,
}

impl From<CourseRow> for Course {
    fn from(r: CourseRow) -> Course {
        Course {
            id: CourseId(r.id),
            name: r.name,
            code: r.code,
            description: r.description,
            professors: r.professors,
            follower_count: r.follower_count,
        }
    }
}

async fn exists(
    conn: &mut sqlx::PgConnection,
    table: &str,
    column: &str,
    id: impl 'static + Send + for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
) -> anyhow::Result<bool> {
    sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE {column} = $1)"
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("checking for existence in {table}"))
}

pub async fn create_user(conn: &mut sqlx::PgConnection, user: NewUser) -> Result<(), Error> {
    if exists(&mut *conn, "users", "name", user.name.clone()).await? {
        return Err(Error::name_already_used(user.name));
    }
    if exists(&mut *conn, "users", "id", user.id.0).await? {
        return Err(Error::uuid_already_used(user.id.0));
    }
    let hash = bcrypt::hash(&user.password, BCRYPT_COST).context("hashing password")?;
    sqlx::query("INSERT INTO users (id, name, password) VALUES ($1, $2, $3)")
        .bind(user.id.0)
        .bind(&user.name)
        .bind(hash)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("inserting user {:?}", user.id))?;
    tracing::info!(id = ?user.id, name = %user.name, "created user");
    Ok(())
}

pub async fn login_user(
    conn: &mut sqlx::PgConnection,
    s: &NewSession,
) -> anyhow::Result<Option<AuthToken>> {
    let user = sqlx::query_as::<_, (Uuid, String)>("SELECT id, password FROM users WHERE name = $1")
        .bind(&s.user)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("fetching password hash for {:?}", s.user))?;
    let (user, hash) = match user {
        Some(u) => u,
        None => return Ok(None),
    };
    if !bcrypt::verify(&s.password, &hash).context("verifying password")? {
        return Ok(None);
    }

    let token = AuthToken(Uuid::new_v4());
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, device, login_time, last_active) VALUES ($1, $2, $3, $4, $4)",
    )
    .bind(token.0)
    .bind(user)
    .bind(&s.device)
    .bind(now)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("inserting session for user {:?}", user))?;
    Ok(Some(token))
}

pub async fn logout_user(conn: &mut sqlx::PgConnection, token: &AuthToken) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(token.0)
        .execute(&mut *conn)
        .await
        .context("deleting session")?;
    Ok(res.rows_affected() == 1)
}

pub async fn recover_session(
    conn: &mut sqlx::PgConnection,
    token: AuthToken,
) -> Result<UserId, Error> {
    let user = sqlx::query_scalar::<_, Uuid>(
        "UPDATE sessions SET last_active = $1 WHERE id = $2 RETURNING user_id",
    )
    .bind(Utc::now())
    .bind(token.0)
    .fetch_optional(&mut *conn)
    .await
    .context("recovering session")?;
    user.map(UserId).ok_or_else(Error::permission_denied)
}

pub async fn fetch_user(conn: &mut sqlx::PgConnection, user: UserId) -> anyhow::Result<User> {
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE id = $1")
        .bind(user.0)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("fetching user {user:?}"))?;
    Ok(User { id: user, name })
}

pub async fn create_course(conn: &mut sqlx::PgConnection, c: NewCourse) -> Result<(), Error> {
    let mut tx = conn.begin().await.context("starting transaction")?;
    if exists(&mut *tx, "courses", "id", c.id.0.clone()).await? {
        return Err(Error::name_already_used(c.id.0));
    }
    sqlx::query("INSERT INTO courses (id, name, code, description) VALUES ($1, $2, $3, $4)")
        .bind(&c.id.0)
        .bind(&c.name)
        .bind(&c.code)
        .bind(&c.description)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("inserting {}", c.id))?;
    sqlx::query(
        "
            INSERT INTO course_professors (course_id, professor_name)
            SELECT $1, UNNEST($2::TEXT[])
            ON CONFLICT DO NOTHING
        ",
    )
    .bind(&c.id.0)
    .bind(&c.professors)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("inserting professors of {}", c.id))?;
    tx.commit().await.context("committing transaction")?;
    tracing::info!(id = %c.id.0, "created course");
    Ok(())
}

pub async fn fetch_courses(conn: &mut sqlx::PgConnection) -> anyhow::Result<Vec<Course>> {
    Ok(sqlx::query_as::<_, CourseRow>(&format!(
        r#"{COURSE_SELECT} ORDER BY follower_count DESC, c.id COLLATE "C""#
    ))
    .fetch_all(&mut *conn)
    .await
    .context("querying courses table")?
    .into_iter()
    .map(Course::from)
    .collect())
}

pub async fn fetch_course(conn: &mut sqlx::PgConnection, id: &CourseId) -> Result<Course, Error> {
    sqlx::query_as::<_, CourseRow>(&format!("{COURSE_SELECT} WHERE c.id = $1"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("fetching {id}"))?
        .map(Course::from)
        .ok_or_else(|| Error::not_found(id))
}

pub async fn fetch_post(conn: &mut sqlx::PgConnection, id: PostId) -> Result<Post, Error> {
    sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = $1 AND NOT p.deleted"))
        .bind(id.0)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("fetching {id}"))?
        .map(Post::from)
        .ok_or_else(|| Error::not_found(id))
}

async fn fetch_posts(
    conn: &mut sqlx::PgConnection,
    sql: query::Sql,
    sort: quad_api::SortBy,
    limit: Option<u32>,
) -> anyhow::Result<Vec<Post>> {
    let text = format!(
        "{POST_SELECT} WHERE {} ORDER BY {} LIMIT {}",
        sql.where_clause,
        query::order_by(sort),
        quad_api::clamp_limit(limit),
    );
    Ok(sql
        .bind_to(sqlx::query_as::<_, PostRow>(&text))
        .fetch_all(&mut *conn)
        .await
        .context("querying posts table")?
        .into_iter()
        .map(Post::from)
        .collect())
}

pub async fn list_posts(conn: &mut sqlx::PgConnection, q: &ListQuery) -> anyhow::Result<Vec<Post>> {
    fetch_posts(conn, query::listing(q), q.sort_by, q.limit).await
}

pub async fn own_posts(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    q: &OwnPostsQuery,
) -> anyhow::Result<Vec<Post>> {
    fetch_posts(conn, query::own_posts(user), quad_api::SortBy::New, q.limit).await
}

pub async fn feed(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    q: &FeedQuery,
    tag_score_floor: i64,
) -> anyhow::Result<Vec<Post>> {
    fetch_posts(conn, query::feed(user, tag_score_floor), q.sort_by, q.limit).await
}

pub async fn create_post(
    conn: &mut sqlx::PgConnection,
    author: UserId,
    p: NewPost,
) -> Result<Post, Error> {
    let mut tx = conn.begin().await.context("starting transaction")?;
    if exists(&mut *tx, "posts", "id", p.id.0).await? {
        return Err(Error::uuid_already_used(p.id.0));
    }
    if let Some(c) = &p.course_id {
        if !exists(&mut *tx, "courses", "id", c.0.clone()).await? {
            return Err(Error::not_found(c));
        }
    }
    let tags = p.tags.iter().cloned().collect::<Vec<String>>();
    sqlx::query("INSERT INTO tags (name) SELECT UNNEST($1::TEXT[]) ON CONFLICT DO NOTHING")
        .bind(&tags)
        .execute(&mut *tx)
        .await
        .context("inserting tags")?;
    sqlx::query(
        "
            INSERT INTO posts (id, author_id, title, content, course_id, professor, score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 1, $7)
        ",
    )
    .bind(p.id.0)
    .bind(author.0)
    .bind(&p.title)
    .bind(&p.content)
    .bind(p.course_id.as_ref().map(|c| &c.0))
    .bind(&p.professor)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .with_context(|| format!("inserting {}", p.id))?;
    sqlx::query("INSERT INTO post_tags (post_id, tag_name) SELECT $1, UNNEST($2::TEXT[])")
        .bind(p.id.0)
        .bind(&tags)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("tagging {}", p.id))?;
    sqlx::query("INSERT INTO post_votes (post_id, user_id, value) VALUES ($1, $2, 1)")
        .bind(p.id.0)
        .bind(author.0)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("recording the author upvote on {}", p.id))?;
    let post = fetch_post(&mut *tx, p.id).await?;
    tx.commit().await.context("committing transaction")?;
    tracing::debug!(id = ?post.id, course = ?post.course_id, "created post");
    Ok(post)
}

/// Checks that the (non-deleted) row exists and is authored by `user`
async fn check_author(
    conn: &mut sqlx::PgConnection,
    table: &str,
    id: Uuid,
    user: UserId,
    what: impl std::fmt::Display,
) -> Result<(), Error> {
    let author = sqlx::query_scalar::<_, Uuid>(&format!(
        "SELECT author_id FROM {table} WHERE id = $1 AND NOT deleted"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .with_context(|| format!("fetching author of {what}"))?;
    match author {
        None => Err(Error::not_found(what)),
        Some(a) if a != user.0 => Err(Error::permission_denied()),
        Some(_) => Ok(()),
    }
}

pub async fn edit_post(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    id: PostId,
    e: PostEdit,
) -> Result<(), Error> {
    check_author(&mut *conn, "posts", id.0, user, id).await?;
    sqlx::query("UPDATE posts SET title = $1, content = $2 WHERE id = $3")
        .bind(&e.title)
        .bind(&e.content)
        .bind(id.0)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("editing {id}"))?;
    Ok(())
}

pub async fn delete_post(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    id: PostId,
) -> Result<(), Error> {
    check_author(&mut *conn, "posts", id.0, user, id).await?;
    sqlx::query("UPDATE posts SET deleted = true WHERE id = $1")
        .bind(id.0)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("deleting {id}"))?;
    tracing::debug!(?id, "soft-deleted post");
    Ok(())
}

pub async fn list_comments(
    conn: &mut sqlx::PgConnection,
    post: PostId,
) -> Result<Vec<Comment>, Error> {
    fetch_post(&mut *conn, post).await?;
    Ok(sqlx::query_as::<_, CommentRow>(&format!(
        "{COMMENT_SELECT} WHERE c.post_id = $1 AND NOT c.deleted ORDER BY c.created_at, c.id"
    ))
    .bind(post.0)
    .fetch_all(&mut *conn)
    .await
    .with_context(|| format!("fetching comments of {post}"))?
    .into_iter()
    .map(Comment::from)
    .collect())
}

pub async fn create_comment(
    conn: &mut sqlx::PgConnection,
    author: UserId,
    c: NewComment,
) -> Result<Comment, Error> {
    let mut tx = conn.begin().await.context("starting transaction")?;
    if exists(&mut *tx, "comments", "id", c.id.0).await? {
        return Err(Error::uuid_already_used(c.id.0));
    }
    fetch_post(&mut *tx, c.post_id).await?;
    let comment = sqlx::query_as::<_, CommentRow>(
        "
            INSERT INTO comments (id, post_id, author_id, content, score, created_at)
            VALUES ($1, $2, $3, $4, 1, $5)
            RETURNING id, post_id, author_id, content, score, created_at
        ",
    )
    .bind(c.id.0)
    .bind(c.post_id.0)
    .bind(author.0)
    .bind(&c.content)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .with_context(|| format!("inserting {}", c.id))?;
    sqlx::query("INSERT INTO comment_votes (comment_id, user_id, value) VALUES ($1, $2, 1)")
        .bind(c.id.0)
        .bind(author.0)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("recording the author upvote on {}", c.id))?;
    tx.commit().await.context("committing transaction")?;
    Ok(Comment::from(comment))
}

pub async fn edit_comment(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    id: CommentId,
    e: CommentEdit,
) -> Result<(), Error> {
    check_author(&mut *conn, "comments", id.0, user, id).await?;
    sqlx::query("UPDATE comments SET content = $1 WHERE id = $2")
        .bind(&e.content)
        .bind(id.0)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("editing {id}"))?;
    Ok(())
}

pub async fn delete_comment(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    id: CommentId,
) -> Result<(), Error> {
    check_author(&mut *conn, "comments", id.0, user, id).await?;
    sqlx::query("UPDATE comments SET deleted = true WHERE id = $1")
        .bind(id.0)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("deleting {id}"))?;
    Ok(())
}

/// Locks the votable row, yielding whether it is gone. A comment is gone too
/// once its post is.
fn lock_query(t: TargetType) -> &'static str {
    match t {
        TargetType::Post => "SELECT deleted FROM posts WHERE id = $1 FOR UPDATE",
        TargetType::Comment => {
            "
                SELECT c.deleted OR p.deleted
                FROM comments c
                INNER JOIN posts p ON p.id = c.post_id
                WHERE c.id = $1
                FOR UPDATE OF c
            "
        }
    }
}

/// (votable table, ledger table, ledger column referencing the votable)
fn vote_tables(t: TargetType) -> (&'static str, &'static str, &'static str) {
    match t {
        TargetType::Post => ("posts", "post_votes", "post_id"),
        TargetType::Comment => ("comments", "comment_votes", "comment_id"),
    }
}

fn target_type(target: VoteTarget) -> TargetType {
    match target {
        VoteTarget::Post(_) => TargetType::Post,
        VoteTarget::Comment(_) => TargetType::Comment,
    }
}

pub async fn cast_vote(
    conn: &mut sqlx::PgConnection,
    voter: UserId,
    target: VoteTarget,
    direction: VoteDirection,
) -> Result<VoteOutcome, Error> {
    let (table, ledger, column) = vote_tables(target_type(target));
    let mut tx = conn.begin().await.context("starting vote transaction")?;

    // Lock the votable so that concurrent votes on it serialize
    let deleted = sqlx::query_scalar::<_, bool>(lock_query(target_type(target)))
        .bind(target.id())
        .fetch_optional(&mut *tx)
        .await
        .with_context(|| format!("locking {target}"))?;
    if deleted != Some(false) {
        return Err(Error::not_found(target));
    }

    let existing = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT value FROM {ledger} WHERE {column} = $1 AND user_id = $2"
    ))
    .bind(target.id())
    .bind(voter.0)
    .fetch_optional(&mut *tx)
    .await
    .with_context(|| format!("reading vote of {voter:?} on {target}"))?
    .map(VoteDirection::try_from)
    .transpose()
    .with_context(|| format!("{ledger} holds an invalid value"))?;

    let change = VoteChange::decide(existing, direction);
    let sql = match change {
        VoteChange::Insert(_) => {
            format!("INSERT INTO {ledger} ({column}, user_id, value) VALUES ($1, $2, $3)")
        }
        VoteChange::Delete(_) => {
            format!("DELETE FROM {ledger} WHERE {column} = $1 AND user_id = $2")
        }
        VoteChange::Flip { .. } => {
            format!("UPDATE {ledger} SET value = $3 WHERE {column} = $1 AND user_id = $2")
        }
    };
    let mut apply = sqlx::query(&sql).bind(target.id()).bind(voter.0);
    if let Some(d) = change.new_value() {
        apply = apply.bind(d.value());
    }
    let res = apply
        .execute(&mut *tx)
        .await
        .with_context(|| format!("applying {change:?} on {target}"))?;
    if res.rows_affected() != 1 {
        return Err(anyhow::anyhow!(
            "applying {change:?} on {target} affected {} rows",
            res.rows_affected()
        )
        .into());
    }

    let score = sqlx::query_scalar::<_, i64>(&format!(
        "UPDATE {table} SET score = score + $1 WHERE id = $2 RETURNING score"
    ))
    .bind(change.score_delta())
    .bind(target.id())
    .fetch_one(&mut *tx)
    .await
    .with_context(|| format!("updating score of {target}"))?;

    tx.commit().await.context("committing vote transaction")?;
    tracing::debug!(?voter, %target, ?change, score, "vote cast");
    Ok(VoteOutcome {
        score,
        user_vote: change.new_value(),
    })
}

pub async fn fetch_vote(
    conn: &mut sqlx::PgConnection,
    voter: UserId,
    target: VoteTarget,
) -> anyhow::Result<Option<VoteDirection>> {
    let (_, ledger, column) = vote_tables(target_type(target));
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT value FROM {ledger} WHERE {column} = $1 AND user_id = $2"
    ))
    .bind(target.id())
    .bind(voter.0)
    .fetch_optional(&mut *conn)
    .await
    .with_context(|| format!("reading vote of {voter:?} on {target}"))?
    .map(VoteDirection::try_from)
    .transpose()
    .with_context(|| format!("{ledger} holds an invalid value"))
}

pub async fn follow_course(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    f: FollowCourse,
) -> Result<(), Error> {
    match f.action {
        FollowAction::Follow => {
            if !exists(&mut *conn, "courses", "id", f.course_id.0.clone()).await? {
                return Err(Error::not_found(&f.course_id));
            }
            sqlx::query(
                "INSERT INTO course_follows (user_id, course_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
        }
        FollowAction::Unfollow => {
            sqlx::query("DELETE FROM course_follows WHERE user_id = $1 AND course_id = $2")
        }
    }
    .bind(user.0)
    .bind(&f.course_id.0)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("{:?} {} for {user:?}", f.action, f.course_id))?;
    Ok(())
}

pub async fn follow_tag(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    f: FollowTag,
) -> Result<(), Error> {
    match f.action {
        FollowAction::Follow => {
            sqlx::query("INSERT INTO tags (name) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(&f.tag_name)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("creating tag {:?}", f.tag_name))?;
            sqlx::query(
                "INSERT INTO tag_follows (user_id, tag_name) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
        }
        FollowAction::Unfollow => {
            sqlx::query("DELETE FROM tag_follows WHERE user_id = $1 AND tag_name = $2")
        }
    }
    .bind(user.0)
    .bind(&f.tag_name)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("{:?} tag {:?} for {user:?}", f.action, f.tag_name))?;
    Ok(())
}

pub async fn set_professor_preference(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    p: ProfessorPreference,
) -> Result<(), Error> {
    if !exists(&mut *conn, "courses", "id", p.course_id.0.clone()).await? {
        return Err(Error::not_found(&p.course_id));
    }
    sqlx::query(
        "
            INSERT INTO professor_preferences (user_id, course_id, professor_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, course_id)
            DO UPDATE SET professor_name = EXCLUDED.professor_name
        ",
    )
    .bind(user.0)
    .bind(&p.course_id.0)
    .bind(&p.professor_name)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("setting professor preference on {} for {user:?}", p.course_id))?;
    Ok(())
}

pub async fn clear_professor_preference(
    conn: &mut sqlx::PgConnection,
    user: UserId,
    course: &CourseId,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM professor_preferences WHERE user_id = $1 AND course_id = $2")
        .bind(user.0)
        .bind(&course.0)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("clearing professor preference on {course} for {user:?}"))?;
    Ok(())
}

pub async fn fetch_followed_courses(
    conn: &mut sqlx::PgConnection,
    user: UserId,
) -> anyhow::Result<Vec<CourseId>> {
    Ok(sqlx::query_scalar::<_, String>(
        r#"SELECT course_id FROM course_follows WHERE user_id = $1 ORDER BY course_id COLLATE "C""#,
    )
    .bind(user.0)
    .fetch_all(&mut *conn)
    .await
    .with_context(|| format!("fetching followed courses of {user:?}"))?
    .into_iter()
    .map(CourseId)
    .collect())
}

pub async fn fetch_followed_tags(
    conn: &mut sqlx::PgConnection,
    user: UserId,
) -> anyhow::Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"SELECT tag_name FROM tag_follows WHERE user_id = $1 ORDER BY tag_name COLLATE "C""#,
    )
    .bind(user.0)
    .fetch_all(&mut *conn)
    .await
    .with_context(|| format!("fetching followed tags of {user:?}"))
}

pub async fn fetch_professor_preferences(
    conn: &mut sqlx::PgConnection,
    user: UserId,
) -> anyhow::Result<BTreeMap<CourseId, String>> {
    Ok(sqlx::query_as::<_, (String, String)>(
        "SELECT course_id, professor_name FROM professor_preferences WHERE user_id = $1",
    )
    .bind(user.0)
    .fetch_all(&mut *conn)
    .await
    .with_context(|| format!("fetching professor preferences of {user:?}"))?
    .into_iter()
    .map(|(c, p)| (CourseId(c), p))
    .collect())
}
