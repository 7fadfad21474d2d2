#![cfg(test)]

use async_recursion::async_recursion;
use bolero::generator::TypeGenerator;
use axum::{
    extract::FromRequestParts,
    http::{self, request},
};
use quad_api::{
    Comment, CommentEdit, CommentId, Course, CourseId, Error as ApiError, FeedQuery, FollowAction,
    FollowCourse, FollowTag, ListQuery, NewComment, NewCourse, NewPost, NewSession, NewUser,
    NewVote, OwnPostsQuery, Post, PostEdit, PostId, ProfessorPreference, SortBy, TargetType,
    User, UserId, VoteDirection, VoteOutcome, MAX_LIMIT,
};
use quad_mock_server::MockServer;
use std::{
    cmp,
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    ops::RangeTo,
    panic::AssertUnwindSafe,
    path::Path,
};
use tower::{Service, ServiceExt};

use crate::{extractors::*, *};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

fn build_pg_cluster(data: &Path) -> Option<postgresfixture::cluster::Cluster> {
    let mut runtime = None;
    let mut best_version = None;
    for r in postgresfixture::runtime::Runtime::find_on_path() {
        if let Ok(v) = r.version() {
            match (&mut runtime, &mut best_version) {
                (None, None) => {
                    runtime = Some(r);
                    best_version = Some(v);
                }
                (Some(runtime), Some(best_version)) => {
                    if *best_version < v {
                        *runtime = r;
                        *best_version = v;
                    }
                }
                _ => unreachable!(),
            }
        }
    }
    Some(postgresfixture::cluster::Cluster::new(data, runtime?))
}

macro_rules! do_sqlx_test {
    ( $name:ident, $gen:expr, $fn:expr ) => {
        #[test]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                tracing_subscriber::fmt::init();
            }
            let lockfile = tempfile::tempfile().expect("creating tempfile");
            let datadir = tempfile::tempdir().expect("creating tempdir");
            let datadir_path: &Path = datadir.as_ref();
            let cluster = match build_pg_cluster(datadir_path) {
                Some(cluster) => cluster,
                None => {
                    eprintln!(
                        "skipping {}: postgresql seems to not be installed in path",
                        stringify!($name)
                    );
                    return;
                }
            };
            let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
            postgresfixture::coordinate::run_and_destroy(&cluster, lockfile.into(), || {
                cluster.createdb("test_db").expect("creating test_db database");
                let runtime = AssertUnwindSafe(
                    tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                        .expect("failed initializing tokio runtime"),
                );
                // create test db
                let pool = AssertUnwindSafe(runtime.block_on(async move {
                    let pool = create_sqlx_pool(&format!("postgresql://?host={}&dbname=test_db", datadir_path)).await.expect("creating sqlx pool");
                    MIGRATOR
                        .run(&mut *pool.acquire().await.expect("getting migrator connection"))
                        .await
                        .expect("failed applying migrations");
                    pool
                }));
                bolero::check!()
                    .with_generator($gen)
                    .cloned()
                    .for_each(move |v| {
                        let pool = pool.clone();
                        // run the test
                        let idle_before = pool.num_idle();
                        let v_str = format!("{v:?}");
                        let idle_after_res: Result<usize, _> = {
                            let pool = pool.clone();
                            std::panic::catch_unwind(AssertUnwindSafe(|| {
                                runtime.block_on(async move {
                                    let () = $fn(pool.clone(), v).await;
                                    let mut idle_after = pool.num_idle();
                                    let wait_release_since = std::time::Instant::now();
                                    while idle_after < idle_before
                                        && wait_release_since.elapsed()
                                            <= std::time::Duration::from_secs(1)
                                    {
                                        tokio::task::yield_now().await;
                                        idle_after = pool.num_idle();
                                    }
                                    idle_after
                                })
                            }))
                        };
                        runtime.block_on(async move {
                            // cleanup
                            let mut conn =
                                pool.acquire().await.expect("getting db cleanup connection");
                            sqlx::query(include_str!("../reset-test-db.sql"))
                                .execute(&mut *conn)
                                .await
                                .expect("failed cleaning up database");
                        });
                        // resume the panics
                        match idle_after_res {
                            Err(e) => std::panic::resume_unwind(e),
                            Ok(idle_after) => assert!(
                                idle_after >= idle_before,
                                "test {} held onto pool after exiting test: before there were {idle_before} connections, and after there were {idle_after} with value {v_str}",
                                stringify!($name)
                            ),
                        }
                    });
            })
            .expect("coordinating spinup and shutdown of the pg cluster");
        }
    };
}

do_tokio_test!(fuzz_preauth_extractor, String, |token| async move {
    if let Ok(req) = http::Request::builder()
        .method(http::Method::GET)
        .uri("/")
        .header(http::header::AUTHORIZATION, token)
        .body(())
    {
        let mut req = req.into_parts().0;
        let res = PreAuth::from_request_parts(&mut req, &()).await;
        match res {
            Ok(_) => (),
            Err(Error::Api(ApiError::PermissionDenied)) => (),
            Err(e) => panic!("got unexpected error: {e}"),
        }
    }
});

const NAMES: &[&str] = &["alice", "bob", "carol", "dave", "eve", "not valid", ""];
const COURSES: &[&str] = &["cmpt120", "math152", "cmpt276", "cmpt105w", "phys101", "x\0"];
const PROFESSORS: &[&str] = &["Fraser", "Vincent", "Mulholland", "Hobbs", " "];
const TAGS: &[&str] = &["campus", "study-tips", "food", "finals", "bad tag"];
const VOTE_VALUES: &[i64] = &[1, -1, 1, -1, 0, 2];

/// Low enough for random vote sequences to lift general posts into feeds
const FUZZ_TAG_SCORE_FLOOR: i64 = 2;

fn pick<T: Copy>(palette: &[T], i: u8) -> T {
    palette[i as usize % palette.len()]
}

fn pick_set(palette: &[&str], mask: u8) -> BTreeSet<String> {
    palette
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, s)| String::from(*s))
        .collect()
}

fn sort_by_str(s: SortBy) -> &'static str {
    match s {
        SortBy::Score => "score",
        SortBy::New => "new",
    }
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    CreateUser {
        id: u8,
        name: u8,
    },
    Auth {
        uid: usize,
        device: u8,
    },
    Unauth {
        sid: usize,
    },
    Whoami {
        sid: usize,
    },
    Me {
        sid: usize,
    },
    CreateCourse {
        course: u8,
        professors: u8,
    },
    ListCourses,
    CreatePost {
        sid: usize,
        id: u8,
        course: Option<u8>,
        professor: Option<u8>,
        tags: u8,
        blank_title: bool,
    },
    EditPost {
        sid: usize,
        post: usize,
        blank_content: bool,
    },
    DeletePost {
        sid: usize,
        post: usize,
    },
    ListPosts {
        course: Option<u8>,
        sort_by: SortBy,
        limit: Option<u8>,
    },
    OwnPosts {
        sid: usize,
        limit: Option<u8>,
    },
    CreateComment {
        sid: usize,
        id: u8,
        post: usize,
    },
    EditComment {
        sid: usize,
        comment: usize,
    },
    DeleteComment {
        sid: usize,
        comment: usize,
    },
    ListComments {
        post: usize,
    },
    CastVote {
        sid: usize,
        target: usize,
        target_type: TargetType,
        value: u8,
    },
    GetVote {
        sid: usize,
        target: usize,
        target_type: TargetType,
    },
    FollowCourse {
        sid: usize,
        course: u8,
        action: FollowAction,
    },
    FollowTag {
        sid: usize,
        tag: u8,
        action: FollowAction,
    },
    SetProfessorPreference {
        sid: usize,
        course: u8,
        professor: u8,
    },
    ClearProfessorPreference {
        sid: usize,
        course: u8,
    },
    Follows {
        sid: usize,
    },
    Feed {
        sid: usize,
        sort_by: SortBy,
        limit: Option<u8>,
    },
}

async fn call<Req, Resp>(
    app: &mut Router,
    req: request::Request<axum::body::Body>,
    req_body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    app.ready().await.expect("waiting for app to be ready");
    let resp = app.call(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    if status == http::StatusCode::OK {
        if std::any::TypeId::of::<Resp>() == std::any::TypeId::of::<()>() {
            // the server returns an empty string in this situation, which does not parse properly with serde_json
            return Ok(serde_json::from_slice(b"null").unwrap());
        } else {
            return Ok(serde_json::from_slice(&body).unwrap_or_else(|err| {
                panic!(
                    r#"
                        Failed parsing resp body!

                        The error is the following:
                        ---
                        {err}
                        ---

                        Response body is:
                        ---
                        {body:?}
                        ---

                        Request was:
                        ---
                        {req_body:?}
                        ---
                    "#
                )
            }));
        }
    }
    Err(ApiError::parse(&body)
        .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {body:?}")))
}

async fn run_on_app<Req, Resp>(
    app: &mut Router,
    method: &str,
    uri: &str,
    token: Option<Uuid>,
    body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug + serde::Serialize,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    let req = request::Builder::new()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    let req = match token {
        Some(token) => req.header(http::header::AUTHORIZATION, format!("bearer {token}")),
        None => req,
    };
    let req = req
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serializing request body to json"),
        ))
        .expect("building request");
    call(app, req, body).await
}

fn compare<T>(name: &str, app_res: Result<T, ApiError>, mock_res: Result<T, ApiError>)
where
    T: Debug + PartialEq,
{
    assert_eq!(
        app_res, mock_res,
        "app and mock did not return the same result for {name}"
    );
}

fn resize_int(fuzz_id: usize, RangeTo { end }: RangeTo<usize>) -> Option<usize> {
    if end == 0 {
        return None;
    }
    let bucket_size = cmp::max(1, usize::MAX / end); // in case we rounded to 0
    let id = fuzz_id / bucket_size;
    Some(cmp::min(id, end - 1)) // in case id was actually over end - 1 due to rounding
}

/// Everything but the creation date, which the app and the mock cannot agree on
type PostKey = (
    PostId,
    UserId,
    String,
    String,
    Option<CourseId>,
    Option<String>,
    BTreeSet<String>,
    i64,
);

fn post_key(p: Post) -> PostKey {
    (
        p.id,
        p.author_id,
        p.title,
        p.content,
        p.course_id,
        p.professor,
        p.tags,
        p.score,
    )
}

/// Listings are compared as sets, as their order depends on creation dates
fn post_keys(posts: Vec<Post>) -> BTreeMap<PostId, PostKey> {
    posts.into_iter().map(|p| (p.id, post_key(p))).collect()
}

/// Panics unless the app returned `posts` in the order `sort_by` asks for
fn check_order(name: &str, sort_by: SortBy, posts: &[Post]) {
    let mut sorted = posts.to_vec();
    sort_by.sort(&mut sorted);
    assert_eq!(
        posts.iter().map(|p| p.id).collect::<Vec<_>>(),
        sorted.iter().map(|p| p.id).collect::<Vec<_>>(),
        "app returned {name} out of {sort_by:?} order"
    );
}

/// Small limits make truncation visible, `None` compares everything
fn fuzz_limit(limit: Option<u8>) -> u32 {
    limit.map(|l| u32::from(l % 8)).unwrap_or(MAX_LIMIT)
}

/// Compares a listing of the app with the mock's: contents when it was not
/// truncated, only the length otherwise
fn compare_listing(
    name: &str,
    sort_by: SortBy,
    limit: u32,
    app_res: Result<Vec<Post>, ApiError>,
    mock_res: Result<Vec<Post>, ApiError>,
) {
    if let Ok(posts) = &app_res {
        check_order(name, sort_by, posts);
    }
    if limit == MAX_LIMIT {
        compare(name, app_res.map(post_keys), mock_res.map(post_keys));
    } else {
        compare(name, app_res.map(|p| p.len()), mock_res.map(|p| p.len()));
    }
}

type CommentKey = (CommentId, PostId, UserId, String, i64);

fn comment_key(c: Comment) -> CommentKey {
    (c.id, c.post_id, c.author_id, c.content, c.score)
}

#[derive(Clone, Copy)]
struct Session {
    app: AuthToken,
    mock: AuthToken,
}

struct ComparativeFuzzer {
    admin_token: Uuid,
    app: Router,
    mock: MockServer,
    sessions: Vec<Session>,
}

impl ComparativeFuzzer {
    fn new(pool: PgPool) -> ComparativeFuzzer {
        let admin_token = Uuid::new_v4();
        let app = app(pool, Some(AuthToken(admin_token)), FUZZ_TAG_SCORE_FLOOR);
        let mock = MockServer::new(FUZZ_TAG_SCORE_FLOOR);
        let sessions = Vec::new();
        ComparativeFuzzer {
            admin_token,
            app,
            mock,
            sessions,
        }
    }

    fn session(&self, sid: usize) -> Option<Session> {
        resize_int(sid, ..self.sessions.len()).map(|s| self.sessions[s])
    }

    fn post_id(&self, post: usize) -> PostId {
        let posts = self.mock.test_post_ids();
        match resize_int(post, ..posts.len()) {
            Some(i) => posts[i],
            None => PostId::stub(),
        }
    }

    fn comment_id(&self, comment: usize) -> CommentId {
        let comments = self.mock.test_comment_ids();
        match resize_int(comment, ..comments.len()) {
            Some(i) => comments[i],
            None => CommentId::stub(),
        }
    }

    fn target_id(&self, target: usize, target_type: TargetType) -> Uuid {
        match target_type {
            TargetType::Post => self.post_id(target).0,
            TargetType::Comment => self.comment_id(target).0,
        }
    }

    #[async_recursion]
    async fn execute_fuzz_op(&mut self, op: FuzzOp) {
        macro_rules! with_session {
            ($sid:expr) => {
                match self.session($sid) {
                    Some(s) => s,
                    None => {
                        self.execute_fuzz_op(FuzzOp::Auth { uid: 0, device: 0 })
                            .await;
                        return self.execute_fuzz_op(op).await;
                    }
                }
            };
        }

        match op {
            FuzzOp::CreateUser { id, name } => {
                let new_user = NewUser {
                    id: UserId(Uuid::from_u128(id as u128 + 1)),
                    name: String::from(pick(NAMES, name)),
                    password: String::from("password123"),
                };
                compare(
                    "CreateUser",
                    run_on_app(
                        &mut self.app,
                        "POST",
                        "/api/admin/create-user",
                        Some(self.admin_token),
                        &new_user,
                    )
                    .await,
                    self.mock.admin_create_user(new_user),
                )
            }
            FuzzOp::Auth { uid, device } => {
                if let Some(uid) = resize_int(uid, ..self.mock.test_num_users()) {
                    let (user, password) = self.mock.test_get_user_info(uid);
                    let session = NewSession {
                        user: String::from(user),
                        password: String::from(password),
                        device: format!("device{device}"),
                    };
                    let app_tok =
                        run_on_app(&mut self.app, "POST", "/api/auth", None, &session).await;
                    let mock_tok = self.mock.auth(session);
                    if let (&Ok(app), &Ok(mock)) = (&app_tok, &mock_tok) {
                        self.sessions.push(Session { app, mock });
                    }
                    compare("Auth", app_tok.map(|_| ()), mock_tok.map(|_| ()));
                } else {
                    self.execute_fuzz_op(FuzzOp::CreateUser { id: 0, name: 0 })
                        .await;
                    self.execute_fuzz_op(FuzzOp::Auth { uid, device }).await;
                }
            }
            FuzzOp::Unauth { sid } => {
                let s = with_session!(sid);
                compare(
                    "Unauth",
                    run_on_app(&mut self.app, "POST", "/api/unauth", Some(s.app.0), &()).await,
                    self.mock.unauth(s.mock),
                );
            }
            FuzzOp::Whoami { sid } => {
                let s = with_session!(sid);
                compare(
                    "Whoami",
                    run_on_app(&mut self.app, "GET", "/api/whoami", Some(s.app.0), &()).await,
                    self.mock.whoami(s.mock),
                );
            }
            FuzzOp::Me { sid } => {
                let s = with_session!(sid);
                compare::<User>(
                    "Me",
                    run_on_app(&mut self.app, "GET", "/api/users/me", Some(s.app.0), &()).await,
                    self.mock.me(s.mock),
                );
            }
            FuzzOp::CreateCourse { course, professors } => {
                let id = pick(COURSES, course);
                let new_course = NewCourse {
                    id: CourseId::new(id),
                    name: format!("Course {id}"),
                    code: id.to_uppercase(),
                    description: None,
                    professors: pick_set(PROFESSORS, professors).into_iter().collect(),
                };
                compare(
                    "CreateCourse",
                    run_on_app(
                        &mut self.app,
                        "POST",
                        "/api/admin/create-course",
                        Some(self.admin_token),
                        &new_course,
                    )
                    .await,
                    self.mock.admin_create_course(new_course),
                );
            }
            FuzzOp::ListCourses => {
                compare::<Vec<Course>>(
                    "ListCourses",
                    run_on_app(&mut self.app, "GET", "/api/courses", None, &()).await,
                    Ok(self.mock.list_courses()),
                );
            }
            FuzzOp::CreatePost {
                sid,
                id,
                course,
                professor,
                tags,
                blank_title,
            } => {
                let s = with_session!(sid);
                let new_post = NewPost {
                    id: PostId(Uuid::from_u128(id as u128 + 1)),
                    title: String::from(if blank_title { "  " } else { "Midterm tips" }),
                    content: String::from("Anyone has notes from last week?"),
                    course_id: course.map(|c| CourseId::new(pick(COURSES, c))),
                    professor: professor.map(|p| String::from(pick(PROFESSORS, p))),
                    tags: pick_set(TAGS, tags),
                };
                compare(
                    "CreatePost",
                    run_on_app::<_, Post>(
                        &mut self.app,
                        "POST",
                        "/api/posts",
                        Some(s.app.0),
                        &new_post,
                    )
                    .await
                    .map(post_key),
                    self.mock.create_post(s.mock, new_post).map(post_key),
                );
            }
            FuzzOp::EditPost {
                sid,
                post,
                blank_content,
            } => {
                let s = with_session!(sid);
                let id = self.post_id(post);
                let edit = PostEdit {
                    title: String::from("Edited"),
                    content: String::from(if blank_content { "" } else { "Found them" }),
                };
                compare(
                    "EditPost",
                    run_on_app(
                        &mut self.app,
                        "PUT",
                        &format!("/api/posts/{}", id.0),
                        Some(s.app.0),
                        &edit,
                    )
                    .await,
                    self.mock.edit_post(s.mock, id, edit),
                );
            }
            FuzzOp::DeletePost { sid, post } => {
                let s = with_session!(sid);
                let id = self.post_id(post);
                compare(
                    "DeletePost",
                    run_on_app(
                        &mut self.app,
                        "DELETE",
                        &format!("/api/posts/{}", id.0),
                        Some(s.app.0),
                        &(),
                    )
                    .await,
                    self.mock.delete_post(s.mock, id),
                );
            }
            FuzzOp::ListPosts {
                course,
                sort_by,
                limit,
            } => {
                let limit = fuzz_limit(limit);
                let q = ListQuery {
                    course_id: course.map(|c| CourseId::new(pick(COURSES, c))),
                    sort_by,
                    limit: Some(limit),
                };
                let mut uri = format!(
                    "/api/posts?sort_by={}&limit={limit}",
                    sort_by_str(sort_by)
                );
                if let Some(c) = &q.course_id {
                    uri.push_str(&format!("&course_id={}", urlencoding::encode(&c.0)));
                }
                compare_listing(
                    "ListPosts",
                    sort_by,
                    limit,
                    run_on_app(&mut self.app, "GET", &uri, None, &()).await,
                    self.mock.list_posts(&q),
                );
            }
            FuzzOp::OwnPosts { sid, limit } => {
                let s = with_session!(sid);
                let limit = fuzz_limit(limit);
                let q = OwnPostsQuery { limit: Some(limit) };
                compare_listing(
                    "OwnPosts",
                    SortBy::New,
                    limit,
                    run_on_app(
                        &mut self.app,
                        "GET",
                        &format!("/api/users/me/posts?limit={limit}"),
                        Some(s.app.0),
                        &(),
                    )
                    .await,
                    self.mock.own_posts(s.mock, &q),
                );
            }
            FuzzOp::CreateComment { sid, id, post } => {
                let s = with_session!(sid);
                let new_comment = NewComment {
                    id: CommentId(Uuid::from_u128(id as u128 + 1)),
                    post_id: self.post_id(post),
                    content: String::from("Same question here"),
                };
                compare(
                    "CreateComment",
                    run_on_app::<_, Comment>(
                        &mut self.app,
                        "POST",
                        "/api/comments",
                        Some(s.app.0),
                        &new_comment,
                    )
                    .await
                    .map(comment_key),
                    self.mock
                        .create_comment(s.mock, new_comment)
                        .map(comment_key),
                );
            }
            FuzzOp::EditComment { sid, comment } => {
                let s = with_session!(sid);
                let id = self.comment_id(comment);
                let edit = CommentEdit {
                    content: String::from("Never mind, found it"),
                };
                compare(
                    "EditComment",
                    run_on_app(
                        &mut self.app,
                        "PUT",
                        &format!("/api/comments/{}", id.0),
                        Some(s.app.0),
                        &edit,
                    )
                    .await,
                    self.mock.edit_comment(s.mock, id, edit),
                );
            }
            FuzzOp::DeleteComment { sid, comment } => {
                let s = with_session!(sid);
                let id = self.comment_id(comment);
                compare(
                    "DeleteComment",
                    run_on_app(
                        &mut self.app,
                        "DELETE",
                        &format!("/api/comments/{}", id.0),
                        Some(s.app.0),
                        &(),
                    )
                    .await,
                    self.mock.delete_comment(s.mock, id),
                );
            }
            FuzzOp::ListComments { post } => {
                let id = self.post_id(post);
                compare(
                    "ListComments",
                    run_on_app::<_, Vec<Comment>>(
                        &mut self.app,
                        "GET",
                        &format!("/api/posts/{}/comments", id.0),
                        None,
                        &(),
                    )
                    .await
                    .map(|c| c.into_iter().map(comment_key).collect::<BTreeSet<_>>()),
                    self.mock
                        .list_comments(id)
                        .map(|c| c.into_iter().map(comment_key).collect::<BTreeSet<_>>()),
                );
            }
            FuzzOp::CastVote {
                sid,
                target,
                target_type,
                value,
            } => {
                let s = with_session!(sid);
                let vote = NewVote {
                    target_id: self.target_id(target, target_type),
                    target_type,
                    value: pick(VOTE_VALUES, value),
                };
                compare::<VoteOutcome>(
                    "CastVote",
                    run_on_app(&mut self.app, "POST", "/api/votes", Some(s.app.0), &vote).await,
                    self.mock.cast_vote(s.mock, vote),
                );
            }
            FuzzOp::GetVote {
                sid,
                target,
                target_type,
            } => {
                let s = with_session!(sid);
                let id = self.target_id(target, target_type);
                let uri = match target_type {
                    TargetType::Post => format!("/api/votes/post/{id}"),
                    TargetType::Comment => format!("/api/votes/comment/{id}"),
                };
                compare::<Option<VoteDirection>>(
                    "GetVote",
                    run_on_app(&mut self.app, "GET", &uri, Some(s.app.0), &()).await,
                    self.mock.get_vote(s.mock, target_type, id),
                );
            }
            FuzzOp::FollowCourse {
                sid,
                course,
                action,
            } => {
                let s = with_session!(sid);
                let f = FollowCourse {
                    course_id: CourseId::new(pick(COURSES, course)),
                    action,
                };
                compare(
                    "FollowCourse",
                    run_on_app(
                        &mut self.app,
                        "POST",
                        "/api/follows/course",
                        Some(s.app.0),
                        &f,
                    )
                    .await,
                    self.mock.follow_course(s.mock, f),
                );
            }
            FuzzOp::FollowTag { sid, tag, action } => {
                let s = with_session!(sid);
                let f = FollowTag {
                    tag_name: String::from(pick(TAGS, tag)),
                    action,
                };
                compare(
                    "FollowTag",
                    run_on_app(&mut self.app, "POST", "/api/follows/tag", Some(s.app.0), &f)
                        .await,
                    self.mock.follow_tag(s.mock, f),
                );
            }
            FuzzOp::SetProfessorPreference {
                sid,
                course,
                professor,
            } => {
                let s = with_session!(sid);
                let p = ProfessorPreference {
                    course_id: CourseId::new(pick(COURSES, course)),
                    professor_name: String::from(pick(PROFESSORS, professor)),
                };
                compare(
                    "SetProfessorPreference",
                    run_on_app(
                        &mut self.app,
                        "POST",
                        "/api/follows/professor-preference",
                        Some(s.app.0),
                        &p,
                    )
                    .await,
                    self.mock.set_professor_preference(s.mock, p),
                );
            }
            FuzzOp::ClearProfessorPreference { sid, course } => {
                let s = with_session!(sid);
                let course = CourseId::new(pick(COURSES, course));
                compare(
                    "ClearProfessorPreference",
                    run_on_app(
                        &mut self.app,
                        "DELETE",
                        &format!(
                            "/api/follows/professor-preference/{}",
                            urlencoding::encode(&course.0)
                        ),
                        Some(s.app.0),
                        &(),
                    )
                    .await,
                    self.mock.clear_professor_preference(s.mock, &course),
                );
            }
            FuzzOp::Follows { sid } => {
                let s = with_session!(sid);
                compare::<Vec<CourseId>>(
                    "FollowedCourses",
                    run_on_app(
                        &mut self.app,
                        "GET",
                        "/api/follows/courses",
                        Some(s.app.0),
                        &(),
                    )
                    .await,
                    self.mock.followed_courses(s.mock),
                );
                compare::<Vec<String>>(
                    "FollowedTags",
                    run_on_app(&mut self.app, "GET", "/api/follows/tags", Some(s.app.0), &())
                        .await,
                    self.mock.followed_tags(s.mock),
                );
                compare::<BTreeMap<CourseId, String>>(
                    "ProfessorPreferences",
                    run_on_app(
                        &mut self.app,
                        "GET",
                        "/api/follows/professor-preferences",
                        Some(s.app.0),
                        &(),
                    )
                    .await,
                    self.mock.professor_preferences(s.mock),
                );
            }
            FuzzOp::Feed {
                sid,
                sort_by,
                limit,
            } => {
                let s = with_session!(sid);
                let limit = fuzz_limit(limit);
                let q = FeedQuery {
                    sort_by,
                    limit: Some(limit),
                };
                compare_listing(
                    "Feed",
                    sort_by,
                    limit,
                    run_on_app(
                        &mut self.app,
                        "GET",
                        &format!(
                            "/api/feed?sort_by={}&limit={limit}",
                            sort_by_str(sort_by)
                        ),
                        Some(s.app.0),
                        &(),
                    )
                    .await,
                    self.mock.feed(s.mock, &q),
                );
            }
        }
    }

    /// Every live post must have the same score on both sides, and the mock's
    /// scores must match its ledger
    async fn check_scores(&mut self) {
        self.mock.test_check_scores();
        let q = ListQuery {
            limit: Some(MAX_LIMIT),
            ..ListQuery::default()
        };
        compare_listing(
            "FinalScores",
            SortBy::Score,
            MAX_LIMIT,
            run_on_app(
                &mut self.app,
                "GET",
                &format!("/api/posts?limit={MAX_LIMIT}"),
                None,
                &(),
            )
            .await,
            self.mock.list_posts(&q),
        );
    }
}

do_sqlx_test!(
    compare_with_mock,
    bolero::generator::gen_with::<Vec<FuzzOp>>().len(1..100usize),
    |pool, test: Vec<FuzzOp>| async move {
        let mut fuzzer = ComparativeFuzzer::new(pool);
        for op in test {
            fuzzer.execute_fuzz_op(op).await;
        }
        fuzzer.check_scores().await;
    }
);
