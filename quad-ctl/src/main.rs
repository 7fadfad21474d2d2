use anyhow::Context;
use quad_api::{AuthToken, CourseId, NewCourse, NewUser, UserId, Uuid};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, env = "QUAD_HOST", default_value = "http://localhost:3000")]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Create a user
    CreateUser {
        /// Username
        name: String,

        /// Initial password
        password: String,
    },

    /// Create a course
    CreateCourse {
        /// Short identifier, eg. cmpt120
        id: String,

        /// Full name of the course
        name: String,

        /// Course code as printed in the calendar, eg. "CMPT 120"
        code: String,

        #[structopt(long)]
        description: Option<String>,

        /// Can be repeated
        #[structopt(long = "professor")]
        professors: Vec<String>,
    },
}

fn admin_token() -> anyhow::Result<AuthToken> {
    let tok =
        std::env::var("ADMIN_TOKEN").context("retrieving ADMIN_TOKEN environment variable")?;
    let tok = Uuid::try_parse(&tok).context("parsing ADMIN_TOKEN as an auth token")?;
    Ok(AuthToken(tok))
}

/// Turns error responses into the API error they carry
async fn check(resp: reqwest::Response) -> anyhow::Result<()> {
    if resp.status().is_success() {
        return Ok(());
    }
    let body = resp.bytes().await.context("reading error response")?;
    let err = quad_api::Error::parse(&body).context("parsing error response")?;
    Err(err.into())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let client = reqwest::Client::new();

    match opt.cmd {
        Command::CreateUser { name, password } => {
            let user = NewUser {
                id: UserId(Uuid::new_v4()),
                name,
                password,
            };
            user.validate()?;
            tracing::info!(id = ?user.id, name = %user.name, "creating user");
            check(
                client
                    .post(format!("{}/api/admin/create-user", opt.host))
                    .json(&user)
                    .bearer_auth(admin_token()?.0)
                    .send()
                    .await?,
            )
            .await?;
        }
        Command::CreateCourse {
            id,
            name,
            code,
            description,
            professors,
        } => {
            let course = NewCourse {
                id: CourseId(id),
                name,
                code,
                description,
                professors,
            };
            course.validate()?;
            tracing::info!(id = %course.id.0, "creating course");
            check(
                client
                    .post(format!("{}/api/admin/create-course", opt.host))
                    .json(&course)
                    .bearer_auth(admin_token()?.0)
                    .send()
                    .await?,
            )
            .await?;
        }
    }

    Ok(())
}
