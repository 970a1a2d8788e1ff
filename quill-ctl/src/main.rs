use std::{io::Write, path::PathBuf};

use anyhow::Context;
use quill_api::{
    AuthToken, Comment, CommentId, NewPost, NewSession, NewUser, PostId, Role, UserId, Uuid,
};
use quill_client::{build_tree, HttpApi, Thread, ThreadView};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long)]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Create a user (needs ADMIN_TOKEN)
    CreateUser {
        /// Username
        name: String,

        /// Initial password
        initial_password: String,

        /// One of member, moderator or admin
        #[structopt(long, default_value = "member")]
        role: Role,
    },

    /// Create a post that can then be commented on (needs ADMIN_TOKEN)
    CreatePost {
        /// Id of the user who wrote the post
        author: Uuid,

        title: String,
    },

    /// Open a session, and print the token to put in QUILL_TOKEN
    Login { user: String, password: String },

    /// Close the session in QUILL_TOKEN
    Logout,

    /// Show the thread of a post
    Show {
        post: Uuid,

        /// Show all replies instead of only the top-level comments
        #[structopt(long)]
        expand_all: bool,
    },

    /// Comment on a post, or reply to a comment
    Comment {
        post: Uuid,

        text: String,

        #[structopt(long)]
        reply_to: Option<Uuid>,
    },

    /// Replace the text of a comment
    Edit {
        post: Uuid,
        comment: Uuid,
        text: String,
    },

    /// Delete a comment along with all its replies
    Delete {
        post: Uuid,
        comment: Uuid,

        /// Do not ask for confirmation
        #[structopt(long)]
        yes: bool,
    },

    /// Render a JSON list of comments, without talking to any server
    RenderFile {
        path: PathBuf,

        #[structopt(long)]
        expand_all: bool,
    },
}

fn token_from_env(var: &str) -> anyhow::Result<AuthToken> {
    let tok = std::env::var(var).with_context(|| format!("retrieving {var} environment variable"))?;
    let tok = Uuid::try_parse(&tok).with_context(|| format!("parsing {var} as an auth token"))?;
    Ok(AuthToken(tok))
}

fn session_token() -> Option<AuthToken> {
    match token_from_env("QUILL_TOKEN") {
        Ok(tok) => Some(tok),
        Err(err) => {
            tracing::debug!("not logged in: {err:#}");
            None
        }
    }
}

async fn open_thread(host: String, post: Uuid) -> anyhow::Result<Thread<HttpApi>> {
    let api = HttpApi::new(host, session_token());
    let actor = match api.token() {
        Some(_) => Some(api.whoami().await.context("recovering session from QUILL_TOKEN")?),
        None => None,
    };
    let mut thread = Thread::new(api, PostId(post), actor);
    thread.refresh().await.context("fetching comments")?;
    Ok(thread)
}

fn print_thread(thread: &mut Thread<HttpApi>, expand_all: bool) {
    if expand_all {
        thread.expand_all();
    }
    let lines = thread.render();
    if lines.is_empty() {
        println!("No comments yet");
    }
    for line in lines {
        println!("{line}");
    }
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush().context("flushing stdout")?;
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    match opt.cmd {
        Command::CreateUser {
            name,
            initial_password,
            role,
        } => {
            let user = NewUser::new(UserId(Uuid::new_v4()), name, initial_password, role);
            HttpApi::new(opt.host, None)
                .admin_create_user(token_from_env("ADMIN_TOKEN")?, &user)
                .await?;
            println!("{}", user.id.0);
        }
        Command::CreatePost { author, title } => {
            let post = NewPost {
                id: PostId(Uuid::new_v4()),
                author_id: UserId(author),
                title,
            };
            HttpApi::new(opt.host, None)
                .admin_create_post(token_from_env("ADMIN_TOKEN")?, &post)
                .await?;
            println!("{}", post.id.0);
        }
        Command::Login { user, password } => {
            let mut api = HttpApi::new(opt.host, None);
            let tok = api.login(&NewSession { user, password }).await?;
            println!("{}", tok.0);
        }
        Command::Logout => {
            let mut api = HttpApi::new(opt.host, Some(token_from_env("QUILL_TOKEN")?));
            api.logout().await?;
        }
        Command::Show { post, expand_all } => {
            let mut thread = open_thread(opt.host, post).await?;
            print_thread(&mut thread, expand_all);
        }
        Command::Comment {
            post,
            text,
            reply_to,
        } => {
            let mut thread = open_thread(opt.host, post).await?;
            thread.create(reply_to.map(CommentId), &text).await?;
            print_thread(&mut thread, true);
        }
        Command::Edit {
            post,
            comment,
            text,
        } => {
            let mut thread = open_thread(opt.host, post).await?;
            thread.edit(CommentId(comment), &text).await?;
            print_thread(&mut thread, true);
        }
        Command::Delete { post, comment, yes } => {
            let comment = CommentId(comment);
            let mut thread = open_thread(opt.host, post).await?;
            thread.request_delete(comment)?;
            if !yes {
                thread.expand_all();
                for line in thread.render().into_iter().filter(|l| l.id == comment) {
                    println!("{line}");
                }
                if !confirm("Delete this comment and all its replies?")? {
                    thread.cancel_delete(comment);
                    println!("Nothing deleted");
                    return Ok(());
                }
            }
            thread.confirm_delete(comment).await?;
            print_thread(&mut thread, true);
        }
        Command::RenderFile { path, expand_all } => {
            let data = std::fs::read(&path)
                .with_context(|| format!("reading comment list from {path:?}"))?;
            let comments: Vec<Comment> = serde_json::from_slice(&data)
                .with_context(|| format!("parsing comment list from {path:?}"))?;
            let forest = build_tree(comments);
            let mut view = ThreadView::new();
            if expand_all {
                view.expand_all(&forest);
            }
            for line in view.render(&forest, None) {
                println!("{line}");
            }
        }
    }

    Ok(())
}
