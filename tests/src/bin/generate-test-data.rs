//! Random comment threads, either as the JSON list `quill-ctl render-file`
//! reads (default) or as SQL to load into a quill-server database (`sql`).

use chrono::{Duration, Utc};
use quill_api::{AuthorRef, Comment, CommentId, NewUser, PostId, Role, Time, UserId};
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

const NUM_USERS: usize = 5;
const NUM_POSTS: usize = 3;
const NUM_COMMENTS_PER_POST: usize = 40;

const POST_TITLE_WORDS: usize = 6;
const COMMENT_MAX_WORDS: usize = 40;

/// Chance that a comment is a top-level one rather than a reply
const TOP_LEVEL_PROBABILITY: f64 = 0.3;

fn gen_n_items(table: &str, n: usize, mut f: impl FnMut(usize) -> String) {
    if n == 0 {
        return;
    }
    println!("INSERT INTO {} VALUES", table);
    for i in 0..n {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(i));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn sql_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn sql_time(t: &Time) -> String {
    sql_str(&t.to_rfc3339())
}

fn gen_thread(
    rng: &mut impl Rng,
    post: PostId,
    users: &[NewUser],
    mut date: Time,
) -> Vec<Comment> {
    let mut comments: Vec<Comment> = Vec::with_capacity(NUM_COMMENTS_PER_POST);
    for _ in 0..NUM_COMMENTS_PER_POST {
        let author = users.choose(rng).expect("no users to write comments");
        let parent_id = match comments.is_empty() || rng.gen_bool(TOP_LEVEL_PROBABILITY) {
            true => None,
            false => comments.choose(rng).map(|c| c.id),
        };
        date = date + Duration::seconds(rng.gen_range(1..3600));
        comments.push(Comment {
            id: CommentId(Uuid::new_v4()),
            parent_id,
            post_id: post,
            author_ref: AuthorRef {
                id: author.id,
                name: author.name.clone(),
                avatar_url: None,
            },
            body: lipsum::lipsum_words(rng.gen_range(1..=COMMENT_MAX_WORDS)),
            created_at: date,
        });
    }
    comments
}

fn main() {
    let sql = match std::env::args().nth(1).as_deref() {
        None | Some("json") => false,
        Some("sql") => true,
        Some(other) => {
            eprintln!("unknown output format {other:?}, expected json or sql");
            std::process::exit(1);
        }
    };
    let mut rng = rand::thread_rng();

    // Every user's password is their name
    let users = (0..NUM_USERS)
        .map(|i| {
            let name = format!("user{i}");
            let role = match i {
                0 => Role::Admin,
                1 => Role::Moderator,
                _ => Role::Member,
            };
            NewUser::new(UserId(Uuid::new_v4()), name.clone(), name, role)
        })
        .collect::<Vec<_>>();

    let start = Utc::now() - Duration::days(30);
    let posts = (0..NUM_POSTS)
        .map(|i| {
            let id = PostId(Uuid::new_v4());
            let title = lipsum::lipsum_title();
            let date = start + Duration::days(i as i64);
            (id, title, date)
        })
        .collect::<Vec<_>>();
    let threads = posts
        .iter()
        .map(|(id, _, date)| gen_thread(&mut rng, *id, &users, *date))
        .collect::<Vec<_>>();

    if !sql {
        // the list comes flat and in random order, like from any server
        let mut comments = threads[0].clone();
        comments.shuffle(&mut rng);
        println!(
            "{}",
            serde_json::to_string_pretty(&comments).expect("serializing comments")
        );
        return;
    }

    gen_n_items("users", users.len(), |i| {
        let u = &users[i];
        format!(
            "('{}', {}, {}, '{}')",
            u.id.0,
            sql_str(&u.name),
            sql_str(&u.initial_password_hash),
            u.role
        )
    });
    gen_n_items("posts", posts.len(), |i| {
        let (id, title, date) = &posts[i];
        format!(
            "('{}', '{}', {}, {})",
            id.0,
            users[0].id.0,
            sql_str(title),
            sql_time(date)
        )
    });
    let comments = threads.concat();
    gen_n_items("comments", comments.len(), |i| {
        let c = &comments[i];
        format!(
            "('{}', '{}', {}, '{}', {}, {})",
            c.id.0,
            c.post_id.0,
            match c.parent_id {
                Some(p) => format!("'{}'", p.0),
                None => String::from("NULL"),
            },
            c.author_id().0,
            sql_str(&c.body),
            sql_time(&c.created_at),
        )
    });
}
