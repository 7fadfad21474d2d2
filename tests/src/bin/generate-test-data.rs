use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

const NUM_VOTERS: usize = 30;
const NUM_COMMENTS: usize = 60;
const NUM_COURSE_FOLLOWS: usize = 40;
const COMMENT_WORDS: std::ops::Range<usize> = 6..40;

/// Everyone gets this password, so that any seeded account can be logged into
const PASSWORD: &str = "password123";

/// (id, name, code, description, professors)
const COURSES: &[(&str, &str, &str, &str, &[&str])] = &[
    (
        "cmpt120",
        "Introduction to Computer Science",
        "CMPT 120",
        "Fundamentals of programming and computer science concepts",
        &["Dr. Brian Fraser", "Prof. Nicholas Vincent"],
    ),
    (
        "math152",
        "Calculus II",
        "MATH 152",
        "Integration techniques and applications",
        &["Prof. Jamie Mulholland", "Prof. Michael Monagan"],
    ),
    (
        "cmpt276",
        "Introduction to Software Engineering",
        "CMPT 276",
        "Software development and software project management",
        &["Prof. Saba Alimadadi", "Prof. Steven Pearce"],
    ),
    (
        "cmpt105w",
        "Social Issues and Communication",
        "CMPT 105W",
        "Advanced writing and critical thinking",
        &["Prof. Felix Lo", "Prof. Harinder Khangura"],
    ),
];

struct SeedPost {
    title: &'static str,
    content: &'static str,
    author: &'static str,
    score: usize,
    course: Option<&'static str>,
    professor: Option<&'static str>,
    tags: &'static [&'static str],
}

const POSTS: &[SeedPost] = &[
    SeedPost {
        title: "CMPT 120 Final Exam Tips - Dr. Fraser",
        content: "Dr. Fraser's final is next week! Key topics to focus on: recursion, linked lists and basic algorithms. The exam is mostly coding questions with some theory. Practice the past midterms!",
        author: "cs_student_2024",
        score: 18,
        course: Some("cmpt120"),
        professor: Some("Dr. Brian Fraser"),
        tags: &["study-tips", "finals", "programming"],
    },
    SeedPost {
        title: "CMPT 120 Assignment 3 Help - Recursion",
        content: "Stuck on the recursive binary search problem. Anyone have hints for the base case? I keep getting infinite loops...",
        author: "struggling_coder",
        score: 12,
        course: Some("cmpt120"),
        professor: Some("Prof. Nicholas Vincent"),
        tags: &["homework", "help", "programming"],
    },
    SeedPost {
        title: "CMPT 120 Lab Partner Needed",
        content: "Looking for a lab partner for the rest of the semester. I'm decent at coding but need help with debugging. Meet in AQ library?",
        author: "looking_for_help",
        score: 8,
        course: Some("cmpt120"),
        professor: None,
        tags: &["study-partner", "lab", "help"],
    },
    SeedPost {
        title: "MATH 152 Integration Techniques - Prof. Mulholland",
        content: "Prof. Mulholland's integration by parts method is so much clearer than the textbook. Here's my cheat sheet for the common patterns!",
        author: "math_enthusiast",
        score: 15,
        course: Some("math152"),
        professor: Some("Prof. Jamie Mulholland"),
        tags: &["study-tips", "math", "integration"],
    },
    SeedPost {
        title: "MATH 152 Midterm Review Session",
        content: "Anyone want to form a study group for the midterm next Friday? We can meet in the AQ study rooms and go through practice problems together.",
        author: "study_group_organizer",
        score: 22,
        course: Some("math152"),
        professor: Some("Prof. Michael Monagan"),
        tags: &["study-group", "midterm", "math"],
    },
    SeedPost {
        title: "MATH 152 Assignment 4 - Partial Fractions",
        content: "The partial fractions question is killing me. Can someone explain the decomposition step? I keep getting the wrong coefficients.",
        author: "calculus_struggles",
        score: 9,
        course: Some("math152"),
        professor: None,
        tags: &["homework", "help", "math"],
    },
    SeedPost {
        title: "CMPT 276 Project Ideas - Prof. Alimadadi",
        content: "Prof. Alimadadi suggested some great project ideas for the final project. Web app, mobile app or desktop application: which would you choose?",
        author: "project_planner",
        score: 14,
        course: Some("cmpt276"),
        professor: Some("Prof. Saba Alimadadi"),
        tags: &["project", "software-engineering", "ideas"],
    },
    SeedPost {
        title: "CMPT 276 Team Formation",
        content: "Looking for 2 more team members for our CMPT 276 project. We're thinking of building a study group finder app. DM me if interested!",
        author: "team_builder",
        score: 11,
        course: Some("cmpt276"),
        professor: Some("Prof. Steven Pearce"),
        tags: &["team", "project", "collaboration"],
    },
    SeedPost {
        title: "CMPT 276 Git Workflow Help",
        content: "Our team is having merge conflicts every day. Any tips for a better Git workflow in group projects?",
        author: "git_newbie",
        score: 7,
        course: Some("cmpt276"),
        professor: None,
        tags: &["git", "collaboration", "help"],
    },
    SeedPost {
        title: "CMPT 105W Essay Topic Ideas - Prof. Khangura",
        content: "Prof. Khangura wants us to write about technology's impact on society. Any interesting angles? I'm thinking about social media and mental health.",
        author: "essay_writer",
        score: 13,
        course: Some("cmpt105w"),
        professor: Some("Prof. Harinder Khangura"),
        tags: &["essay", "writing", "technology"],
    },
    SeedPost {
        title: "CMPT 105W Peer Review Partners",
        content: "Need someone to review my draft essay on AI ethics. I can review yours in return! 2000 words, due next Monday.",
        author: "peer_reviewer",
        score: 6,
        course: Some("cmpt105w"),
        professor: Some("Prof. Felix Lo"),
        tags: &["peer-review", "essay", "collaboration"],
    },
    SeedPost {
        title: "Best Study Spots at SFU Burnaby",
        content: "The AQ library is packed during finals. Some hidden gems: 4th floor of the WMC, the quiet study rooms in the SUB and the 24/7 study space in the Applied Sciences building!",
        author: "campus_explorer",
        score: 25,
        course: None,
        professor: None,
        tags: &["campus", "study-spots", "sfu"],
    },
    SeedPost {
        title: "SFU Food Court Recommendations",
        content: "The food court prices are getting ridiculous. Best budget options: the sandwich place near the bookstore, and the Asian food stall has decent portions for the price.",
        author: "hungry_student",
        score: 19,
        course: None,
        professor: None,
        tags: &["food", "campus", "budget"],
    },
    SeedPost {
        title: "Parking at SFU - Pro Tips",
        content: "If you're driving to campus, the best parking is in the West Mall Complex after 2 PM. Before that, you're better off taking the bus.",
        author: "commuter_student",
        score: 16,
        course: None,
        professor: None,
        tags: &["parking", "transportation", "campus"],
    },
    SeedPost {
        title: "SFU Recreation Center - Best Times to Go",
        content: "The gym is packed from 4-7 PM. Best times are early morning (6-8 AM) or late evening (9-11 PM). The pool is usually less crowded on weekends.",
        author: "fitness_enthusiast",
        score: 12,
        course: None,
        professor: None,
        tags: &["gym", "fitness", "campus"],
    },
    SeedPost {
        title: "SFU Clubs and Societies Fair",
        content: "The clubs fair is next week in the SUB! Great way to meet people with similar interests. The computer science club always has cool demos and free pizza.",
        author: "club_organizer",
        score: 14,
        course: None,
        professor: None,
        tags: &["clubs", "social", "campus"],
    },
];

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn quote_opt(s: Option<&str>) -> String {
    s.map(quote).unwrap_or_else(|| String::from("NULL"))
}

fn gen_rows(table: &str, rows: &[String]) {
    if rows.is_empty() {
        return;
    }
    println!("INSERT INTO {} VALUES", table);
    for (i, r) in rows.iter().enumerate() {
        if i != 0 {
            println!(",");
        }
        print!("    {}", r);
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn main() {
    let mut rng = rand::thread_rng();
    let now = Utc::now();
    let hash = bcrypt::hash(PASSWORD, bcrypt::DEFAULT_COST).expect("hashing seed password");

    // Generate users: post authors first, then people who only vote
    let mut users = Vec::new();
    for p in POSTS {
        users.push((Uuid::new_v4(), String::from(p.author)));
    }
    for i in 0..NUM_VOTERS {
        users.push((Uuid::new_v4(), format!("voter{:02}", i + 1)));
    }
    for (_, name) in &users {
        quad_api::validate_name(name).expect("seed user name is invalid");
    }
    gen_rows(
        "users (id, name, password)",
        &users
            .iter()
            .map(|(id, name)| format!("('{}', {}, {})", id, quote(name), quote(&hash)))
            .collect::<Vec<_>>(),
    );
    let voters = &users[POSTS.len()..];

    // Generate courses and their professors
    gen_rows(
        "courses (id, name, code, description)",
        &COURSES
            .iter()
            .map(|(id, name, code, desc, _)| {
                format!("({}, {}, {}, {})", quote(id), quote(name), quote(code), quote(desc))
            })
            .collect::<Vec<_>>(),
    );
    gen_rows(
        "course_professors (course_id, professor_name)",
        &COURSES
            .iter()
            .flat_map(|(id, _, _, _, profs)| {
                profs
                    .iter()
                    .map(move |p| format!("({}, {})", quote(id), quote(p)))
            })
            .collect::<Vec<_>>(),
    );

    // Generate tags
    let mut tags = POSTS
        .iter()
        .flat_map(|p| p.tags.iter().copied())
        .collect::<Vec<_>>();
    tags.sort_unstable();
    tags.dedup();
    for t in &tags {
        quad_api::validate_name(t).expect("seed tag name is invalid");
    }
    gen_rows(
        "tags (name)",
        &tags.iter().map(|t| format!("({})", quote(t))).collect::<Vec<_>>(),
    );

    // Generate posts, with the votes that sum up to their score
    let mut posts = Vec::new();
    let mut post_tags = Vec::new();
    let mut post_votes = Vec::new();
    let mut post_ids = Vec::new();
    for (i, p) in POSTS.iter().enumerate() {
        let id = Uuid::new_v4();
        let (author, _) = &users[i];
        let created_at = now - Duration::hours(rng.gen_range(1..24 * 14));
        post_ids.push((id, created_at));
        posts.push(format!(
            "('{}', '{}', {}, {}, {}, {}, {}, '{}', false)",
            id,
            author,
            quote(p.title),
            quote(p.content),
            quote_opt(p.course),
            quote_opt(p.professor),
            p.score,
            created_at.to_rfc3339(),
        ));
        for t in p.tags {
            post_tags.push(format!("('{}', {})", id, quote(t)));
        }
        // the author's implicit upvote
        post_votes.push(format!("('{}', '{}', 1)", id, author));
        for (voter, _) in voters.choose_multiple(&mut rng, p.score - 1) {
            post_votes.push(format!("('{}', '{}', 1)", id, voter));
        }
    }
    gen_rows(
        "posts (id, author_id, title, content, course_id, professor, score, created_at, deleted)",
        &posts,
    );
    gen_rows("post_tags (post_id, tag_name)", &post_tags);
    gen_rows("post_votes (post_id, user_id, value)", &post_votes);

    // Generate comments, each carrying only its author's upvote
    let mut comments = Vec::new();
    let mut comment_votes = Vec::new();
    for _ in 0..NUM_COMMENTS {
        let id = Uuid::new_v4();
        let (post, post_date) = post_ids.choose(&mut rng).expect("no seed posts");
        let (author, _) = users.choose(&mut rng).expect("no seed users");
        let since_post = (now - *post_date).num_minutes().max(1);
        let created_at = *post_date + Duration::minutes(rng.gen_range(0..since_post));
        comments.push(format!(
            "('{}', '{}', '{}', {}, 1, '{}', false)",
            id,
            post,
            author,
            quote(&lipsum::lipsum_words(rng.gen_range(COMMENT_WORDS))),
            created_at.to_rfc3339(),
        ));
        comment_votes.push(format!("('{}', '{}', 1)", id, author));
    }
    gen_rows(
        "comments (id, post_id, author_id, content, score, created_at, deleted)",
        &comments,
    );
    gen_rows("comment_votes (comment_id, user_id, value)", &comment_votes);

    // Generate course follows
    let mut follows = Vec::new();
    for _ in 0..NUM_COURSE_FOLLOWS {
        let (user, _) = users.choose(&mut rng).expect("no seed users");
        let (course, ..) = COURSES.choose(&mut rng).expect("no seed courses");
        follows.push(format!("('{}', {})", user, quote(course)));
    }
    gen_rows("course_follows (user_id, course_id)", &follows);
}
