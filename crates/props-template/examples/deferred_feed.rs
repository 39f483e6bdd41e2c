//! Renders a feed page the way a server would answer two requests: the
//! initial page load, where slow parts are deferred behind placeholders, and
//! the follow-up request the client makes for each deferred node.
//!
//! The page is described once. The follow-up passes the `props_at` query
//! parameter back as a `dig` path, so the same builder calls render only the
//! requested node.
//!
//! Run with
//!
//! ```bash
//! cargo run -p props-template --example deferred_feed
//! ```

use props_template::{
    Defer, Dsl, Env, Error, MemoryStore, NodeVisitor, Options, Partial, Partials, PathSegment,
    RenderVisitor, Rendered, Value,
};

fn feed(json: &mut dyn NodeVisitor, posts: &[Value]) -> Result<(), Error> {
    json.set("title", "Latest posts")?;
    json.object("posts", |json| {
        let options = Options::new()
            .id_key("id")
            .partial(Partial::new("posts/_post").fragment("post"))
            .cache_with(|post| {
                let id = post.get("id").cloned().unwrap_or_default();
                format!("post-{id}")
            });
        json.array_with(posts, options, |_, _, _| Ok(()))
    })?;
    json.set_with(
        "recommendations",
        Options::new().defer(Defer::auto().placeholder(Vec::<Value>::new())),
        |json| {
            json.array_children(|json| {
                json.child(|json| json.set("title", "You might also like"))
            })
        },
    )
}

fn respond(
    partials: &Partials,
    store: &MemoryStore,
    request: &str,
    posts: &[Value],
) -> Result<Rendered, Error> {
    let props_at = request
        .split_once("props_at=")
        .map(|(_, path)| path.replace("%3D", "="))
        .unwrap_or_default();
    let mut json = RenderVisitor::new(
        Env::new()
            .partials(partials)
            .store(store)
            .request(request.to_owned()),
    );
    json.set_with(
        "data",
        Options::new().dig(PathSegment::parse_dotted(&props_at)),
        |json| feed(json, posts),
    )?;
    Ok(json.finish())
}

fn main() -> Result<(), Error> {
    let partials = Partials::new().with("posts/_post", |json, locals| {
        let post = locals.get("post").cloned().unwrap_or_default();
        json.extract(&post, ["title"])?;
        json.set_with(
            "comments",
            Options::new().defer(Defer::manual()),
            |json| json.set("count", 12),
        )
    });
    let store = MemoryStore::new();
    let posts = vec![
        Value::object([("id", Value::from(1)), ("title", Value::from("Hello"))]),
        Value::object([("id", Value::from(2)), ("title", Value::from("World"))]),
    ];

    let page = respond(&partials, &store, "/feed", &posts)?;
    println!("GET /feed");
    println!("  {}", page.json);
    for fragment in &page.fragments {
        println!("  fragment {} at {}", fragment.id, fragment.path);
    }

    for deferred in &page.deferred {
        let follow_up = respond(&partials, &store, &deferred.url, &posts)?;
        println!("GET {} ({})", deferred.url, deferred.kind);
        println!("  {}", follow_up.json);
    }
    Ok(())
}
