use crate::{Dsl, Error, Locals, NodeVisitor, Options, Partial, Partials, Value};

/// Collection items from anything convertible to [`Value`].
pub(crate) fn values<T: Clone + Into<Value>>(items: &[T]) -> Vec<Value> {
    items.iter().cloned().map(Into::into).collect()
}

fn local_items(locals: &Locals, name: &str) -> Vec<Value> {
    match locals.get(name) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn phone(json: &mut dyn NodeVisitor) -> Result<(), Error> {
    json.set("home", "111")?;
    json.set("cell", "222")
}

/// Partials shared by the rendering and search tests.
pub(crate) fn fixture_partials() -> Partials {
    Partials::new()
        .with("_simple", |json, _| json.set("foo", "bar"))
        .with("_comment", |json, _| {
            json.set("title", "some title")?;
            json.object("details", |json| json.set("body", "hello world"))
        })
        .with("_profile", |json, locals| {
            json.set("email", locals.get("email").cloned().unwrap_or_default())
        })
        .with("_post", |json, locals| {
            let post = locals.get("post").cloned().unwrap_or_default();
            json.set("title", post.get("title").cloned().unwrap_or_default())
        })
        .with("_contact_details", |json, _| {
            json.object("contact", |json| json.object("phone", phone))
        })
        .with("_complex", |json, _| {
            json.set_with(
                "details",
                Options::new().partial("_contact_details"),
                |_| Ok(()),
            )
        })
        .with("_complex_children", |json, locals| {
            json.array(&local_items(locals, "children"), |json, _, _| {
                json.array_with(&values(&[0]), Options::new().partial("_complex"), |_, _, _| {
                    Ok(())
                })
            })
        })
        .with("_tagged", |json, _| {
            json.set_with(
                "inner",
                Options::new().partial(Partial::new("_simple").fragment("inner")),
                |_| Ok(()),
            )
        })
}
