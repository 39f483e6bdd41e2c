use super::utils::{fixture_partials, values};
use crate::{
    Dsl, Env, Error, NodeVisitor, Options, Partial, Partials, PathSegment, RenderVisitor,
    Rendered, path,
};

fn render_with<F>(partials: &Partials, build: F) -> Result<Rendered, Error>
where
    F: FnOnce(&mut RenderVisitor<'_>) -> Result<(), Error>,
{
    let mut json = RenderVisitor::new(Env::new().partials(partials).request("/some_url"));
    build(&mut json)?;
    Ok(json.finish())
}

fn render<F>(build: F) -> String
where
    F: FnOnce(&mut RenderVisitor<'_>) -> Result<(), Error>,
{
    render_with(&fixture_partials(), build).unwrap().json
}

fn dig(path: Vec<PathSegment>) -> Options {
    Options::new().dig(path)
}

#[test]
fn finds_a_node_and_renders_it_under_the_root_key() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "comment", "details"]), |json| {
            json.object("comment", |json| {
                json.object("details", |json| json.set("name", "john"))
            })
        })?;
        json.set("foo", "bar")
    });
    assert_eq!(out, r#"{"data":{"name":"john"},"foo":"bar"}"#);
}

#[test]
fn search_is_an_alias_of_dig() {
    let out = render(|json| {
        json.set_with(
            "data",
            Options::new().search(path!["data", "inner"]),
            |json| json.object("inner", |json| json.set("a", 1)),
        )
    });
    assert_eq!(out, r#"{"data":{"a":1}}"#);
}

#[test]
fn finds_an_empty_node() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "inner"]), |json| {
            json.object("inner", |_| Ok(()))
        })?;
        json.set("foo", "bar")
    });
    assert_eq!(out, r#"{"data":{},"foo":"bar"}"#);
}

#[test]
fn misses_omit_the_key() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "does_not_exist"]), |json| {
            json.object("inner", |_| Ok(()))
        })?;
        json.set("foo", "bar")
    });
    assert_eq!(out, r#"{"foo":"bar"}"#);
}

#[test]
fn empty_paths_render_normally() {
    let out = render(|json| {
        json.set_with("data", dig(path![]), |json| json.object("inner", |_| Ok(())))?;
        json.set("foo", "bar")
    });
    assert_eq!(out, r#"{"data":{"inner":{}},"foo":"bar"}"#);
}

#[test]
fn siblings_off_the_path_never_run() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer", "inner"]), |json| {
            json.object("bad", |_| panic!("sibling before the match was entered"))?;
            json.object("inner", |json| json.set("foo", 32))?;
            json.object("also_bad", |_| panic!("sibling after the match was entered"))
        })
    });
    assert_eq!(out, r#"{"outer":{"foo":32}}"#);
}

#[test]
fn searches_on_multiple_siblings() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer", "inner"]), |json| {
            json.object("inner", |json| json.set("foo", 32))
        })?;
        json.set_with("first", dig(path!["first", "second"]), |json| {
            json.object("second", |json| json.set("bar", "cool"))
        })
    });
    assert_eq!(out, r#"{"outer":{"foo":32},"first":{"bar":"cool"}}"#);
}

#[test]
fn found_nodes_may_search_again() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer"]), |json| {
            json.set_with("inner", dig(path!["inner", "foo"]), |json| {
                json.object("foo", |json| json.set("firstName", "john"))
            })
        })
    });
    assert_eq!(out, r#"{"outer":{"inner":{"firstName":"john"}}}"#);
}

#[test]
fn nested_dig_options_are_ignored_while_searching() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer", "inner", "foo"]), |json| {
            json.set_with("inner", dig(path!["does_not_exist"]), |json| {
                json.object("foo", |json| json.set("firstName", "john"))
            })
        })
    });
    assert_eq!(out, r#"{"outer":{"firstName":"john"}}"#);
}

#[test]
fn finds_a_subtree() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer", "inner", "deep"]), |json| {
            json.object("inner", |json| {
                json.object("deep", |json| {
                    json.object("deeper", |json| json.set("foo", 32))
                })
            })
        })
    });
    assert_eq!(out, r#"{"outer":{"deeper":{"foo":32}}}"#);
}

#[test]
fn scalar_leaves_are_not_found() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer", "inner", "foo"]), |json| {
            json.object("inner", |json| json.set("foo", 32))
        })?;
        json.set("foo", "bar")
    });
    assert_eq!(out, r#"{"foo":"bar"}"#);
}

#[test]
fn paths_not_starting_at_the_node_are_not_found() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["inner", "a", "b"]), |json| {
            json.object("inner", |json| json.set("foo", 32))
        })?;
        json.set("foo", "bar")
    });
    assert_eq!(out, r#"{"foo":"bar"}"#);
}

#[test]
fn finds_an_array() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer", "inner"]), |json| {
            json.object("inner", |json| {
                json.array(&values(&[1, 2]), |json, item, _| json.set("foo", item))
            })
        })
    });
    assert_eq!(out, r#"{"outer":[{"foo":1},{"foo":2}]}"#);
}

#[test]
fn finds_an_array_item() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer", 0]), |json| {
            json.array(&values(&["hello", "world"]), |json, item, _| json.set("foo", item))
        })
    });
    assert_eq!(out, r#"{"outer":{"foo":"hello"}}"#);
}

#[test]
fn finds_nodes_beyond_an_array() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer", "inner", 1, "foo"]), |json| {
            json.object("inner", |json| {
                json.array(&values(&[1, 2]), |json, item, _| {
                    json.object("foo", |json| json.set("bar", item))
                })
            })
        })
    });
    assert_eq!(out, r#"{"outer":{"bar":2}}"#);
}

#[test]
fn indices_past_the_end_are_not_found() {
    let rendered = render_with(&fixture_partials(), |json| {
        json.set_with("outer", dig(path!["outer", "inner", 10, "foo"]), |json| {
            json.object("inner", |json| {
                json.array(&values(&[1, 2]), |json, item, _| {
                    json.object("foo", |json| json.set("bar", item))
                })
            })
        })
    })
    .unwrap();
    assert_eq!(rendered.json, "{}");
    assert_eq!(rendered.found_path, "");
}

#[test]
fn finds_items_of_nested_arrays() {
    let out = render(|json| {
        json.set_with("outer", dig(path!["outer", "inner", 1, "foo", 0]), |json| {
            json.object("inner", |json| {
                json.array(&values(&[0, 1]), |json, item, _| {
                    json.object("foo", |json| {
                        json.array(&[item.clone(), 5.into()], |json, inner, _| {
                            json.set("bar", inner)
                        })
                    })
                })
            })
        })
    });
    assert_eq!(out, r#"{"outer":{"bar":1}}"#);
}

#[test]
fn finds_items_by_id() {
    let users = vec![
        crate::Value::object([("id", 1), ("age", 30)]),
        crate::Value::object([("id", 2), ("age", 40)]),
    ];
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "id=2"]), |json| {
            json.array_with(&users, Options::new().id_key("id"), |json, user, _| {
                json.set("age", user.get("age").cloned().unwrap_or_default())
            })
        })
    });
    assert_eq!(out, r#"{"data":{"age":40,"id":2}}"#);
}

#[test]
fn exact_digs_keep_the_id_attribute() {
    let users = vec![
        crate::Value::object([("id", crate::Value::from(1)), ("email", "joe@red.com".into())]),
        crate::Value::object([("id", crate::Value::from(2)), ("email", "foo@red.com".into())]),
    ];
    let out = render(|json| {
        json.set_with("data", dig(path!["data", 0]), |json| {
            json.array_with(&users, Options::new().id_key("id"), |json, user, _| {
                json.set("email", user.get("email").cloned().unwrap_or_default())
            })
        })
    });
    assert_eq!(out, r#"{"data":{"email":"joe@red.com","id":1}}"#);
}

#[test]
fn digs_through_children() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "posts", "1", "comment"]), |json| {
            json.object("posts", |json| {
                json.array_children(|json| {
                    json.child(|json| json.object("comment", |json| json.set("title", "wow")))?;
                    json.child(|json| json.object("comment", |json| json.set("title", "noway")))
                })
            })
        })
    });
    assert_eq!(out, r#"{"data":{"title":"noway"}}"#);
}

#[test]
fn finds_a_child() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", 0]), |json| {
            json.array_children(|json| {
                json.child(|json| json.set("first", true))?;
                json.child(|_| panic!("children after the match are not entered"))
            })
        })
    });
    assert_eq!(out, r#"{"data":{"first":true}}"#);
}

#[test]
fn child_counters_are_per_array() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", 1, 1]), |json| {
            json.array_children(|json| {
                json.child(|json| json.array_children(|json| json.child(|_| Ok(()))))?;
                json.child(|json| {
                    json.array_children(|json| {
                        json.child(|json| json.set("n", 0))?;
                        json.child(|json| json.set("n", 1))
                    })
                })
            })
        })
    });
    assert_eq!(out, r#"{"data":{"n":1}}"#);
}

#[test]
fn searches_inside_partials() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "comment", "details"]), |json| {
            json.set_with("comment", Options::new().partial("_comment"), |_| Ok(()))
        })
    });
    assert_eq!(out, r#"{"data":{"body":"hello world"}}"#);
}

#[test]
fn found_partials_render_whole() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "comment"]), |json| {
            json.set_with("comment", Options::new().partial("_comment"), |_| Ok(()))
        })
    });
    assert_eq!(
        out,
        r#"{"data":{"title":"some title","details":{"body":"hello world"}}}"#
    );
}

#[test]
fn found_items_keep_their_partial() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "comment", 1]), |json| {
            json.object("comment", |json| {
                json.array_with(
                    &values(&["hello", "world"]),
                    Options::new().partial(Partial::new("_profile").as_local("email")),
                    |_, _, _| Ok(()),
                )
            })
        })
    });
    assert_eq!(out, r#"{"data":{"email":"world"}}"#);

    let out = render(|json| {
        json.set_with("data", dig(path!["data", "comment", 0]), |json| {
            json.object("comment", |json| {
                json.array_with(&values(&[0]), Options::new().partial("_simple"), |_, _, _| {
                    Ok(())
                })
            })
        })
    });
    assert_eq!(out, r#"{"data":{"foo":"bar"}}"#);
}

#[test]
fn searches_past_item_partials() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "comment", 0, "details"]), |json| {
            json.object("comment", |json| {
                json.array_with(&values(&[0]), Options::new().partial("_comment"), |_, _, _| {
                    Ok(())
                })
            })
        })
    });
    assert_eq!(out, r#"{"data":{"body":"hello world"}}"#);
}

#[test]
fn searches_across_nested_partials() {
    let out = render(|json| {
        json.set_with(
            "data",
            dig(path!["data", "comment", "details", "contact", "phone"]),
            |json| json.set_with("comment", Options::new().partial("_complex"), |_| Ok(())),
        )
    });
    assert_eq!(out, r#"{"data":{"home":"111","cell":"222"}}"#);

    let out = render(|json| {
        json.set_with(
            "data",
            dig(path!["data", "comments", 0, 0, "details", "contact", "phone"]),
            |json| {
                let children = crate::Value::from(values(&[1, 2]));
                json.set_with(
                    "comments",
                    Options::new().partial(Partial::new("_complex_children").local("children", children)),
                    |_| Ok(()),
                )
            },
        )
    });
    assert_eq!(out, r#"{"data":{"home":"111","cell":"222"}}"#);
}

#[test]
fn fragments_on_the_way_set_the_context() {
    let rendered = render_with(&fixture_partials(), |json| {
        json.set_with("data", dig(path!["data", "comment", "details"]), |json| {
            json.set_with(
                "comment",
                Options::new().partial(Partial::new("_comment").fragment("foobar")),
                |_| Ok(()),
            )
        })
    })
    .unwrap();
    assert_eq!(rendered.json, r#"{"data":{"body":"hello world"}}"#);
    assert!(rendered.fragments.is_empty());
    assert_eq!(rendered.fragment_context.as_deref(), Some("foobar"));
    assert_eq!(rendered.found_path, "details");
}

#[test]
fn found_fragments_are_recorded_at_their_full_path() {
    let rendered = render_with(&fixture_partials(), |json| {
        json.object("page", |json| {
            json.set_with("data", dig(path!["data", "tagged", "inner"]), |json| {
                json.set_with("tagged", Options::new().partial("_tagged"), |_| Ok(()))
            })
        })
    })
    .unwrap();
    assert_eq!(rendered.json, r#"{"page":{"data":{"foo":"bar"}}}"#);
    assert_eq!(rendered.fragment_context.as_deref(), Some("inner"));
    assert_eq!(rendered.found_path, "");
    assert_eq!(rendered.fragments.len(), 1);
    assert_eq!(rendered.fragments[0].id, "inner");
    assert_eq!(rendered.fragments[0].path, "page.data.tagged.inner");
}

#[test]
fn found_path_spans_the_search() {
    let rendered = render_with(&fixture_partials(), |json| {
        json.set_with("data", dig(path!["data", "posts", 1]), |json| {
            json.object("posts", |json| {
                json.array(&values(&[1, 2]), |json, n, _| json.set("n", n))
            })
        })
    })
    .unwrap();
    assert_eq!(rendered.json, r#"{"data":{"n":2}}"#);
    assert_eq!(rendered.found_path, "data.posts.1");
    assert_eq!(rendered.fragment_context, None);
}

#[test]
fn fragments_of_missed_branches_are_forgotten() {
    let rendered = render_with(&fixture_partials(), |json| {
        json.set_with("data", dig(path!["data", "post", "body"]), |json| {
            json.set_with("post", Options::new().fragment("draft"), |json| {
                json.set("title", "unpublished")
            })?;
            json.object("post", |json| {
                json.object("body", |json| json.set("text", "hi"))
            })
        })
    })
    .unwrap();
    assert_eq!(rendered.json, r#"{"data":{"text":"hi"}}"#);
    assert_eq!(rendered.fragment_context, None);
    assert_eq!(rendered.found_path, "data.post.body");
}

#[test]
fn deferment_paths_inside_found_nodes_stay_absolute() {
    let rendered = render_with(&fixture_partials(), |json| {
        json.set_with("data", dig(path!["data", "posts"]), |json| {
            json.object("posts", |json| {
                json.set_with(
                    "stats",
                    Options::new().defer(crate::Defer::auto()),
                    |json| json.set("views", 10),
                )
            })
        })
    })
    .unwrap();
    assert_eq!(rendered.json, r#"{"data":{"stats":{}}}"#);
    assert_eq!(rendered.deferred.len(), 1);
    assert_eq!(rendered.deferred[0].path, "data.posts.stats");
    assert_eq!(
        rendered.deferred[0].url,
        "/some_url?props_at=data.posts.stats"
    );
}

#[test]
fn found_nodes_are_never_deferred() {
    let out = render(|json| {
        json.set_with("data", dig(path!["data", "stats"]), |json| {
            json.set_with(
                "stats",
                Options::new().defer(crate::Defer::auto()),
                |json| json.set("views", 10),
            )
        })
    });
    assert_eq!(out, r#"{"data":{"views":10}}"#);
}

#[test]
fn props_at_round_trips_through_a_search() {
    fn page(json: &mut dyn NodeVisitor, props_at: &str) -> Result<(), Error> {
        json.set_with(
            "data",
            Options::new().dig(PathSegment::parse_dotted(props_at)),
            |json| {
                json.object("feed", |json| {
                    json.set_with(
                        "comments",
                        Options::new().defer(crate::Defer::auto()),
                        |json| json.set("count", 3),
                    )
                })
            },
        )
    }

    let first = render_with(&fixture_partials(), |json| page(json, "")).unwrap();
    assert_eq!(first.json, r#"{"data":{"feed":{"comments":{}}}}"#);
    let url = &first.deferred[0].url;
    let props_at = url.split_once("props_at=").unwrap().1;
    assert_eq!(props_at, "data.feed.comments");

    let second = render_with(&fixture_partials(), |json| page(json, props_at)).unwrap();
    assert_eq!(second.json, r#"{"data":{"count":3}}"#);
    assert!(second.deferred.is_empty());
}
