#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use props_template::{
    Defer, Dsl, Env, Error, MemoryStore, NodeVisitor, Options, PathSegment, RenderVisitor, Value,
};

#[derive(Debug, Arbitrary)]
enum Scalar {
    Null,
    Bool(bool),
    Float(f64),
    Int(i64),
    Unsigned(u64),
    String(String),
}

impl From<&Scalar> for Value {
    fn from(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Boolean(*b),
            Scalar::Float(n) => Value::from(*n),
            Scalar::Int(n) => Value::from(*n),
            Scalar::Unsigned(n) => Value::from(*n),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }
}

/// One builder call. Sequences may be invalid; scope errors are expected.
#[derive(Debug, Arbitrary)]
enum Op {
    Set(String, Scalar),
    Object(String, Vec<Op>),
    Array(u8, Vec<Op>),
    Children(Vec<Op>),
    Child(Vec<Op>),
    Deferred(String, bool, Vec<Op>),
    Cached(String, String, Vec<Op>),
    Fragment(String, String, Vec<Op>),
    DisableDeferments,
}

fn run(json: &mut dyn NodeVisitor, ops: &[Op]) -> Result<(), Error> {
    for op in ops {
        match op {
            Op::Set(key, value) => json.set(key, value)?,
            Op::Object(key, body) => json.object(key, |json| run(json, body))?,
            Op::Array(len, body) => {
                let collection: Vec<Value> = (0..*len % 8).map(Value::from).collect();
                json.array(&collection, |json, _, _| run(json, body))?;
            }
            Op::Children(body) => json.array_children(|json| run(json, body))?,
            Op::Child(body) => json.child(|json| run(json, body))?,
            Op::Deferred(key, manual, body) => {
                let defer = if *manual { Defer::manual() } else { Defer::auto() };
                json.set_with(key, Options::new().defer(defer), |json| run(json, body))?;
            }
            Op::Cached(key, cache_key, body) => {
                json.set_with(key, Options::new().cache(cache_key.as_str()), |json| {
                    run(json, body)
                })?;
            }
            Op::Fragment(key, id, body) => {
                json.set_with(key, Options::new().fragment(id.as_str()), |json| run(json, body))?;
            }
            Op::DisableDeferments => json.disable_deferments(),
        }
    }
    Ok(())
}

#[derive(Debug, Arbitrary)]
struct Input {
    ops: Vec<Op>,
    props_at: String,
}

fuzz_target!(|input: Input| {
    let store = MemoryStore::new();
    for _ in 0..2 {
        let mut json = RenderVisitor::new(Env::new().store(&store).request("/fuzz"));
        if run(&mut json, &input.ops).is_ok() {
            let out = json.result();
            serde_json::from_str::<serde_json::Value>(&out)
                .unwrap_or_else(|e| panic!("invalid JSON {out:?}: {e}"));
        }
    }

    let mut json = RenderVisitor::new(Env::new().store(&store).request("/fuzz"));
    let target = PathSegment::parse_dotted(&input.props_at);
    let searched = json.set_with("root", Options::new().dig(target), |json| {
        run(json, &input.ops)
    });
    if searched.is_ok() {
        let out = json.result();
        serde_json::from_str::<serde_json::Value>(&out)
            .unwrap_or_else(|e| panic!("invalid JSON {out:?}: {e}"));
    }
});
