/// Source of the current request path, used to build deferment URLs.
pub trait RequestContext {
    /// The full path of the request being rendered, query string included.
    fn current_path(&self) -> &str;
}

impl RequestContext for String {
    fn current_path(&self) -> &str {
        self
    }
}

impl RequestContext for &str {
    fn current_path(&self) -> &str {
        self
    }
}
