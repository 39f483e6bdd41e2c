use thiserror::Error;

/// Boxed error type returned by external collaborators (cache stores,
/// partial renderers).
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

/// Errors raised while rendering.
///
/// Scope violations and option validation failures are programmer errors and
/// abort the render immediately. Collaborator failures are never retried; they
/// surface unchanged as the render's failure.
#[derive(Error, Debug)]
pub enum Error {
    /// `set` was called on a node that already resolved to an array.
    #[error("attempted to set! on an array! scope")]
    InvalidScopeForObj,
    /// `array` was called on a node that already resolved its scope.
    #[error("array! expects exclusive use of this block")]
    InvalidScopeForArray,
    /// `child` was called outside of an `array!` with no arguments.
    #[error("child! can only be used in a `array!` with no arguments")]
    InvalidScopeForChild,
    /// `child` was called without a block.
    #[error("child! requires a block")]
    MissingBlock,
    #[error("invalid option: {0}")]
    InvalidOption(&'static str),
    /// The local name derived from a partial path is not an identifier.
    #[error(
        "the partial name ({0}) is not a valid identifier; make sure your partial name starts with an underscore or a letter"
    )]
    InvalidIdentifier(String),
    /// The `as` option of a partial is not an identifier.
    #[error(
        "the value ({0}) of the option `as` is not a valid identifier; make sure it starts with a lowercase letter, and is followed by any combination of letters, numbers and underscores"
    )]
    InvalidOptionAs(String),
    #[error("missing partial: {0}")]
    MissingPartial(String),
    #[error("partial error: {0}")]
    Partial(#[source] BoxError),
    #[error("cache store error: {0}")]
    Store(#[source] BoxError),
    #[error("invalid request path: {0}")]
    RequestPath(#[from] url::ParseError),
}
