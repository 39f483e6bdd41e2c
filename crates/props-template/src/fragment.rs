use crate::options::Options;

/// A named, independently client-cacheable region of the output.
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDescriptor {
    pub id: String,
    /// Dotted path of the tagged node.
    pub path: String,
}

/// Fragment ids a node is tagged with: the direct `fragment` option first,
/// then the one carried by its partial.
pub(crate) fn fragment_ids(options: &Options) -> impl Iterator<Item = &str> {
    options.fragment.as_deref().into_iter().chain(
        options
            .partial
            .as_ref()
            .and_then(|partial| partial.fragment.as_deref()),
    )
}
