//! Progressive URL sets: a tiny placeholder, the target image, and a
//! responsive `srcset` of every size up to the target.

use serde::Serialize;

use super::size::{SizeToken, DEFINED_SIZES, SMALLEST};
use super::url::UrlBuilder;

/// URLs for progressively loading one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressiveSet {
    /// Smallest rendition, shown first
    pub placeholder: String,
    /// Rendition at the requested size
    pub src: String,
    /// `"{url} {width}w"` pairs, ascending, comma separated
    pub src_set: String,
}

impl ProgressiveSet {
    /// Builds the set for `path` at `target`.
    ///
    /// Sizes without a numeric width are left out of `src_set`, as is
    /// everything when the target itself has no width.
    pub fn build(builder: &UrlBuilder, path: Option<&str>, target: &SizeToken) -> Self {
        if path.map_or(true, |p| p.trim().is_empty()) {
            let placeholder = builder.placeholder().to_string();
            return Self {
                placeholder: placeholder.clone(),
                src: placeholder,
                src_set: String::new(),
            };
        }

        let src_set = match target.width() {
            Some(max_width) => {
                let mut sized: Vec<(u32, &SizeToken)> = DEFINED_SIZES
                    .iter()
                    .filter_map(|size| size.width().map(|w| (w, size)))
                    .filter(|(w, _)| *w <= max_width)
                    .collect();
                sized.sort_by_key(|(w, _)| *w);
                sized
                    .into_iter()
                    .map(|(w, size)| format!("{} {}w", builder.resolve(path, size, None), w))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
            None => String::new(),
        };

        Self {
            placeholder: builder.resolve(path, &SMALLEST, None),
            src: builder.resolve(path, target, None),
            src_set,
        }
    }
}
