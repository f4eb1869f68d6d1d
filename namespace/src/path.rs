//! Path normalization

/// Path resolver
///
/// Handles splitting paths into segments and validating entry names.
pub struct PathResolver;

impl PathResolver {
    /// Splits a path into segments, stripping empty ones
    ///
    /// # Examples
    ///
    /// ```
    /// use namespace::PathResolver;
    ///
    /// let segments = PathResolver::split_path("/v_entity//7/skills/");
    /// assert_eq!(segments, vec!["v_entity", "7", "skills"]);
    ///
    /// assert!(PathResolver::split_path("///").is_empty());
    /// ```
    pub fn split_path(path: &str) -> Vec<String> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Returns the canonical form of a path (`/a/b`, or `/` for the root)
    pub fn normalize(path: &str) -> String {
        Self::join(&Self::split_path(path))
    }

    /// Joins segments into a canonical path
    pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
        if segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in segments {
            out.push('/');
            out.push_str(segment.as_ref());
        }
        out
    }

    /// Validates a single entry name
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && !name.contains('/') && !name.contains('\0')
    }
}
