use fnv::FnvHasher;
use std::hash::Hasher;

/// FNV-1a hash of a path. Inode numbers are derived from path identity so
/// that repeated lookups of the same name return the same number; the FUSE
/// library treats them as client-cache hints, so collisions need no
/// handling here.
pub fn hash_path(path: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(path.as_bytes());
    hasher.finish()
}

/// Join a child name onto a node base path. The root's base path is the
/// empty string, so top-level entries hash as their bare name.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

/// Normalized result of every directory enumeration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirEntries {
    pub directories: Vec<String>,
    pub files: Vec<String>,
}

impl DirEntries {
    pub fn with_directories<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            directories: names.into_iter().map(Into::into).collect(),
            files: Vec::new(),
        }
    }

    pub fn with_files<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            directories: Vec::new(),
            files: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_fnv1a_test_vectors() {
        // Standard 64-bit FNV-1a vectors.
        assert_eq!(hash_path(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(hash_path("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(hash_path("alpha/resources"), hash_path("alpha/resources"));
        assert_ne!(hash_path("alpha"), hash_path("beta"));
    }

    #[test]
    fn join_skips_empty_base() {
        assert_eq!(join_path("", "alpha"), "alpha");
        assert_eq!(join_path("alpha", "resources"), "alpha/resources");
    }
}
