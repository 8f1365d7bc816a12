use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;

use log::{debug, info};
use lru::LruCache;

use crate::error::ProfileError;
use crate::profiles::BuiltinBundle;

/// Largest profile file accepted, in bytes.
pub const MAX_PROFILE_BYTES: u64 = 256 * 1024;

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(64) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    User,
    Builtin,
    Path,
}

impl ProfileSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileSource::User => "user",
            ProfileSource::Builtin => "builtin",
            ProfileSource::Path => "path",
        }
    }
}

/// Instruction text sent as the leading message of every conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub source: ProfileSource,
    pub path: Option<PathBuf>,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileListing {
    pub user: Vec<String>,
    pub builtin: Vec<String>,
}

/// Resolves profile specs against a path, the user directory and the
/// built-in bundle, in that order, memoizing successful resolutions.
pub struct ProfileStore {
    bundle: BuiltinBundle,
    working_dir: Option<PathBuf>,
    cache: LruCache<(PathBuf, String), Arc<Profile>>,
}

impl ProfileStore {
    pub fn new(bundle: BuiltinBundle) -> Self {
        Self {
            bundle,
            working_dir: None,
            cache: LruCache::new(CACHE_CAPACITY),
        }
    }

    /// Resolve relative path specs against `dir` instead of the process
    /// working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn resolve(&mut self, spec: &str, profile_dir: &Path) -> Result<Arc<Profile>, ProfileError> {
        let key = (profile_dir.to_path_buf(), spec.trim().to_string());
        if let Some(profile) = self.cache.get(&key) {
            debug!("Profile cache hit for '{}'", key.1);
            return Ok(Arc::clone(profile));
        }

        let profile = Arc::new(self.load(spec, profile_dir)?);
        info!(
            "Resolved profile '{}' from {} source",
            profile.name,
            profile.source.as_str()
        );
        self.cache.put(key, Arc::clone(&profile));
        Ok(profile)
    }

    /// Uncached resolution.
    pub fn load(&self, spec: &str, profile_dir: &Path) -> Result<Profile, ProfileError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ProfileError::EmptySpec);
        }

        if looks_like_path(spec) {
            let path = self.absolutize(&expand_tilde(spec))?;
            let text = read_profile_file(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| spec.to_string());
            return Ok(Profile {
                name,
                source: ProfileSource::Path,
                path: Some(path),
                text,
            });
        }

        for candidate in name_variants(spec) {
            let path = profile_dir.join(&candidate);
            if path.is_file() {
                let text = read_profile_file(&path)?;
                return Ok(Profile {
                    name: spec.to_string(),
                    source: ProfileSource::User,
                    path: Some(path),
                    text,
                });
            }
        }

        for candidate in name_variants(spec) {
            if let Some(text) = self.bundle.get(&candidate) {
                let size = text.len() as u64;
                if size > MAX_PROFILE_BYTES {
                    return Err(ProfileError::TooLarge {
                        path: PathBuf::from(candidate),
                        size,
                        limit: MAX_PROFILE_BYTES,
                    });
                }
                return Ok(Profile {
                    name: spec.to_string(),
                    source: ProfileSource::Builtin,
                    path: None,
                    text: text.to_string(),
                });
            }
        }

        let listing = self.list(profile_dir);
        Err(ProfileError::Unknown {
            spec: spec.to_string(),
            profile_dir: profile_dir.to_path_buf(),
            user: listing.user,
            builtin: listing.builtin,
        })
    }

    /// Names of every discoverable profile. A missing user directory or an
    /// empty bundle yields empty lists.
    pub fn list(&self, profile_dir: &Path) -> ProfileListing {
        let mut user = BTreeSet::new();
        if let Ok(entries) = fs::read_dir(profile_dir) {
            for entry in entries.flatten() {
                if entry.path().is_file() {
                    if let Some(name) = display_name(&entry.file_name().to_string_lossy()) {
                        user.insert(name);
                    }
                }
            }
        }

        let builtin: BTreeSet<String> = self.bundle.file_names().filter_map(display_name).collect();

        ProfileListing {
            user: user.into_iter().collect(),
            builtin: builtin.into_iter().collect(),
        }
    }

    fn absolutize(&self, path: &Path) -> Result<PathBuf, ProfileError> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        let base = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|source| ProfileError::Io {
                path: path.to_path_buf(),
                source,
            })?,
        };
        Ok(base.join(path))
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new(BuiltinBundle::bundled())
    }
}

/// Specs starting with `~`, `.` or a separator, or containing a separator
/// anywhere, are paths rather than names.
pub fn looks_like_path(spec: &str) -> bool {
    spec.starts_with(['~', '.', MAIN_SEPARATOR]) || spec.contains(['/', '\\'])
}

fn expand_tilde(spec: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (spec, home) {
        ("~", Some(home)) => home,
        (spec, Some(home)) if spec.starts_with("~/") => home.join(&spec[2..]),
        (spec, _) => PathBuf::from(spec),
    }
}

fn name_variants(name: &str) -> [String; 2] {
    [name.to_string(), format!("{name}.txt")]
}

fn display_name(file_name: &str) -> Option<String> {
    let name = file_name.strip_suffix(".txt").unwrap_or(file_name);
    (!name.is_empty()).then(|| name.to_string())
}

fn read_profile_file(path: &Path) -> Result<String, ProfileError> {
    let metadata = fs::metadata(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ProfileError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ProfileError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if !metadata.is_file() {
        return Err(ProfileError::NotRegularFile {
            path: path.to_path_buf(),
        });
    }
    if metadata.len() > MAX_PROFILE_BYTES {
        return Err(ProfileError::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: MAX_PROFILE_BYTES,
        });
    }

    let bytes = fs::read(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const TEST_BUNDLE: &[(&str, &str)] = &[
        ("minimal.txt", "builtin minimal"),
        ("shared.txt", "builtin shared"),
    ];

    struct Fixture {
        root: TempDir,
        store: ProfileStore,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            fs::create_dir_all(root.path().join("profiles")).unwrap();
            let store = ProfileStore::new(BuiltinBundle::new(TEST_BUNDLE))
                .with_working_dir(root.path());
            Self { root, store }
        }

        fn profile_dir(&self) -> PathBuf {
            self.root.path().join("profiles")
        }

        fn write(&self, relative: &str, text: &str) -> PathBuf {
            let path = self.root.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, text).unwrap();
            path
        }
    }

    #[test]
    fn path_like_specs() {
        assert!(looks_like_path("./p.txt"));
        assert!(looks_like_path("~/p.txt"));
        assert!(looks_like_path("/abs/p"));
        assert!(looks_like_path("dir/p"));
        assert!(looks_like_path("dir\\p"));
        assert!(!looks_like_path("minimal"));
        assert!(!looks_like_path("my-profile.txt"));
    }

    #[test]
    fn relative_path_spec_wins_over_user_profile() {
        let fx = Fixture::new();
        fx.write("profiles/profile.txt", "user copy");
        let expected = fx.write("my/profile.txt", "path copy");

        let profile = fx.store.load("./my/profile.txt", &fx.profile_dir()).unwrap();
        assert_eq!(profile.source, ProfileSource::Path);
        assert_eq!(profile.text, "path copy");
        assert_eq!(profile.name, "profile.txt");
        assert_eq!(
            profile.path.unwrap().file_name(),
            expected.file_name()
        );
    }

    #[test]
    fn path_spec_never_falls_back_to_names() {
        let fx = Fixture::new();
        fx.write("profiles/minimal", "user minimal");
        let err = fx.store.load("./minimal", &fx.profile_dir()).unwrap_err();
        assert!(matches!(err, ProfileError::NotFound { .. }));
    }

    #[test]
    fn user_profile_shadows_builtin() {
        let fx = Fixture::new();
        fx.write("profiles/minimal.txt", "user minimal");

        let profile = fx.store.load("minimal", &fx.profile_dir()).unwrap();
        assert_eq!(profile.source, ProfileSource::User);
        assert_eq!(profile.text, "user minimal");
    }

    #[test]
    fn exact_name_is_tried_before_txt() {
        let fx = Fixture::new();
        fx.write("profiles/gif", "exact");
        fx.write("profiles/gif.txt", "with extension");

        let profile = fx.store.load("gif", &fx.profile_dir()).unwrap();
        assert_eq!(profile.text, "exact");
    }

    #[test]
    fn directory_in_user_dir_is_skipped() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.profile_dir().join("shared")).unwrap();

        let profile = fx.store.load("shared", &fx.profile_dir()).unwrap();
        assert_eq!(profile.source, ProfileSource::Builtin);
        assert_eq!(profile.text, "builtin shared");
        assert_eq!(profile.path, None);
    }

    #[test]
    fn path_to_directory_is_rejected() {
        let fx = Fixture::new();
        let err = fx.store.load("./profiles", &fx.profile_dir()).unwrap_err();
        assert!(matches!(err, ProfileError::NotRegularFile { .. }));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let fx = Fixture::new();
        let big = "x".repeat(MAX_PROFILE_BYTES as usize + 1);
        let path = fx.write("big.txt", &big);

        let err = fx
            .store
            .load(path.to_str().unwrap(), &fx.profile_dir())
            .unwrap_err();
        assert!(matches!(err, ProfileError::TooLarge { size, .. } if size == MAX_PROFILE_BYTES + 1));
    }

    #[test]
    fn unknown_name_lists_alternatives() {
        let fx = Fixture::new();
        fx.write("profiles/custom.txt", "mine");

        let err = fx.store.load("nope", &fx.profile_dir()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Profile 'nope' not found"));
        assert!(message.contains("custom"));
        assert!(message.contains("minimal, shared"));
    }

    #[test]
    fn empty_spec_is_rejected() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.store.load("  ", &fx.profile_dir()),
            Err(ProfileError::EmptySpec)
        ));
    }

    #[test]
    fn list_strips_extension_and_sorts() {
        let fx = Fixture::new();
        fx.write("profiles/zeta.txt", "z");
        fx.write("profiles/alpha", "a");
        fx.write("profiles/alpha.txt", "a2");
        fs::create_dir_all(fx.profile_dir().join("subdir")).unwrap();

        let listing = fx.store.list(&fx.profile_dir());
        assert_eq!(listing.user, vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(listing.builtin, vec!["minimal".to_string(), "shared".to_string()]);
    }

    #[test]
    fn list_tolerates_missing_sources() {
        let store = ProfileStore::new(BuiltinBundle::empty());
        let listing = store.list(Path::new("/definitely/not/here"));
        assert_eq!(listing, ProfileListing::default());
    }

    #[test]
    fn resolve_is_cached_per_dir_and_spec() {
        let mut fx = Fixture::new();
        let dir = fx.profile_dir();
        fx.write("profiles/cached.txt", "first");

        let first = fx.store.resolve("cached", &dir).unwrap();
        fx.write("profiles/cached.txt", "second");
        let again = fx.store.resolve("cached", &dir).unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.text, "first");

        let other_dir = fx.root.path().join("other");
        fs::create_dir_all(&other_dir).unwrap();
        let builtin = fx.store.resolve("minimal", &other_dir).unwrap();
        assert_eq!(builtin.source, ProfileSource::Builtin);
    }
}
