//! Normalization of NAS path entries recorded on File rows.
//!
//! Paths were typed by hand over several years: sometimes quoted, sometimes
//! with a leading slash, several per cell joined by `","`, or the sentinel
//! `NO FILE`. Each fragment is rooted under a canonical storage location:
//!
//! 1. first component found in the root-prefix table → that root is prepended,
//! 2. first component is exactly six lowercase letters/digits (2019
//!    digitization event naming) → the digitization root is prepended,
//! 3. otherwise the fragment is dropped.
//!
//! The root-prefix table wins when both rules match. The fragment keeps its
//! own first component below the root, and `Projects` maps to the empty root,
//! so normalized output normalizes to itself.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Separator used by data entry between several paths in one cell.
pub const PATH_DELIMITER: &str = "\",\"";

/// Cell value meaning "this record has no file".
pub const NO_FILE_SENTINEL: &str = "NO FILE";

pub const ACCESSION_2021_ROOT: &str =
    "Projects/lakeland-digital-archive/object files/LCHP Accession 2021";

pub const DEPRECATED_BY_TYPE_ROOT: &str =
    "Projects/lakeland-digital-archive/object files/Files by Object Type-OLD-deprecate";

pub const DIGITIZATION_2019_ROOT: &str =
    "Projects/lakeland-digital-archive/object files/2019 Digitization Event/Digitized Images";

/// Historical top-level folder → canonical storage root.
pub fn default_root_prefixes() -> BTreeMap<String, String> {
    [
        ("Assorted Jump Drives", ACCESSION_2021_ROOT),
        ("Audiovisual", ACCESSION_2021_ROOT),
        ("City of College Park Documents", ACCESSION_2021_ROOT),
        ("Documents", ACCESSION_2021_ROOT),
        ("Lakeland High School Reunion Summer 2018", ACCESSION_2021_ROOT),
        ("LCHP Oral Histories 2007-2013", ACCESSION_2021_ROOT),
        ("Maps", ACCESSION_2021_ROOT),
        ("Photos", ACCESSION_2021_ROOT),
        ("Publications", ACCESSION_2021_ROOT),
        ("Summer 2020 Oral Histories", ACCESSION_2021_ROOT),
        ("Audiovisual Materials Non-Oral History", DEPRECATED_BY_TYPE_ROOT),
        ("Projects", ""),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("literal pattern"))
}

fn digitization_batch_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]{6}$").expect("literal pattern"))
}

/// Resolves raw path entries to canonical POSIX-style paths.
///
/// Immutable after construction; share one instance across threads.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    roots: BTreeMap<String, String>,
    digitization_root: String,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(default_root_prefixes(), DIGITIZATION_2019_ROOT.to_string())
    }
}

impl PathNormalizer {
    pub fn new(roots: BTreeMap<String, String>, digitization_root: String) -> Self {
        Self {
            roots,
            digitization_root,
        }
    }

    pub fn roots(&self) -> &BTreeMap<String, String> {
        &self.roots
    }

    pub fn digitization_root(&self) -> &str {
        &self.digitization_root
    }

    /// True when the cell carries the `NO FILE` sentinel in any fragment.
    pub fn marks_no_file(raw: &str) -> bool {
        raw.split(PATH_DELIMITER)
            .map(clean_fragment)
            .any(|f| f == NO_FILE_SENTINEL)
    }

    /// Normalize one raw path cell into zero or more canonical paths, in order.
    pub fn normalize(&self, raw: &str) -> Vec<String> {
        let fragments: Vec<String> = raw.split(PATH_DELIMITER).map(clean_fragment).collect();

        if fragments.iter().all(|f| f.is_empty()) {
            return Vec::new();
        }
        if fragments.iter().any(|f| f == NO_FILE_SENTINEL) {
            return Vec::new();
        }

        fragments
            .iter()
            .filter_map(|fragment| self.resolve(fragment))
            .collect()
    }

    /// Root a single cleaned fragment, or `None` if no rule applies.
    pub fn resolve(&self, fragment: &str) -> Option<String> {
        let components: Vec<&str> = fragment
            .split('/')
            .filter(|c| !c.is_empty() && *c != ".")
            .collect();
        let first = *components.first()?;

        let root = if let Some(root) = self.roots.get(first) {
            root.as_str()
        } else if digitization_batch_name().is_match(first) {
            self.digitization_root.as_str()
        } else {
            tracing::debug!(fragment, "dropping path fragment with unknown root");
            return None;
        };

        let joined: Vec<&str> = root
            .split('/')
            .filter(|c| !c.is_empty())
            .chain(components.iter().copied())
            .collect();
        Some(joined.join("/"))
    }
}

/// Collapse whitespace runs, strip surrounding quotes on each side and one
/// leading slash.
///
/// Quotes are stripped per side because splitting `"a","b"` on `","` leaves
/// the outer quotes on the first and last fragments only. Doubled quotes
/// (`x""`) go too, so a cleaned fragment never ends in `"`.
fn clean_fragment(fragment: &str) -> String {
    let collapsed = whitespace_run().replace_all(fragment, " ");
    let s = collapsed.as_ref().trim_matches('"');
    let s = s.strip_prefix('/').unwrap_or(s);
    s.to_string()
}
