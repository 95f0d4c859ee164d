//! The three-tier file resolution pipeline (spec.md §4.3). Tiers
//! short-circuit as soon as confidence reaches 80.

pub mod jumplist;
pub mod registry;
pub mod search;

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use jumplist::JumpListIndex;
use registry::HandlerCache;

/// Confidence floor at which a detection becomes a launch argument, and the
/// floor above which a tier short-circuits the pipeline (spec.md §3, §4.3).
pub const LAUNCH_ARGUMENT_CONFIDENCE_FLOOR: u8 = 80;

/// Tier 1.5's jump-list pool size — searching the *owning application's*
/// jump list for an exact filename match (spec.md §4.3).
const TIER_1_5_POOL_SIZE: usize = 50;
/// Tier 2's candidate pool size (spec.md §4.3).
const TIER_2_POOL_SIZE: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FileSource {
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "TITLE_PARSE")]
    TitleParse,
    #[serde(rename = "JUMPLIST_EXACT")]
    JumplistExact,
    #[serde(rename = "JUMPLIST")]
    Jumplist,
    #[serde(rename = "FILE_SEARCH")]
    FileSearch,
    #[serde(rename = "EXPLORER_FOLDER")]
    ExplorerFolder,
}

#[derive(Debug, Clone)]
pub struct FileDetection {
    pub file_path: Option<String>,
    pub confidence: u8,
    pub source: FileSource,
}

impl FileDetection {
    pub fn none() -> Self {
        Self { file_path: None, confidence: 0, source: FileSource::None }
    }

    /// The launch argument derived from this detection: `Some` iff
    /// confidence ≥ 80 (spec.md §3 invariant 3, §8 property 3).
    pub fn launch_argument(&self) -> Option<String> {
        (self.confidence >= LAUNCH_ARGUMENT_CONFIDENCE_FLOOR)
            .then(|| self.file_path.clone())
            .flatten()
    }
}

/// The static Tier 1 title-regex registry: lowercased process name (no
/// extension) → a regex with a named `file` capture group (spec.md §4.3).
fn title_regex_registry() -> &'static HashMap<&'static str, &'static str> {
    static REGISTRY: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        HashMap::from([
            ("notepad", r"^(?P<file>.+) - Notepad$"),
            ("winword", r"^(?P<file>.+) - Word$"),
            ("excel", r"^(?P<file>.+) - Excel$"),
            ("powerpnt", r"^(?P<file>.+) - PowerPoint$"),
            ("acrord32", r"^(?P<file>.+) - Adobe Acrobat.*$"),
            ("code", r"^(?P<file>.+) - Visual Studio Code$"),
            ("cursor", r"^(?P<file>.+) - Cursor$"),
            ("notepad++", r"^(?P<file>.+) - Notepad\+\+$"),
        ])
    })
}

fn compiled_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("title regex registry entries are valid at compile time")
}

/// Strips the decoration characters editors prepend/append to an unsaved or
/// modified document's title (spec.md §4.3, Tier 1).
fn strip_decoration(s: &str) -> &str {
    s.trim_matches(|c: char| c == '*' || c == '\u{2022}' || c == '\u{25CF}' || c.is_whitespace())
}

/// Tier 1 — title-regex parsing. Returns a detection only on a regex match;
/// callers fall through to later tiers on [`FileSource::None`].
pub fn tier1_title_parse(process_name_lower: &str, title: &str) -> FileDetection {
    let Some(pattern) = title_regex_registry().get(process_name_lower) else {
        return FileDetection::none();
    };
    let re = compiled_regex(pattern);
    let Some(captures) = re.captures(title) else {
        return FileDetection::none();
    };
    let captured = strip_decoration(&captures["file"]);

    if Path::new(captured).is_absolute() && Path::new(captured).exists() {
        return FileDetection {
            file_path: Some(captured.to_string()),
            confidence: 90,
            source: FileSource::TitleParse,
        };
    }
    if !captured.contains(['/', '\\']) {
        return FileDetection {
            file_path: Some(captured.to_string()),
            confidence: 40,
            source: FileSource::TitleParse,
        };
    }
    FileDetection::none()
}

/// Tier 1.5 — exact bare filename match inside the owning application's jump
/// list (spec.md §4.3).
pub fn tier1_5_exact_filename(
    index: &mut JumpListIndex,
    exe_path: &str,
    bare_filename: &str,
) -> FileDetection {
    let candidates = index.recent_files_for_app(exe_path, TIER_1_5_POOL_SIZE);
    let hit = candidates.into_iter().find(|p| {
        Path::new(p)
            .file_name()
            .map(|n| n.to_string_lossy().eq_ignore_ascii_case(bare_filename))
            .unwrap_or(false)
    });
    match hit {
        Some(path) => FileDetection { file_path: Some(path), confidence: 90, source: FileSource::JumplistExact },
        None => FileDetection::none(),
    }
}

/// Picks the most specific candidate: a file-name or (length ≥ 3) file-stem
/// substring match against the lowercased title, preferring the longest
/// match (spec.md §4.3, Tier 2). Plain lowercase comparison, no accent
/// stripping — a documented limitation (spec.md §9 Open Questions).
fn best_candidate_by_title(candidates: Vec<String>, title_lower: &str) -> Option<String> {
    candidates
        .into_iter()
        .filter_map(|path| {
            let p = Path::new(&path);
            let name = p.file_name()?.to_string_lossy().to_lowercase();
            let stem = p.file_stem()?.to_string_lossy().to_lowercase();
            let matched_len = if title_lower.contains(&name) {
                Some(name.len())
            } else if stem.len() >= 3 && title_lower.contains(&stem) {
                Some(stem.len())
            } else {
                None
            };
            matched_len.map(|len| (len, path))
        })
        .max_by_key(|(len, _)| *len)
        .map(|(_, path)| path)
}

/// Tier 2 — jump-list inference by title substring. Prefers the candidate
/// whose file stem is longest (most specific) (spec.md §4.3).
pub fn tier2_jumplist_inference(index: &mut JumpListIndex, exe_path: &str, title: &str) -> FileDetection {
    let title_lower = title.to_lowercase();
    let candidates = index.recent_files_for_app(exe_path, TIER_2_POOL_SIZE);

    match best_candidate_by_title(candidates, &title_lower) {
        Some(path) => FileDetection { file_path: Some(path), confidence: 80, source: FileSource::Jumplist },
        None => FileDetection::none(),
    }
}

/// Tier 3 — filesystem search, only attempted for a bare filename
/// (spec.md §4.3).
pub fn tier3_filesystem_search(home: &Path, bare_filename: &str) -> FileDetection {
    let roots = search::search_roots(home);
    match search::find_unique_match(&roots, bare_filename) {
        Some(path) => FileDetection {
            file_path: Some(path.to_string_lossy().into_owned()),
            confidence: 85,
            source: FileSource::FileSearch,
        },
        None => FileDetection::none(),
    }
}

/// The Explorer fast path: confidence 95, source `EXPLORER_FOLDER`, skipping
/// all tiers (spec.md §4.3).
pub fn explorer_fast_path(folder_path: &str) -> FileDetection {
    FileDetection {
        file_path: Some(folder_path.to_string()),
        confidence: 95,
        source: FileSource::ExplorerFolder,
    }
}

/// Runs the full pipeline for one window: Explorer fast path if applicable,
/// otherwise Tier 1 → 1.5 → 2 → 3, short-circuiting once confidence reaches
/// [`LAUNCH_ARGUMENT_CONFIDENCE_FLOOR`].
pub struct Resolver {
    pub handler_cache: HandlerCache,
}

impl Resolver {
    pub fn new() -> Self {
        Self { handler_cache: HandlerCache::new() }
    }

    pub fn resolve(
        &self,
        index: &mut JumpListIndex,
        process_name_lower: &str,
        exe_path: &str,
        title: &str,
        explorer_folder: Option<&str>,
        home: &Path,
    ) -> FileDetection {
        if process_name_lower == "explorer" {
            if let Some(folder) = explorer_folder {
                return explorer_fast_path(folder);
            }
        }

        let tier1 = tier1_title_parse(process_name_lower, title);
        if tier1.confidence >= LAUNCH_ARGUMENT_CONFIDENCE_FLOOR {
            return tier1;
        }

        if tier1.source == FileSource::TitleParse && tier1.confidence == 40 {
            if let Some(bare) = &tier1.file_path {
                let exact = tier1_5_exact_filename(index, exe_path, bare);
                if exact.confidence >= LAUNCH_ARGUMENT_CONFIDENCE_FLOOR {
                    return exact;
                }
            }
        }

        let tier2 = tier2_jumplist_inference(index, exe_path, title);
        if tier2.confidence >= LAUNCH_ARGUMENT_CONFIDENCE_FLOOR {
            return tier2;
        }

        if let Some(bare) = tier1.file_path.as_deref() {
            let tier3 = tier3_filesystem_search(home, bare);
            if tier3.file_path.is_some() {
                return tier3;
            }
        }

        if tier1.confidence > 0 {
            return tier1;
        }

        FileDetection::none()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
