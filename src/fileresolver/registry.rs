//! Extension → handler executable resolution (spec.md §4.3.1, index #1; §7
//! `RegistryMiss`). Uses `winreg::RegKey` the way `DrChat-persistentwin`
//! reads `HKEY_CURRENT_USER` with plain `open_subkey`/`get_value` calls,
//! rather than raw `windows` registry FFI — `winreg` is the crate the
//! closest analogous example in the pack reaches for to do exactly this.

use std::collections::HashMap;
use std::sync::Mutex;

/// Per-extension handler resolution, cached for the process lifetime
/// (spec.md §5, "Registry reads for handler resolution are cached for the
/// process lifetime (per-extension)").
pub struct HandlerCache {
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl HandlerCache {
    pub fn new() -> Self {
        Self { cache: Mutex::new(HashMap::new()) }
    }

    /// Resolves the handler executable for `extension` (e.g. `.docx`),
    /// following spec.md §4.3.1's steps: per-user choice, then machine-wide
    /// progid, then `shell\open\command`, then first quoted/unquoted token,
    /// then environment-variable expansion, then lowercase.
    pub fn resolve(&self, extension: &str) -> Option<String> {
        let key = extension.to_lowercase();
        {
            let cache = self.cache.lock().unwrap();
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }
        let resolved = self.resolve_uncached(&key);
        self.cache.lock().unwrap().insert(key, resolved.clone());
        resolved
    }

    #[cfg(windows)]
    fn resolve_uncached(&self, extension: &str) -> Option<String> {
        os::resolve(extension)
    }

    #[cfg(not(windows))]
    fn resolve_uncached(&self, _extension: &str) -> Option<String> {
        None
    }
}

impl Default for HandlerCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses `shell\open\command`'s default value into an executable path: the
/// first quoted token, or the first whitespace-delimited token otherwise,
/// followed by environment-variable expansion and lowercasing (spec.md
/// §4.3.1).
pub fn parse_command_to_executable(command: &str) -> Option<String> {
    let trimmed = command.trim();
    let token = if let Some(rest) = trimmed.strip_prefix('"') {
        rest.split_once('"').map(|(first, _)| first)?
    } else {
        trimmed.split_whitespace().next()?
    };
    Some(expand_env_vars(token).to_lowercase())
}

fn expand_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            let mut name = String::new();
            let mut closed = false;
            for c2 in chars.by_ref() {
                if c2 == '%' {
                    closed = true;
                    break;
                }
                name.push(c2);
            }
            if closed {
                if let Ok(val) = std::env::var(&name) {
                    out.push_str(&val);
                    continue;
                }
            }
            out.push('%');
            out.push_str(&name);
            if closed {
                out.push('%');
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(windows)]
mod os {
    use winreg::enums::{HKEY_CLASSES_ROOT, HKEY_CURRENT_USER, KEY_READ};
    use winreg::RegKey;

    pub fn resolve(extension: &str) -> Option<String> {
        let progid = per_user_choice(extension).or_else(|| machine_wide_progid(extension))?;
        let command = shell_open_command(&progid)?;
        super::parse_command_to_executable(&command)
    }

    fn per_user_choice(extension: &str) -> Option<String> {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let path = format!(
            "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Explorer\\FileExts\\{extension}\\UserChoice"
        );
        let key = hkcu.open_subkey_with_flags(path, KEY_READ).ok()?;
        key.get_value::<String, _>("ProgId").ok()
    }

    fn machine_wide_progid(extension: &str) -> Option<String> {
        let hkcr = RegKey::predef(HKEY_CLASSES_ROOT);
        let key = hkcr.open_subkey_with_flags(extension, KEY_READ).ok()?;
        key.get_value::<String, _>("").ok().filter(|s| !s.is_empty())
    }

    fn shell_open_command(progid: &str) -> Option<String> {
        let hkcr = RegKey::predef(HKEY_CLASSES_ROOT);
        let path = format!("{progid}\\shell\\open\\command");
        let key = hkcr.open_subkey_with_flags(path, KEY_READ).ok()?;
        key.get_value::<String, _>("").ok()
    }
}
