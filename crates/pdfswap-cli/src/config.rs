//! JSON name-map config files: `{"Old First Old Last": "New First New Last"}`.

use std::collections::BTreeMap;
use std::path::Path;

/// Old full name to new full name. Sorted, so saved files are stable.
pub type NameMap = BTreeMap<String, String>;

/// Read a name map from `path`.
pub fn read_name_map(path: &Path) -> Result<NameMap, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))
}

/// Write `names` to `path` as pretty-printed JSON.
pub fn write_name_map(path: &Path, names: &NameMap) -> Result<(), String> {
    let mut text = serde_json::to_string_pretty(names)
        .map_err(|e| format!("cannot serialize config: {e}"))?;
    text.push('\n');
    std::fs::write(path, text).map_err(|e| format!("cannot write config {}: {e}", path.display()))
}
