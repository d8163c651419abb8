//! Tools files compiled into the binary, selected with `--prebuilt`.

use anyhow::Result;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "prebuilt/"]
struct PrebuiltConfigs;

/// Source types with a prebuilt tools file, sorted.
pub fn names() -> Vec<String> {
    let mut names: Vec<String> = PrebuiltConfigs::iter()
        .filter_map(|file| file.strip_suffix(".yaml").map(str::to_string))
        .collect();
    names.sort_unstable();
    names
}

/// The tools file text for a source type.
pub fn get(name: &str) -> Result<String> {
    let file = PrebuiltConfigs::get(&format!("{name}.yaml")).ok_or_else(|| {
        anyhow::anyhow!(
            "prebuilt source type \"{name}\" not found. Allowed: {}",
            names().join(", ")
        )
    })?;
    let text = std::str::from_utf8(file.data.as_ref())?;
    Ok(text.to_string())
}
