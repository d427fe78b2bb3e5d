//! Editor timing and clipboard configuration.

pub const DEFAULT_HISTORY_MAX: usize = 80;
pub const DEFAULT_HISTORY_DEBOUNCE_MS: u64 = 250;
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 600;
pub const DEFAULT_PASTE_TIMEOUT_MS: u64 = 4000;
pub const DEFAULT_PASTE_OFFSET: f32 = 18.0;
pub const DEFAULT_PASTE_POINT: (f32, f32) = (200.0, 200.0);
pub const DEFAULT_CONTENT_PADDING: f32 = 40.0;
pub const DEFAULT_STORAGE_KEY: &str = "festoon_autosave_v1";

#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Snapshots kept on the undo stack, including the baseline.
    pub history_max: usize,
    pub history_debounce_ms: u64,
    pub autosave_debounce_ms: u64,
    /// Idle time after which a cascading paste session ends.
    pub paste_timeout_ms: u64,
    pub paste_offset: f32,
    pub default_paste_point: (f32, f32),
    pub content_padding: f32,
    pub storage_key: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_max: DEFAULT_HISTORY_MAX,
            history_debounce_ms: DEFAULT_HISTORY_DEBOUNCE_MS,
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            paste_timeout_ms: DEFAULT_PASTE_TIMEOUT_MS,
            paste_offset: DEFAULT_PASTE_OFFSET,
            default_paste_point: DEFAULT_PASTE_POINT,
            content_padding: DEFAULT_CONTENT_PADDING,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl EditorConfig {
    /// Defaults overridden by `FESTOON_*` environment variables. Unset or
    /// unparseable values keep the default.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            history_max: env_parse("FESTOON_HISTORY_MAX", d.history_max).max(1),
            history_debounce_ms: env_parse("FESTOON_HISTORY_DEBOUNCE_MS", d.history_debounce_ms),
            autosave_debounce_ms: env_parse("FESTOON_AUTOSAVE_DEBOUNCE_MS", d.autosave_debounce_ms),
            paste_timeout_ms: env_parse("FESTOON_PASTE_TIMEOUT_MS", d.paste_timeout_ms),
            paste_offset: env_parse("FESTOON_PASTE_OFFSET", d.paste_offset),
            default_paste_point: (
                env_parse("FESTOON_PASTE_X", d.default_paste_point.0),
                env_parse("FESTOON_PASTE_Y", d.default_paste_point.1),
            ),
            content_padding: env_parse("FESTOON_CONTENT_PADDING", d.content_padding),
            storage_key: std::env::var("FESTOON_STORAGE_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .unwrap_or(d.storage_key),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
