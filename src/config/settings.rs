use serde::{Deserialize, Serialize};

/// Editor settings, persisted as JSON and adjustable from `init.rhai`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Window chrome
    pub show_menu_bar: bool,
    pub show_tool_bar: bool,
    pub show_tab_bar: bool,
    pub show_status_bar: bool,

    // Tabs
    pub tabs_closable: bool,
    pub exit_on_last_tab_closed: bool,

    pub combine_search_results: bool,

    // Session
    pub restore_previous_session: bool,
    pub restore_unsaved_files: bool,
    pub restore_temp_files: bool,

    /// Locale name, empty for the system default
    pub translation: String,

    // Display
    pub show_whitespace: bool,
    pub show_end_of_line: bool,
    pub show_wrap_symbol: bool,
    pub show_indent_guide: bool,
    pub word_wrap: bool,
    pub show_line_numbers: bool,

    // Editing
    pub tab_width: usize,
    pub auto_indent: bool,
    pub insert_spaces: bool, // Use spaces instead of tabs
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_menu_bar: true,
            show_tool_bar: true,
            show_tab_bar: true,
            show_status_bar: true,

            tabs_closable: true,
            exit_on_last_tab_closed: false,

            combine_search_results: false,

            restore_previous_session: false,
            restore_unsaved_files: false,
            restore_temp_files: false,

            translation: String::new(),

            show_whitespace: false,
            show_end_of_line: false,
            show_wrap_symbol: true,
            show_indent_guide: true,
            word_wrap: false,
            show_line_numbers: true,

            tab_width: 4,
            auto_indent: true,
            insert_spaces: true,
        }
    }
}

impl Settings {
    pub const MIN_TAB_WIDTH: usize = 1;
    pub const MAX_TAB_WIDTH: usize = 16;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tab_width(&mut self, width: i64) {
        self.tab_width = width.clamp(Self::MIN_TAB_WIDTH as i64, Self::MAX_TAB_WIDTH as i64) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "word_wrap": true }"#).unwrap();
        assert!(settings.word_wrap);
        assert_eq!(settings.tab_width, 4);
        assert!(settings.show_menu_bar);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let settings: Settings = serde_json::from_str(r#"{ "theme": "nord" }"#).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn tab_width_is_clamped() {
        let mut settings = Settings::new();
        settings.set_tab_width(100);
        assert_eq!(settings.tab_width, 16);
        settings.set_tab_width(-3);
        assert_eq!(settings.tab_width, 1);
        settings.set_tab_width(2);
        assert_eq!(settings.tab_width, 2);
    }
}
