use inkflip_core::settings::EditorSettings;

const DOCUMENTATION: &str = r#"# Inkflip editor settings. You may edit this file, but be aware that formatting and comments will not
# be preserved. Missing keys take their default value.

# canvas = [width, height] of every layer, in pixels. Changing this makes existing projects unreadable.
# frame_rate = playback frames per second.
# history_capacity = undo steps kept per frame and layer.
# cache_capacity = decoded layers kept in memory.
# [onion]
# enabled = true
# opacity = 0.3

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

pub struct Preferences {
    failed_to_load: bool,
    pub settings: EditorSettings,
}
impl Preferences {
    const FILENAME: &'static str = "settings.toml";
    /// Settings from the user's preferences, or defaulted if unavailable for some reason.
    #[must_use]
    pub fn load() -> Self {
        let mut dir = preferences_dir();
        match dir.as_mut() {
            None => Self::no_path(),
            Some(dir) => {
                dir.push(Self::FILENAME);
                Self::load_or_default(dir)
            }
        }
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Settings weren't available, defaulting.");
        Self {
            failed_to_load: true,
            settings: EditorSettings::default(),
        }
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<EditorSettings> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let settings : EditorSettings = toml::from_str(&string)?;
            settings.validate()?;

            Ok(settings)
        };

        match settings {
            Ok(settings) => Self {
                failed_to_load: false,
                settings,
            },
            Err(e) => {
                log::debug!("reading {}: {e:#}", path.display());
                Self::no_path()
            }
        }
    }
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::ser::to_string_pretty(&self.settings)?)
    }
    pub fn save(&self) -> anyhow::Result<std::path::PathBuf> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Explicity do *not* create recursively. If not found, the user probably has a good reason.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        let string = DOCUMENTATION.to_owned() + &self.to_toml()?;
        std::fs::write(&preferences, string)?;
        Ok(preferences)
    }
}
