use crate::domain::models::{LanguageType, ThemeColorsType, ThemeSettings};
use crate::infrastructure::error::InfraError;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

pub trait SettingsRepository: Send + Sync {
    fn fetch(&self) -> Result<ThemeSettings, InfraError>;
    fn update(&self, settings: &ThemeSettings) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSettingsRepository {
    db_path: PathBuf,
}

impl SqliteSettingsRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl SettingsRepository for SqliteSettingsRepository {
    fn fetch(&self) -> Result<ThemeSettings, InfraError> {
        let connection = self.connect()?;
        let row: Option<(String, String, bool)> = connection
            .query_row(
                "SELECT language, theme_colors, is_dynamic_color_enable FROM theme_settings WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((language, theme_colors, is_dynamic_color_enable)) = row else {
            return Ok(ThemeSettings::default());
        };
        Ok(ThemeSettings {
            language: parse_language(&language)?,
            theme_colors: parse_theme_colors(&theme_colors)?,
            is_dynamic_color_enable,
        })
    }

    fn update(&self, settings: &ThemeSettings) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO theme_settings (id, language, theme_colors, is_dynamic_color_enable)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               language = excluded.language,
               theme_colors = excluded.theme_colors,
               is_dynamic_color_enable = excluded.is_dynamic_color_enable",
            params![
                language_as_str(settings.language),
                theme_colors_as_str(settings.theme_colors),
                settings.is_dynamic_color_enable
            ],
        )?;
        Ok(())
    }
}

pub fn parse_language(value: &str) -> Result<LanguageType, InfraError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "default" => Ok(LanguageType::Default),
        "en" => Ok(LanguageType::En),
        "ru" => Ok(LanguageType::Ru),
        other => Err(InfraError::InvalidConfig(format!("unsupported language: {other}"))),
    }
}

pub fn parse_theme_colors(value: &str) -> Result<ThemeColorsType, InfraError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "default" => Ok(ThemeColorsType::Default),
        "light" => Ok(ThemeColorsType::Light),
        "dark" => Ok(ThemeColorsType::Dark),
        other => Err(InfraError::InvalidConfig(format!("unsupported theme colors: {other}"))),
    }
}

fn language_as_str(language: LanguageType) -> &'static str {
    match language {
        LanguageType::Default => "default",
        LanguageType::En => "en",
        LanguageType::Ru => "ru",
    }
}

fn theme_colors_as_str(theme_colors: ThemeColorsType) -> &'static str {
    match theme_colors {
        ThemeColorsType::Default => "default",
        ThemeColorsType::Light => "light",
        ThemeColorsType::Dark => "dark",
    }
}
