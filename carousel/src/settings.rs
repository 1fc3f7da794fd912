use std::sync::LazyLock;

use crate::{CarouselError, CarouselOptions, DetailSource, EnrichmentKind};

/// The detail area's tabs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DetailTab {
    Details,
    #[default]
    Local,
    Remote,
}

impl DetailTab {
    pub const ALL: [DetailTab; 3] = [Self::Details, Self::Local, Self::Remote];

    pub fn source(self) -> DetailSource {
        match self {
            Self::Details => DetailSource::Remote(EnrichmentKind::Metadata),
            Self::Local => DetailSource::Local,
            Self::Remote => DetailSource::Remote(EnrichmentKind::Scores),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SettingKey {
    DetailTab,
    DetailModsFilter,
    LoadBaseDelayMs,
    LoadDistanceFactorMs,
    PositionDecayPerMs,
    WindowOverscanPx,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        Self::DetailTab,
        Self::DetailModsFilter,
        Self::LoadBaseDelayMs,
        Self::LoadDistanceFactorMs,
        Self::PositionDecayPerMs,
        Self::WindowOverscanPx,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SettingValue {
    Bool(bool),
    Float(f32),
    Tab(DetailTab),
}

/// User-facing configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    pub detail_tab: DetailTab,
    pub detail_mods_filter: bool,
    pub load_base_delay_ms: f32,
    pub load_distance_factor_ms: f32,
    pub position_decay_per_ms: f32,
    pub window_overscan_px: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let options = CarouselOptions::default();
        Self {
            detail_tab: DetailTab::default(),
            detail_mods_filter: false,
            load_base_delay_ms: options.loader.base_delay_ms,
            load_distance_factor_ms: options.loader.distance_factor_ms,
            position_decay_per_ms: options.decay_per_ms,
            window_overscan_px: options.overscan_px,
        }
    }
}

impl Settings {
    /// The carousel options these settings imply. Fields without a setting keep their defaults.
    pub fn carousel_options(&self) -> CarouselOptions {
        let mut options = CarouselOptions::default();
        self.apply_to(&mut options);
        options
    }

    /// Overwrites the option fields backed by a setting.
    pub fn apply_to(&self, options: &mut CarouselOptions) {
        options.loader.base_delay_ms = self.load_base_delay_ms;
        options.loader.distance_factor_ms = self.load_distance_factor_ms;
        options.decay_per_ms = self.position_decay_per_ms;
        options.overscan_px = self.window_overscan_px;
    }
}

/// One row of the settings table.
pub struct SettingEntry {
    pub key: SettingKey,
    pub default: fn() -> SettingValue,
    pub get: fn(&Settings) -> SettingValue,
    pub set: fn(&mut Settings, SettingValue) -> Result<(), CarouselError>,
}

fn expect_bool(key: SettingKey, value: SettingValue) -> Result<bool, CarouselError> {
    match value {
        SettingValue::Bool(v) => Ok(v),
        _ => Err(CarouselError::SettingType {
            key,
            expected: "bool",
        }),
    }
}

fn expect_float(key: SettingKey, value: SettingValue) -> Result<f32, CarouselError> {
    match value {
        SettingValue::Float(v) => Ok(v),
        _ => Err(CarouselError::SettingType {
            key,
            expected: "float",
        }),
    }
}

fn expect_tab(key: SettingKey, value: SettingValue) -> Result<DetailTab, CarouselError> {
    match value {
        SettingValue::Tab(v) => Ok(v),
        _ => Err(CarouselError::SettingType {
            key,
            expected: "tab",
        }),
    }
}

macro_rules! float_entry {
    ($key:ident, $field:ident) => {
        SettingEntry {
            key: SettingKey::$key,
            default: || SettingValue::Float(Settings::default().$field),
            get: |s| SettingValue::Float(s.$field),
            set: |s, v| {
                s.$field = expect_float(SettingKey::$key, v)?;
                Ok(())
            },
        }
    };
}

/// Key -> (default, get, set), built once and iterated directly.
pub struct SettingsTable {
    entries: Vec<SettingEntry>,
}

impl SettingsTable {
    fn build() -> Self {
        let entries = vec![
            SettingEntry {
                key: SettingKey::DetailTab,
                default: || SettingValue::Tab(DetailTab::default()),
                get: |s| SettingValue::Tab(s.detail_tab),
                set: |s, v| {
                    s.detail_tab = expect_tab(SettingKey::DetailTab, v)?;
                    Ok(())
                },
            },
            SettingEntry {
                key: SettingKey::DetailModsFilter,
                default: || SettingValue::Bool(false),
                get: |s| SettingValue::Bool(s.detail_mods_filter),
                set: |s, v| {
                    s.detail_mods_filter = expect_bool(SettingKey::DetailModsFilter, v)?;
                    Ok(())
                },
            },
            float_entry!(LoadBaseDelayMs, load_base_delay_ms),
            float_entry!(LoadDistanceFactorMs, load_distance_factor_ms),
            float_entry!(PositionDecayPerMs, position_decay_per_ms),
            float_entry!(WindowOverscanPx, window_overscan_px),
        ];
        Self { entries }
    }

    pub fn entries(&self) -> &[SettingEntry] {
        &self.entries
    }

    pub fn entry(&self, key: SettingKey) -> Option<&SettingEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn get(&self, settings: &Settings, key: SettingKey) -> Option<SettingValue> {
        self.entry(key).map(|e| (e.get)(settings))
    }

    pub fn set(
        &self,
        settings: &mut Settings,
        key: SettingKey,
        value: SettingValue,
    ) -> Result<(), CarouselError> {
        match self.entry(key) {
            Some(entry) => (entry.set)(settings, value),
            None => Ok(()),
        }
    }

    pub fn default_value(&self, key: SettingKey) -> Option<SettingValue> {
        self.entry(key).map(|e| (e.default)())
    }

    pub fn reset(&self, settings: &mut Settings, key: SettingKey) -> Result<(), CarouselError> {
        match self.entry(key) {
            Some(entry) => (entry.set)(settings, (entry.default)()),
            None => Ok(()),
        }
    }

    pub fn reset_all(&self, settings: &mut Settings) -> Result<(), CarouselError> {
        for entry in &self.entries {
            (entry.set)(settings, (entry.default)())?;
        }
        cdebug!(entries = self.entries.len(), "SettingsTable::reset_all");
        Ok(())
    }
}

static TABLE: LazyLock<SettingsTable> = LazyLock::new(SettingsTable::build);

/// The process-wide settings table.
pub fn settings_table() -> &'static SettingsTable {
    &TABLE
}
