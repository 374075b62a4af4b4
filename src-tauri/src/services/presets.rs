use serde::{Deserialize, Serialize};

/// Width/height pair in logical pixels (physical when it comes back from the OS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Rejects sizes no display could present; anything else is honored as stored.
    pub fn is_usable(&self) -> bool {
        (1..=MAX_EDGE).contains(&self.width) && (1..=MAX_EDGE).contains(&self.height)
    }
}

const MAX_EDGE: u32 = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePreset {
    Small,
    Medium,
    Large,
}

pub const DEFAULT_PRESET: SizePreset = SizePreset::Medium;

impl SizePreset {
    pub const ALL: [SizePreset; 3] = [SizePreset::Small, SizePreset::Medium, SizePreset::Large];

    pub const fn size(self) -> WindowSize {
        match self {
            SizePreset::Small => WindowSize::new(1000, 600),
            SizePreset::Medium => WindowSize::new(1250, 750),
            SizePreset::Large => WindowSize::new(1500, 900),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SizePreset::Small => "small",
            SizePreset::Medium => "medium",
            SizePreset::Large => "large",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.name() == name)
    }

    /// Reverse lookup by value; presets carry no stored key.
    pub fn matching(size: WindowSize) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.size() == size)
    }

    /// Name reported to the settings surface for an arbitrary persisted size.
    pub fn key_for(size: WindowSize) -> &'static str {
        Self::matching(size).unwrap_or(DEFAULT_PRESET).name()
    }
}
