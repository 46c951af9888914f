//! Export size tables.
//!
//! A [`SizeTable`] is an ordered list of `(platform, name, pixel_size)`
//! entries. The built-in tables cover Android launcher densities, the
//! Play Store listing and the iOS app icon slots; configuration can append
//! arbitrary extra entries, so the table is data rather than an enum.
//!
//! | Platform | Archive path | Individual file |
//! |---|---|---|
//! | `android` | `res/drawable-<name>/ic_launcher.png` | `ic_launcher_<name>.png` |
//! | `playstore` | `playstore/ic_launcher-playstore.png` | `ic_launcher-playstore.png` |
//! | `ios` | `ios/AppIcon.appiconset/<name>.png` | `<name>.png` |
//! | anything else | `<platform>/<name>/icon.png` | `<platform>_<name>.png` |
//!
//! An archive holding iOS slots also gets the asset catalog manifest
//! `ios/AppIcon.appiconset/Contents.json` (see [`ios_asset_catalog`]).

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ANDROID: &str = "android";
pub const PLAYSTORE: &str = "playstore";
pub const IOS: &str = "ios";

/// Android launcher density buckets.
pub const ANDROID_DENSITIES: &[(&str, u32)] = &[
    ("mdpi", 48),
    ("hdpi", 72),
    ("xhdpi", 96),
    ("xxhdpi", 144),
    ("xxxhdpi", 192),
];

/// Archive path of the iOS asset catalog manifest.
pub const IOS_CATALOG_PATH: &str = "ios/AppIcon.appiconset/Contents.json";

/// Play Store listing icon size.
pub const STORE_LISTING_SIZE: u32 = 512;

/// iOS app icon slots.
pub const IOS_SLOTS: &[(&str, u32)] = &[
    ("AppIcon20x20@2x", 40),
    ("AppIcon20x20@3x", 60),
    ("AppIcon29x29@2x", 58),
    ("AppIcon29x29@3x", 87),
    ("AppIcon40x40@2x", 80),
    ("AppIcon40x40@3x", 120),
    ("AppIcon60x60@2x", 120),
    ("AppIcon60x60@3x", 180),
    ("AppIcon76x76@1x", 76),
    ("AppIcon76x76@2x", 152),
    ("AppIcon83.5x83.5@2x", 167),
    ("AppIcon1024x1024@1x", 1024),
];

/// One icon to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeTableEntry {
    pub platform: String,
    pub name: String,
    #[serde(rename = "size")]
    pub pixel_size: u32,
}

impl SizeTableEntry {
    pub fn new(platform: &str, name: &str, pixel_size: u32) -> Self {
        Self {
            platform: platform.to_string(),
            name: name.to_string(),
            pixel_size,
        }
    }

    /// Path of this icon inside the archive.
    pub fn archive_path(&self) -> String {
        match self.platform.as_str() {
            ANDROID => format!("res/drawable-{}/ic_launcher.png", self.name),
            PLAYSTORE => "playstore/ic_launcher-playstore.png".to_string(),
            IOS => format!("ios/AppIcon.appiconset/{}.png", self.name),
            other => format!("{}/{}/icon.png", other, self.name),
        }
    }

    /// File name when the icon is saved on its own.
    pub fn file_name(&self) -> String {
        match self.platform.as_str() {
            ANDROID => format!("ic_launcher_{}.png", self.name),
            PLAYSTORE => "ic_launcher-playstore.png".to_string(),
            IOS => format!("{}.png", self.name),
            other => format!("{}_{}.png", other, self.name),
        }
    }

    /// `platform/name` label for progress output.
    pub fn label(&self) -> String {
        format!("{}/{}", self.platform, self.name)
    }
}

/// Ordered set of icons for one export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeTable {
    entries: Vec<SizeTableEntry>,
}

impl SizeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five Android density buckets.
    pub fn android() -> Self {
        let mut table = Self::new();
        table.extend_android();
        table
    }

    pub fn extend_android(&mut self) {
        for (name, size) in ANDROID_DENSITIES {
            self.push(SizeTableEntry::new(ANDROID, name, *size));
        }
    }

    pub fn extend_store_listing(&mut self) {
        self.push(SizeTableEntry::new(PLAYSTORE, "listing", STORE_LISTING_SIZE));
    }

    pub fn extend_ios(&mut self) {
        for (name, size) in IOS_SLOTS {
            self.push(SizeTableEntry::new(IOS, name, *size));
        }
    }

    /// Append an entry. Entries with a duplicate archive path replace the earlier one.
    pub fn push(&mut self, entry: SizeTableEntry) {
        let path = entry.archive_path();
        if let Some(existing) = self.entries.iter_mut().find(|e| e.archive_path() == path) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    pub fn entries(&self) -> &[SizeTableEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SizeTableEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Serialize)]
struct AssetCatalog {
    images: Vec<CatalogImage>,
    info: CatalogInfo,
}

#[derive(Serialize)]
struct CatalogImage {
    idiom: &'static str,
    size: String,
    scale: String,
    filename: String,
}

#[derive(Serialize)]
struct CatalogInfo {
    author: &'static str,
    version: u32,
}

/// Split a slot name like `AppIcon60x60@3x` into `("60x60", "3x")`.
fn parse_slot(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix("AppIcon")?;
    let (size, scale) = rest.split_once('@')?;
    let points = size.split_once('x')?.0;
    points.parse::<f64>().ok()?;
    scale.strip_suffix('x')?.parse::<u32>().ok()?;
    Some((size, scale))
}

fn idiom_for(size: &str) -> &'static str {
    match size {
        "76x76" | "83.5x83.5" => "ipad",
        "1024x1024" => "ios-marketing",
        _ => "iphone",
    }
}

/// `Contents.json` for the iOS slots among `entries`, or `None` when there are none.
///
/// iOS entries whose names don't follow the `AppIcon<w>x<h>@<n>x` pattern
/// are left out of the catalog.
pub fn ios_asset_catalog<'a>(
    entries: impl IntoIterator<Item = &'a SizeTableEntry>,
) -> Result<Option<String>, serde_json::Error> {
    let mut images = Vec::new();
    for entry in entries.into_iter().filter(|e| e.platform == IOS) {
        match parse_slot(&entry.name) {
            Some((size, scale)) => images.push(CatalogImage {
                idiom: idiom_for(size),
                size: size.to_string(),
                scale: scale.to_string(),
                filename: entry.file_name(),
            }),
            None => debug!(name = %entry.name, "iOS entry left out of asset catalog"),
        }
    }
    if images.is_empty() {
        return Ok(None);
    }
    let catalog = AssetCatalog {
        images,
        info: CatalogInfo {
            author: "iconsmith",
            version: 1,
        },
    };
    serde_json::to_string_pretty(&catalog).map(Some)
}

impl FromIterator<SizeTableEntry> for SizeTable {
    fn from_iter<I: IntoIterator<Item = SizeTableEntry>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.push(entry);
        }
        table
    }
}

impl<'a> IntoIterator for &'a SizeTable {
    type Item = &'a SizeTableEntry;
    type IntoIter = std::slice::Iter<'a, SizeTableEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
