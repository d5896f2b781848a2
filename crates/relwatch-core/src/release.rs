use log::info;
use serde::{Deserialize, Deserializer};

use crate::error::{AssetError, DecodeError};

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub size: u64,
    pub download_url: String,
}

/// A published release as reported by the releases API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub name: String,
    pub permalink: String,
    /// Tag name. Compared verbatim against the baseline version.
    pub version: String,
    pub prerelease: bool,
    pub notes: String,
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Deserialize)]
struct RawAsset {
    name: String,
    size: u64,
    browser_download_url: String,
}

#[derive(Deserialize)]
struct RawRelease {
    name: String,
    html_url: String,
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    body: String,
    #[serde(default)]
    assets: Vec<RawAsset>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn require_absolute_url(field: &'static str, value: String) -> Result<String, DecodeError> {
    match reqwest::Url::parse(&value) {
        Ok(_) => Ok(value),
        Err(_) => Err(DecodeError::InvalidUrl { field, value }),
    }
}

impl Release {
    /// Decode a release document as returned by
    /// `GET /repos/{account}/{repo}/releases/{id}`.
    ///
    /// # Errors
    /// Returns [`DecodeError::Json`] when the document is malformed or lacks
    /// `name`, `tag_name` or `html_url`, and [`DecodeError::InvalidUrl`] when
    /// the permalink or an asset download URL is not absolute.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DecodeError> {
        let raw: RawRelease = serde_json::from_slice(bytes)?;

        let assets = raw
            .assets
            .into_iter()
            .map(|asset| {
                Ok(ReleaseAsset {
                    name: asset.name,
                    size: asset.size,
                    download_url: require_absolute_url(
                        "browser_download_url",
                        asset.browser_download_url,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        Ok(Self {
            name: raw.name,
            permalink: require_absolute_url("html_url", raw.html_url)?,
            version: raw.tag_name,
            prerelease: raw.prerelease,
            notes: raw.body,
            assets,
        })
    }

    /// Pick the asset to download.
    ///
    /// Without an index the release must carry exactly one asset.
    ///
    /// # Errors
    /// [`AssetError::NoAssets`] for an asset-less release,
    /// [`AssetError::Ambiguous`] when several assets exist and `index` is
    /// `None`, [`AssetError::IndexOutOfRange`] for an index past the end.
    pub fn select_asset(&self, index: Option<usize>) -> Result<&ReleaseAsset, AssetError> {
        let count = self.assets.len();
        match (index, count) {
            (_, 0) => Err(AssetError::NoAssets),
            (Some(index), _) => self
                .assets
                .get(index)
                .ok_or(AssetError::IndexOutOfRange { index, count }),
            (None, 1) => Ok(&self.assets[0]),
            (None, _) => Err(AssetError::Ambiguous { count }),
        }
    }

    #[must_use]
    pub fn find_asset_by_name(&self, fragment: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|asset| asset.name.contains(fragment))
    }

    /// Select an asset and hand its URL to the OS to download.
    ///
    /// # Errors
    /// Returns the selection error from [`Release::select_asset`]. Failures of
    /// the OS launch itself are only logged.
    pub fn launch_download(&self, index: Option<usize>) -> Result<(), AssetError> {
        let asset = self.select_asset(index)?;
        info!(
            "Launching download of {} ({} bytes) from release {}",
            asset.name, asset.size, self.version
        );
        relwatch_platform::open_url(&asset.download_url);
        Ok(())
    }
}
