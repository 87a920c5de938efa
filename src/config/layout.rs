// src/config/layout.rs

//! File layout contract for the site's assets.
//!
//! All locations are relative to the project root (the directory holding the
//! config file) and live under a prefix chosen by the `coredna` flag.

use std::path::{Path, PathBuf};

use crate::config::model::ConfigFile;

/// Image extensions handed to the compression service.
pub const IMAGE_EXTENSIONS: &str = "{jpg,jpeg,png,svg,gif}";

#[derive(Debug, Clone)]
pub struct AssetLayout {
    root: PathBuf,
    prefix: String,
}

impl AssetLayout {
    pub fn new(root: impl Into<PathBuf>, coredna: bool) -> Self {
        let prefix = if coredna { "" } else { "source/" };
        Self {
            root: root.into(),
            prefix: prefix.to_string(),
        }
    }

    pub fn from_config(root: impl Into<PathBuf>, cfg: &ConfigFile) -> Self {
        Self::new(root, cfg.coredna())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root-relative pattern under the prefix, e.g. `source/stylesheets/src/*`.
    pub fn rel(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }

    /// Absolute-ish directory under the prefix.
    pub fn dir(&self, path: &str) -> PathBuf {
        self.root.join(self.rel(path))
    }

    pub fn stylesheet_entry(&self) -> String {
        self.rel("stylesheets/src/all.scss")
    }

    pub fn stylesheet_dist(&self) -> PathBuf {
        self.dir("stylesheets/dist")
    }

    pub fn stylesheet_dist_files(&self) -> String {
        self.rel("stylesheets/dist/*.*")
    }

    pub fn script_sources(&self) -> String {
        self.rel("javascripts/src/*.js")
    }

    pub fn script_dist(&self) -> PathBuf {
        self.dir("javascripts/dist")
    }

    /// `all.js` and its side files.
    pub fn script_bundle_files(&self) -> String {
        self.rel("javascripts/dist/all.*")
    }

    /// `libs.js` and its side files.
    pub fn script_libs_files(&self) -> String {
        self.rel("javascripts/dist/libs.*")
    }

    /// Images waiting for compression; `images/compress` is transient.
    pub fn compress_inputs(&self) -> String {
        self.rel(&format!("images/compress/**/*.{IMAGE_EXTENSIONS}"))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dir("images")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coredna_sites_have_no_prefix() {
        let layout = AssetLayout::new("/site", true);
        assert_eq!(layout.stylesheet_entry(), "stylesheets/src/all.scss");
        assert_eq!(layout.images_dir(), PathBuf::from("/site/images"));
    }

    #[test]
    fn other_sites_live_under_source() {
        let layout = AssetLayout::new("/site", false);
        assert_eq!(layout.script_sources(), "source/javascripts/src/*.js");
        assert_eq!(layout.script_dist(), PathBuf::from("/site/source/javascripts/dist"));
        assert_eq!(
            layout.compress_inputs(),
            "source/images/compress/**/*.{jpg,jpeg,png,svg,gif}"
        );
    }
}
