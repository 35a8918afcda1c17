//! Per-test options of the fixture, read from TOML.
//!
//! ```toml
//! selectors = [0, 2, 17]
//!
//! [overrides]
//! pInt = 255
//! pFloat2x2 = [[1.0, 2.0], [3.0, 4.0]]
//!
//! [approximations]
//! epsilon = 1e-6
//!
//! [image]
//! width = 4
//! height = 4
//! ```
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tessera::harness::ImageComparison;
use tessera::{Catalog, CatalogError, Selector};

mod value;

pub use value::{ConversionError, RawValue};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestOptions {
    /// The cases to run, all of them if absent.
    pub selectors: Option<Vec<i32>>,
    pub ignore: bool,
    pub known_failure: bool,
    /// Parameter values replacing the declared defaults.
    pub overrides: BTreeMap<String, RawValue>,
    pub approximations: Option<Approximations>,
    pub image: Option<ImageOptions>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Approximations {
    pub epsilon: Option<f64>,
    pub max_relative: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ImageOptions {
    pub width: u32,
    pub height: u32,
    /// A single check, unless `checks` are given.
    pub tolerance: Option<u8>,
    pub max_outliers: Option<usize>,
    pub checks: Vec<CheckOptions>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CheckOptions {
    pub tolerance: u8,
    pub max_outliers: usize,
}

#[derive(Debug)]
pub enum OptionsError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    /// A listed selector fires no case.
    SelectorOutOfRange(i32),
    DuplicateSelector(i32),
    EmptyImage,
    /// Both a single check and a list of checks are configured.
    MixedChecks,
    Override {
        name: String,
        err: ConversionError,
    },
    Catalog(CatalogError),
}

/// A float comparison that failed under the configured approximation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ApproximationError {
    pub actual: f64,
    pub expected: f64,
    pub epsilon: Option<f64>,
    pub max_relative: Option<f64>,
}

impl core::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            OptionsError::Io(err) => write!(f, "can not read options: {err}"),
            OptionsError::Parse(err) => write!(f, "invalid options: {err}"),
            OptionsError::SelectorOutOfRange(selector) => {
                write!(f, "selector {selector} is outside of 0..={}", Selector::ALL.len() - 1)
            }
            OptionsError::DuplicateSelector(selector) => {
                write!(f, "selector {selector} is listed more than once")
            }
            OptionsError::EmptyImage => write!(f, "image dimensions must be non-zero"),
            OptionsError::MixedChecks => write!(
                f,
                "both simple and advanced checks are defined. \
                Either remove 'tolerance' & 'max_outliers', or move it to 'checks'"
            ),
            OptionsError::Override { name, err } => write!(f, "override of `{name}`: {err}"),
            OptionsError::Catalog(err) => write!(f, "{err}"),
        }
    }
}

impl core::error::Error for OptionsError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            OptionsError::Io(err) => Some(err),
            OptionsError::Parse(err) => Some(err),
            OptionsError::Override { err, .. } => Some(err),
            OptionsError::Catalog(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OptionsError {
    fn from(err: std::io::Error) -> Self {
        OptionsError::Io(err)
    }
}

impl From<toml::de::Error> for OptionsError {
    fn from(err: toml::de::Error) -> Self {
        OptionsError::Parse(err)
    }
}

impl From<CatalogError> for OptionsError {
    fn from(err: CatalogError) -> Self {
        OptionsError::Catalog(err)
    }
}

impl core::fmt::Display for ApproximationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "Approximation failed: expected {}, found {}. Epsilon = {:?}, Max Relative = {:?}",
            self.expected, self.actual, self.epsilon, self.max_relative
        )
    }
}

impl core::error::Error for ApproximationError {}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            width: 1,
            height: 1,
            tolerance: None,
            max_outliers: None,
            checks: Vec::new(),
        }
    }
}

impl TestOptions {
    pub fn read(path: &Path) -> Result<Self, OptionsError> {
        let text = std::fs::read_to_string(path)?;
        log::debug!("Reading test options from {}", path.display());
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, OptionsError> {
        let result: Self = toml::from_str(text)?;
        result.validate()?;
        Ok(result)
    }

    /// Check selectors and image settings, done by [`TestOptions::parse`] already.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if let Some(selectors) = &self.selectors {
            let mut seen = HashSet::new();
            for &selector in selectors {
                if Selector::from_index(selector).is_none() {
                    return Err(OptionsError::SelectorOutOfRange(selector));
                }
                if !seen.insert(selector) {
                    return Err(OptionsError::DuplicateSelector(selector));
                }
            }
        }

        if let Some(image) = &self.image {
            if image.width == 0 || image.height == 0 {
                return Err(OptionsError::EmptyImage);
            }

            let has_simple_check = image.tolerance.is_some() || image.max_outliers.is_some();
            if has_simple_check && !image.checks.is_empty() {
                return Err(OptionsError::MixedChecks);
            }
        }

        Ok(())
    }

    /// The cases to run, in the listed order.
    pub fn selectors(&self) -> Vec<Selector> {
        match &self.selectors {
            None => Selector::ALL.to_vec(),
            Some(list) => list
                .iter()
                .filter_map(|&index| Selector::from_index(index))
                .collect(),
        }
    }

    /// Write all overrides into the catalog, each converted to the declared type.
    ///
    /// Either every override is applied or, on error, the catalog is left as it was.
    pub fn apply(&self, catalog: &mut Catalog) -> Result<(), OptionsError> {
        let mut staged = catalog.clone();
        for (name, raw) in &self.overrides {
            let tag = staged.type_of(name)?;
            let value = raw
                .to_value(tag)
                .map_err(|err| OptionsError::Override {
                    name: name.clone(),
                    err,
                })?;
            staged.set(name, value)?;
        }

        *catalog = staged;

        if !self.overrides.is_empty() {
            log::info!("Applied {} parameter overrides", self.overrides.len());
        }

        Ok(())
    }

    pub fn approximations(&self) -> Approximations {
        self.approximations.unwrap_or_default()
    }

    /// The checks every rendered image must pass, none if images are not compared.
    pub fn image_checks(&self) -> Vec<ImageComparison> {
        let Some(image) = &self.image else {
            return Vec::new();
        };

        if image.checks.is_empty() {
            return vec![ImageComparison {
                tolerance: image.tolerance.unwrap_or_default(),
                max_outliers: image.max_outliers.unwrap_or_default(),
            }];
        }

        image
            .checks
            .iter()
            .map(|check| ImageComparison {
                tolerance: check.tolerance,
                max_outliers: check.max_outliers,
            })
            .collect()
    }
}

impl Approximations {
    pub fn compare(&self, actual: f64, expected: f64) -> Result<(), ApproximationError> {
        let result = match (self.epsilon, self.max_relative) {
            (Some(epsilon), Some(max_relative)) => approx::relative_eq!(
                actual,
                expected,
                epsilon = epsilon,
                max_relative = max_relative
            ),
            (Some(epsilon), None) => approx::relative_eq!(actual, expected, epsilon = epsilon),
            (None, Some(max_relative)) => {
                approx::relative_eq!(actual, expected, max_relative = max_relative)
            }
            (None, None) => approx::relative_eq!(actual, expected),
        };

        if result {
            Ok(())
        } else {
            Err(ApproximationError {
                actual,
                expected,
                epsilon: self.epsilon,
                max_relative: self.max_relative,
            })
        }
    }
}
