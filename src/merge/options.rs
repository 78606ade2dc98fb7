use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::config::global_config;

/// The direction in which arrays are concatenated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Row-wise: records are stacked as rows, and arrays must agree in their column count.
    #[default]
    #[serde(alias = "vert")]
    #[display("vertical")]
    Vertical,
    /// Column-wise: records are stacked as columns, and arrays must agree in their row count.
    #[serde(alias = "horiz")]
    #[display("horizontal")]
    Horizontal,
}

impl Orientation {
    /// The axis arrays are concatenated along.
    #[must_use]
    pub const fn concat_axis(self) -> usize {
        match self {
            Self::Vertical => 0,
            Self::Horizontal => 1,
        }
    }

    /// The axis arrays must agree in size along.
    #[must_use]
    pub const fn agreement_axis(self) -> usize {
        match self {
            Self::Vertical => 1,
            Self::Horizontal => 0,
        }
    }

    /// The shape of a vector with one element per record, `(n, 1)` or `(1, n)`.
    #[must_use]
    pub const fn record_shape(self, n: usize) -> [usize; 2] {
        match self {
            Self::Vertical => [n, 1],
            Self::Horizontal => [1, n],
        }
    }

    /// The shape of a vector lying along the agreement axis, `(1, n)` or `(n, 1)`.
    #[must_use]
    pub const fn grid_shape(self, n: usize) -> [usize; 2] {
        match self {
            Self::Vertical => [1, n],
            Self::Horizontal => [n, 1],
        }
    }
}

/// Options controlling a merge.
///
/// Use [`MergeOptionsBuilder`] to create options, or deserialize them from JSON:
/// ```json
/// {
///     "orientation": "vert",
///     "reserved_paths": ["/wavelength_units"],
///     "sort_by": "base_sample_id",
///     "align_at": "/x",
///     "merge_attributes": true
/// }
/// ```
/// Omitted fields take their default values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeOptions {
    orientation: Orientation,
    reserved_paths: Vec<String>,
    sort_by: Option<String>,
    align_at: Option<String>,
    merge_attributes: bool,
    reference_index: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::default(),
            reserved_paths: Vec::new(),
            sort_by: Some(global_config().file_id_path().to_string()),
            align_at: None,
            merge_attributes: false,
            reference_index: 0,
        }
    }
}

impl MergeOptions {
    /// The merge orientation. Defaults to [`Orientation::Vertical`].
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Paths copied verbatim from the reference collection. Defaults to none.
    #[must_use]
    pub fn reserved_paths(&self) -> &[String] {
        &self.reserved_paths
    }

    /// The path of the array records are sorted by. Defaults to the file identifier path.
    ///
    /// Sorting only takes place if attributes are merged.
    #[must_use]
    pub fn sort_by(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }

    /// The path of the alignment axis. Defaults to none.
    #[must_use]
    pub fn align_at(&self) -> Option<&str> {
        self.align_at.as_deref()
    }

    /// Whether common attributes are merged into arrays. Defaults to `false`.
    #[must_use]
    pub const fn merge_attributes(&self) -> bool {
        self.merge_attributes
    }

    /// The index of the reference collection. Defaults to `0`.
    #[must_use]
    pub const fn reference_index(&self) -> usize {
        self.reference_index
    }
}

/// A builder for [`MergeOptions`].
///
/// ```
/// # use zarrs_merge::merge::{MergeOptionsBuilder, Orientation};
/// let options = MergeOptionsBuilder::new()
///     .orientation(Orientation::Horizontal)
///     .align_at("/x")
///     .merge_attributes(true)
///     .build();
/// assert_eq!(options.align_at(), Some("/x"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MergeOptionsBuilder {
    options: MergeOptions,
}

impl MergeOptionsBuilder {
    /// Create a new builder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the orientation.
    pub fn orientation(&mut self, orientation: Orientation) -> &mut Self {
        self.options.orientation = orientation;
        self
    }

    /// Set the reserved paths.
    pub fn reserved_paths(&mut self, reserved_paths: Vec<String>) -> &mut Self {
        self.options.reserved_paths = reserved_paths;
        self
    }

    /// Set the sort key path, or disable sorting with [`None`].
    pub fn sort_by(&mut self, sort_by: Option<String>) -> &mut Self {
        self.options.sort_by = sort_by;
        self
    }

    /// Set the alignment axis path.
    pub fn align_at(&mut self, align_at: impl Into<String>) -> &mut Self {
        self.options.align_at = Some(align_at.into());
        self
    }

    /// Set whether attributes are merged.
    pub fn merge_attributes(&mut self, merge_attributes: bool) -> &mut Self {
        self.options.merge_attributes = merge_attributes;
        self
    }

    /// Set the reference collection index.
    pub fn reference_index(&mut self, reference_index: usize) -> &mut Self {
        self.options.reference_index = reference_index;
        self
    }

    /// Build the options.
    #[must_use]
    pub fn build(&self) -> MergeOptions {
        self.options.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_axes() {
        assert_eq!(Orientation::Vertical.concat_axis(), 0);
        assert_eq!(Orientation::Vertical.agreement_axis(), 1);
        assert_eq!(Orientation::Horizontal.record_shape(3), [1, 3]);
        assert_eq!(Orientation::Horizontal.grid_shape(3), [3, 1]);
        assert_eq!(Orientation::Horizontal.to_string(), "horizontal");
    }

    #[test]
    fn merge_options_json() {
        let options: MergeOptions =
            serde_json::from_str(r#"{"orientation": "horiz", "align_at": "x"}"#).unwrap();
        assert_eq!(options.orientation(), Orientation::Horizontal);
        assert_eq!(options.align_at(), Some("x"));
        assert_eq!(options.sort_by(), Some("base_sample_id"));
        assert!(!options.merge_attributes());
        assert_eq!(options.reference_index(), 0);
        let options: MergeOptions =
            serde_json::from_str(r#"{"orientation": "vertical", "sort_by": null}"#).unwrap();
        assert_eq!(options.orientation(), Orientation::Vertical);
        assert_eq!(options.sort_by(), None);
        assert!(serde_json::from_str::<MergeOptions>(r#"{"orientation": "diagonal"}"#).is_err());
        assert!(serde_json::from_str::<MergeOptions>(r#"{"unknown": 1}"#).is_err());
    }

    #[test]
    fn merge_options_builder() {
        let options = MergeOptionsBuilder::new()
            .reserved_paths(vec!["/units".to_string()])
            .sort_by(None)
            .reference_index(1)
            .build();
        assert_eq!(options.reserved_paths(), &["/units".to_string()]);
        assert_eq!(options.sort_by(), None);
        assert_eq!(options.reference_index(), 1);
        assert_eq!(options.orientation(), Orientation::Vertical);
    }
}
