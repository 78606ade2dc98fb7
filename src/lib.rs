//! Merge and align collections of sample arrays stored in the [Zarr V3](https://zarr.dev) format.
//!
//! A [`Collection`](collection::Collection) is a hierarchy of groups and numeric or string arrays with scalar attributes, typically one collection per sample.
//! [`merge`](merge::merge) combines several collections with a shared layout into one, stacking their records row-wise or column-wise.
//! Arrays sampled over different axis values (e.g. spectra over slightly different wavelengths) can be linearly resampled onto a common grid first,
//! and the root attributes of each input can be consolidated into arrays with one element per record.
//!
//! ## Example
//! ```rust,no_run
//! use zarrs_merge::merge::{merge, MergeOptionsBuilder, Orientation};
//!
//! let options = MergeOptionsBuilder::new()
//!     .orientation(Orientation::Vertical)
//!     .align_at("/x")
//!     .merge_attributes(true)
//!     .build();
//! let report = merge(&["/data/12.zarr", "/data/13.zarr"], "/data/merged.zarr", &options)?;
//! for issue in report.issues() {
//!     println!("{issue}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Storage Format
//! Collections are stored as a subset of Zarr V3:
//!  - every node has a `zarr.json` metadata document,
//!  - every array has a single chunk spanning the whole array,
//!  - numeric arrays (`int64`, `float64`) use the `bytes` codec, and
//!  - string arrays use the `vlen-utf8` codec.
//!
//! Collections written by this crate can be read by other Zarr V3 implementations.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod array;
pub mod attributes;
pub mod collection;
pub mod config;
pub mod merge;
pub mod metadata;
pub mod node;
pub mod storage;
