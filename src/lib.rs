//! # stratigraph - relational data model for implicit structural geology
//!
//! stratigraph keeps the tables of a structural model consistent while they
//! are edited interactively, and hands a fully populated input to an implicit
//! surface interpolation engine.
//!
//! ## Core Concepts
//!
//! - **Series**: an ordered stratigraphic group; series order is computation order
//! - **Faults**: per-series fault flags and the square fault relation matrix
//! - **Surfaces**: rock-unit boundaries, each in one series, with ids, colors and values
//! - **SurfacePoints / Orientations**: observations tagged with a surface name
//! - **RescaledData / AdditionalData**: derived views recomputed on demand
//!
//! Series-set changes update faults in the same call. Renames are pushed into
//! dependent tables. Observation tables pull `series`, `id` and `order_series`
//! only when asked.
//!
//! ## Usage
//!
//! ```rust
//! use stratigraph::{GeoModel, ModelConfig, OrientationInput, SeriesMapping};
//!
//! let mut model = GeoModel::new(ModelConfig::default())?;
//! model.set_series_index(["fault", "strat"])?;
//! model.faults_mut().set_is_fault(Some(["fault"]))?;
//! model.set_surfaces_names(["f1", "top", "base"])?;
//! model.map_series(&SeriesMapping::new().map("fault", ["f1"]).map("strat", ["top", "base"]));
//!
//! model.create_regular_grid([0.0, 10.0, 0.0, 10.0, 0.0, 10.0], [10, 10, 10])?;
//! model.set_surface_points(&[[1.0, 1.0, 1.0], [5.0, 5.0, 6.0], [2.0, 8.0, 3.0]], &["base", "top", "f1"])?;
//! model.set_orientations(&[[5.0, 5.0, 5.0]], &OrientationInput::Angles(vec![[0.0, 10.0, 1.0]]), &["top"])?;
//!
//! let input = model.interpolator_input()?;
//! assert_eq!(input.additional.structure.n_faults, 1);
//! # Ok::<(), stratigraph::GeoError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Tables
pub mod data;
pub mod error;
pub mod faults;
pub mod index;
pub mod series;
pub mod surfaces;
pub mod warning;

// Derived data and the engine boundary
pub mod additional;
pub mod grid;
pub mod model;
pub mod rescaling;
pub mod serialization;

// Re-export primary types at crate root for convenience
pub use data::{
    angles_to_pole, pole_to_angles, DataKeys, Observation, ObservationTable, Orientation, OrientationInput,
    Orientations, SeriesColumn, SurfaceColumn, SurfacePoint, SurfacePoints,
};
pub use error::{GeoError, GeoResult, IndexError, IntegrityError, ValidationError};
pub use faults::{FaultRelation, FaultRow, Faults};
pub use index::CategoricalIndex;
pub use series::{BottomRelation, Series, SeriesRow};
pub use surfaces::{normalize_color, SeriesMapping, SurfaceRow, SurfaceValues, Surfaces, ValueColumn};
pub use warning::ModelWarning;

pub use additional::{
    AdditionalData, CompileOptimizer, Device, Dtype, InterpolatorOptions, KrigingParameters, OutputTarget,
    RescalingSnapshot, StructureData,
};
pub use grid::Grid;
pub use model::{GeoModel, InterpolatorInput, ModelConfig};
pub use rescaling::{RescaledData, RescalingOptions};
