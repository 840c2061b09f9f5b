//! The model aggregate.
//!
//! [`GeoModel`] owns every table and is the one place where the push cascades
//! (series rename into surfaces, surface rename into the observation tables)
//! and the engine boundary live. Observation tables still only see upstream
//! changes when [`GeoModel::update_data`] pulls them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::additional::{AdditionalData, InterpolatorOptions};
use crate::data::{OrientationInput, Orientations, SeriesColumn, SurfaceColumn, SurfacePoints};
use crate::error::{GeoError, GeoResult, IntegrityError};
use crate::faults::{FaultRelation, Faults};
use crate::grid::Grid;
use crate::rescaling::{RescaledData, RescalingOptions};
use crate::serialization;
use crate::series::{BottomRelation, Series};
use crate::surfaces::{SeriesMapping, Surfaces};
use crate::warning::ModelWarning;

/// Model-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub rescaling: RescalingOptions,
    pub interpolator: InterpolatorOptions,
}

impl ModelConfig {
    /// Validate configuration.
    ///
    /// # Errors
    /// `InvalidOption` from either section.
    pub fn validate(&self) -> GeoResult<()> {
        self.rescaling.validate()?;
        self.interpolator.validate()?;
        Ok(())
    }
}

/// Everything the interpolation engine consumes, with no unset identity
/// columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatorInput {
    pub additional: AdditionalData,
    pub rescaling: RescaledData,
    /// Mapped, sorted and rescaled surface points.
    pub surface_points: SurfacePoints,
    /// Mapped, sorted and rescaled orientations.
    pub orientations: Orientations,
    pub grid: Grid,
    /// Fault relation restricted to pairs of fault series.
    pub fault_relation: FaultRelation,
}

/// A structural model: series with their faults, surfaces, observations and grid.
///
/// # Examples
///
/// ```
/// use stratigraph::{GeoModel, ModelConfig, SeriesMapping};
///
/// let mut model = GeoModel::new(ModelConfig::default()).unwrap();
/// model.set_series_index(["fault", "strat"]).unwrap();
/// model.set_surfaces_names(["f1", "top", "base"]).unwrap();
/// model.map_series(&SeriesMapping::new().map("fault", ["f1"]).map("strat", ["top", "base"]));
/// model.rename_series(&[("strat", "cover")]).unwrap();
/// assert_eq!(model.surfaces().get("top").unwrap().series.as_deref(), Some("cover"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoModel {
    config: ModelConfig,
    series: Series,
    surfaces: Surfaces,
    surface_points: SurfacePoints,
    orientations: Orientations,
    grid: Grid,
}

impl GeoModel {
    /// Creates an empty model.
    ///
    /// # Errors
    /// `InvalidOption` if `config` does not validate.
    pub fn new(config: ModelConfig) -> GeoResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            series: Series::new(Faults::new()),
            ..Self::default()
        })
    }

    /// Model configuration.
    #[must_use]
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The series table.
    #[must_use]
    pub const fn series(&self) -> &Series {
        &self.series
    }

    /// Fault flags and relation, owned by the series table.
    #[must_use]
    pub const fn faults(&self) -> &Faults {
        self.series.faults()
    }

    /// Fault flags and relation. The series set cannot change through it.
    pub fn faults_mut(&mut self) -> &mut Faults {
        self.series.faults_mut()
    }

    /// The surfaces table.
    #[must_use]
    pub const fn surfaces(&self) -> &Surfaces {
        &self.surfaces
    }

    /// Direct access for values, colors and basement edits. Observation rows
    /// are revalidated on the next [`GeoModel::update_data`].
    pub fn surfaces_mut(&mut self) -> &mut Surfaces {
        &mut self.surfaces
    }

    /// The surface points table.
    #[must_use]
    pub const fn surface_points(&self) -> &SurfacePoints {
        &self.surface_points
    }

    /// Direct access to surface point rows; derived columns refresh on the next [`GeoModel::update_data`].
    pub fn surface_points_mut(&mut self) -> &mut SurfacePoints {
        &mut self.surface_points
    }

    /// The orientations table.
    #[must_use]
    pub const fn orientations(&self) -> &Orientations {
        &self.orientations
    }

    /// Direct access to orientation rows; derived columns refresh on the next [`GeoModel::update_data`].
    pub fn orientations_mut(&mut self) -> &mut Orientations {
        &mut self.orientations
    }

    /// The regular grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    // ---- series ----

    /// Replaces the series set, refusing to drop a series a surface uses.
    ///
    /// # Errors
    /// See [`Series::set_series_index`].
    pub fn set_series_index<I, S>(&mut self, names: I) -> GeoResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.series.set_series_index(names, &self.surfaces)?;
        self.surfaces.sort_by_series(&self.series);
        Ok(())
    }

    /// # Errors
    /// See [`Series::add_series`].
    pub fn add_series(&mut self, name: impl Into<String>) -> GeoResult<()> {
        self.series.add_series(name)
    }

    /// # Errors
    /// See [`Series::delete_series`].
    pub fn delete_series(&mut self, name: &str) -> GeoResult<()> {
        self.series.delete_series(name, &self.surfaces)
    }

    /// Renames series and cascades the new names into surfaces.
    ///
    /// # Errors
    /// See [`Series::rename_series`].
    pub fn rename_series<K, V>(&mut self, mapping: &[(K, V)]) -> GeoResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.series.rename_series(mapping, &mut self.surfaces)
    }

    /// Reorders series, then re-sorts surfaces so ids follow the new
    /// computation order.
    ///
    /// # Errors
    /// See [`Series::reorder_series`].
    pub fn reorder_series<S: AsRef<str>>(&mut self, new_order: &[S]) -> GeoResult<()> {
        self.series.reorder_series(new_order)?;
        self.surfaces.sort_by_series(&self.series);
        Ok(())
    }

    /// # Errors
    /// See [`Series::set_bottom_relation`].
    pub fn set_bottom_relation(&mut self, name: &str, relation: BottomRelation) -> GeoResult<()> {
        self.series.set_bottom_relation(name, relation)
    }

    // ---- surfaces ----

    /// # Errors
    /// See [`Surfaces::set_surfaces_names`].
    pub fn set_surfaces_names<I, S>(&mut self, names: I) -> GeoResult<Vec<ModelWarning>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.surfaces.set_surfaces_names(&self.series, names)
    }

    /// # Errors
    /// See [`Surfaces::add_surface`].
    pub fn add_surface<I, S>(&mut self, names: I) -> GeoResult<Vec<ModelWarning>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.surfaces.add_surface(&self.series, names)
    }

    /// Deletes surfaces and flags observation rows that referenced them.
    ///
    /// # Errors
    /// See [`Surfaces::delete_surface`].
    pub fn delete_surface<S: AsRef<str>>(&mut self, names: &[S]) -> GeoResult<Vec<ModelWarning>> {
        self.surfaces.delete_surface(names)?;
        let mut warnings = self.surface_points.update_validity(&self.surfaces);
        warnings.extend(self.orientations.update_validity(&self.surfaces));
        Ok(warnings)
    }

    /// Renames surfaces and cascades the new names into both observation tables.
    ///
    /// # Errors
    /// See [`Surfaces::rename_surfaces`].
    pub fn rename_surfaces<K, V>(&mut self, mapping: &[(K, V)]) -> GeoResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.surfaces
            .rename_surfaces(mapping, &mut self.surface_points, &mut self.orientations)
    }

    /// See [`Surfaces::map_series`].
    pub fn map_series(&mut self, mapping: &SeriesMapping) -> Vec<ModelWarning> {
        self.surfaces.map_series(&self.series, mapping)
    }

    // ---- observations and grid ----

    /// # Errors
    /// See [`SurfacePoints::set_surface_points`].
    pub fn set_surface_points<S: AsRef<str>>(
        &mut self,
        coords: &[[f64; 3]],
        surface_names: &[S],
    ) -> GeoResult<Vec<ModelWarning>> {
        self.surface_points
            .set_surface_points(&self.surfaces, coords, surface_names)
    }

    /// # Errors
    /// See [`SurfacePoints::add_surface_points`].
    pub fn add_surface_points<S: AsRef<str>>(
        &mut self,
        coords: &[[f64; 3]],
        surface_names: &[S],
    ) -> GeoResult<Vec<ModelWarning>> {
        self.surface_points
            .add_surface_points(&self.surfaces, coords, surface_names)
    }

    /// # Errors
    /// See [`Orientations::set_orientations`].
    pub fn set_orientations<S: AsRef<str>>(
        &mut self,
        coords: &[[f64; 3]],
        input: &OrientationInput,
        surface_names: &[S],
    ) -> GeoResult<Vec<ModelWarning>> {
        self.orientations
            .set_orientations(&self.surfaces, coords, input, surface_names)
    }

    /// # Errors
    /// See [`Orientations::add_orientations`].
    pub fn add_orientations<S: AsRef<str>>(
        &mut self,
        coords: &[[f64; 3]],
        input: &OrientationInput,
        surface_names: &[S],
    ) -> GeoResult<Vec<ModelWarning>> {
        self.orientations
            .add_orientations(&self.surfaces, coords, input, surface_names)
    }

    /// # Errors
    /// See [`Grid::create_regular_grid`].
    pub fn create_regular_grid(&mut self, extent: [f64; 6], resolution: [usize; 3]) -> GeoResult<()> {
        self.grid.create_regular_grid(extent, resolution)
    }

    // ---- derived data ----

    /// Revalidates observation rows, pulls `series`, `id` and `order_series`
    /// into both tables and sorts them.
    pub fn update_data(&mut self) -> Vec<ModelWarning> {
        let mut warnings = self.surface_points.update_validity(&self.surfaces);
        warnings.extend(self.orientations.update_validity(&self.surfaces));

        for column in [SurfaceColumn::Series, SurfaceColumn::Id] {
            self.surface_points.map_data_from_surfaces(&self.surfaces, column);
            self.orientations.map_data_from_surfaces(&self.surfaces, column);
        }
        self.surface_points
            .map_data_from_series(&self.series, SeriesColumn::OrderSeries);
        self.orientations
            .map_data_from_series(&self.series, SeriesColumn::OrderSeries);
        self.surface_points.sort_table();
        self.orientations.sort_table();
        debug!(
            surface_points = self.surface_points.len(),
            orientations = self.orientations.len(),
            warnings = warnings.len(),
            "observation tables updated"
        );
        warnings
    }

    /// Recomputes the rescaled coordinates of every table.
    ///
    /// # Errors
    /// See [`RescaledData::compute`].
    pub fn rescale(&mut self) -> GeoResult<RescaledData> {
        RescaledData::compute(
            &mut self.surface_points,
            &mut self.orientations,
            &mut self.grid,
            self.config.rescaling,
        )
    }

    /// Refreshes all derived data and hands out the engine input.
    ///
    /// # Errors
    /// - `NotReady` if a surface has no series, there is no basement, or an
    ///   observation row has an unset identity column after remapping.
    /// - `ReferentialIntegrity` if a surface names a series that is not in
    ///   the series index.
    /// - Any error of [`GeoModel::rescale`] or [`AdditionalData::new`].
    pub fn interpolator_input(&mut self) -> GeoResult<InterpolatorInput> {
        self.update_data();
        self.ensure_ready()?;

        let rescaling = self.rescale()?;
        let additional = AdditionalData::new(
            &self.surface_points,
            &self.orientations,
            &self.grid,
            &self.series,
            &self.surfaces,
            &rescaling,
            self.config.interpolator.clone(),
        )?;
        info!(
            series = additional.structure.n_series,
            surfaces = additional.structure.n_surfaces,
            surface_points = additional.structure.n_surface_points,
            orientations = additional.structure.n_orientations,
            fingerprint = %additional.fingerprint,
            "interpolator input ready"
        );
        Ok(InterpolatorInput {
            additional,
            rescaling,
            surface_points: self.surface_points.clone(),
            orientations: self.orientations.clone(),
            grid: self.grid.clone(),
            fault_relation: self.series.faults().effective_relation(),
        })
    }

    fn ensure_ready(&self) -> GeoResult<()> {
        let unset = self.surfaces.unset_series_count();
        if unset > 0 {
            return Err(not_ready("surfaces", "series", unset));
        }
        let dangling = self.surfaces.dangling_series(&self.series);
        if !dangling.is_empty() {
            return Err(IntegrityError::referential(format!(
                "surfaces [{}] reference series missing from the index",
                dangling.join(", ")
            ))
            .into());
        }
        if !self.surfaces.is_empty() && self.surfaces.basement().is_none() {
            return Err(not_ready("surfaces", "basement", 1));
        }
        let tables = [
            ("surface_points", self.surface_points.null_counts()),
            ("orientations", self.orientations.null_counts()),
        ];
        for (table, counts) in tables {
            if let Some(&(column, nulls)) = counts.iter().find(|(_, nulls)| *nulls > 0) {
                return Err(not_ready(table, column, nulls));
            }
        }
        Ok(())
    }

    // ---- persistence ----

    /// Serializes the whole model to pretty JSON.
    ///
    /// # Errors
    /// `Internal` if serialization fails.
    pub fn to_json(&self) -> GeoResult<String> {
        serialization::to_json_pretty(self)
    }

    /// Loads a model from JSON and checks the cross-table invariants the
    /// editing API maintains.
    ///
    /// # Errors
    /// - `Internal` for malformed JSON.
    /// - `InvalidOption` if the stored config does not validate.
    /// - `ReferentialIntegrity` if bottom relations or fault rows disagree
    ///   with the series index, a surface names an unknown series, surface
    ///   ids are not dense, or no surface is basement.
    /// - `AmbiguousBasement` if more than one surface is basement.
    /// - `DuplicateLabel` for repeated surface names.
    /// - `ValueCountMismatch` if a value column is not one value per surface.
    pub fn from_json(s: &str) -> GeoResult<Self> {
        let model: Self = serialization::from_json(s)?;
        model.config.validate()?;
        model.series.check_alignment()?;
        model.surfaces.check_consistency(&model.series)?;
        Ok(model)
    }
}

fn not_ready(table: &str, column: &str, nulls: usize) -> GeoError {
    IntegrityError::NotReady {
        table: table.to_string(),
        column: column.to_string(),
        nulls,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> GeoModel {
        let mut model = GeoModel::new(ModelConfig::default()).unwrap();
        model.set_series_index(["fault", "strat"]).unwrap();
        model.faults_mut().set_is_fault(Some(["fault"])).unwrap();
        model.set_surfaces_names(["f1", "top", "base"]).unwrap();
        model.map_series(&SeriesMapping::new().map("fault", ["f1"]).map("strat", ["top", "base"]));
        model.create_regular_grid([0.0, 10.0, 0.0, 10.0, 0.0, 10.0], [4, 4, 4]).unwrap();
        model
            .set_surface_points(
                &[[1.0, 1.0, 1.0], [2.0, 2.0, 6.0], [3.0, 3.0, 2.0], [4.0, 4.0, 5.0]],
                &["base", "top", "f1", "top"],
            )
            .unwrap();
        model
            .set_orientations(
                &[[5.0, 5.0, 5.0], [6.0, 6.0, 1.0]],
                &OrientationInput::Angles(vec![[90.0, 10.0, 1.0], [0.0, 80.0, 1.0]]),
                &["top", "f1"],
            )
            .unwrap();
        model
    }

    #[test]
    fn update_data_sorts_by_series_then_surface() {
        let mut m = model();
        assert!(m.update_data().is_empty());
        let surfaces: Vec<&str> = m.surface_points().rows().iter().map(|r| r.keys.surface.as_str()).collect();
        assert_eq!(surfaces, vec!["f1", "top", "top", "base"]);
        let first = &m.orientations().rows()[0];
        assert_eq!(first.keys.surface, "f1");
        assert_eq!(first.keys.order_series, Some(1));
    }

    #[test]
    fn rename_surfaces_reaches_observations() {
        let mut m = model();
        m.rename_surfaces(&[("top", "upper")]).unwrap();
        assert!(m.surface_points().rows().iter().any(|r| r.keys.surface == "upper"));
        assert!(m.orientations().rows().iter().all(|r| r.keys.surface != "top"));
        assert!(m.update_data().is_empty());
    }

    #[test]
    fn delete_series_in_use_is_blocked() {
        let mut m = model();
        let err = m.delete_series("strat").unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(m.series().len(), 2);
        assert_eq!(m.faults().fault_relation().dim(), 2);
    }

    #[test]
    fn deleting_surface_flags_observations() {
        let mut m = model();
        let warnings = m.delete_surface(&["f1"]).unwrap();
        assert_eq!(warnings.len(), 2);
        let err = m.interpolator_input().unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn orphaned_surface_blocks_interpolation() {
        let mut m = model();
        m.map_series(&SeriesMapping::new().map("missing", ["base"]));
        let err = m.interpolator_input().unwrap_err();
        assert!(matches!(
            err,
            GeoError::Integrity(IntegrityError::NotReady { ref table, ref column, nulls: 1 })
                if table == "surfaces" && column == "series"
        ));
    }

    #[test]
    fn interpolator_input_is_complete() {
        let mut m = model();
        let input = m.interpolator_input().unwrap();
        assert_eq!(input.additional.structure.n_faults, 1);
        assert!(input.surface_points.rows().iter().all(|r| r.rescaled.is_some()));
        assert_eq!(input.grid.values_rescaled().map(<[_]>::len), Some(64));
        assert_eq!(input.fault_relation.dim(), 2);
    }

    #[test]
    fn reorder_series_resorts_surfaces() {
        let mut m = model();
        m.reorder_series(&["strat", "fault"]).unwrap();
        assert_eq!(m.surfaces().names(), vec!["top", "base", "f1"]);
        assert_eq!(m.surfaces().get("f1").unwrap().id, 3);
    }

    #[test]
    fn json_round_trip_preserves_model() {
        let m = model();
        let restored = GeoModel::from_json(&m.to_json().unwrap()).unwrap();
        assert_eq!(m.series(), restored.series());
        assert_eq!(m.surfaces(), restored.surfaces());
        assert_eq!(m.surface_points(), restored.surface_points());
        assert_eq!(m.grid(), restored.grid());
        assert_eq!(m.orientations().len(), restored.orientations().len());
    }

    #[test]
    fn misaligned_fault_table_rejected() {
        let m = model();
        let mut value: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        value["series"]["faults"]["rows"][0]["series"] = serde_json::Value::from("other");
        let err = GeoModel::from_json(&value.to_string()).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn truncated_bottom_relations_rejected() {
        let m = model();
        let mut value: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        value["series"]["relations"] = serde_json::Value::Array(Vec::new());
        let err = GeoModel::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, GeoError::Integrity(IntegrityError::ReferentialIntegrity { .. })));
    }

    #[test]
    fn unknown_surface_series_rejected_on_load() {
        let m = model();
        let mut value: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        value["surfaces"]["rows"][0]["series"] = serde_json::Value::from("ghost");
        let err = GeoModel::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, GeoError::Integrity(IntegrityError::ReferentialIntegrity { .. })));
    }

    #[test]
    fn second_basement_rejected_on_load() {
        let m = model();
        let mut value: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        value["surfaces"]["rows"][0]["basement"] = serde_json::Value::Bool(true);
        let err = GeoModel::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, GeoError::Integrity(IntegrityError::AmbiguousBasement { count: 2 })));
    }

    #[test]
    fn short_value_column_rejected_on_load() {
        let mut m = model();
        m.surfaces_mut().set_surfaces_values(vec![vec![2.6, 2.4, 2.7]], None).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();
        value["surfaces"]["values"]["columns"][0]["values"] = serde_json::json!([2.6]);
        let err = GeoModel::from_json(&value.to_string()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn dangling_surface_series_blocks_interpolation() {
        let mut m = model();
        let mut value = serde_json::to_value(m.surfaces()).unwrap();
        value["rows"][0]["series"] = serde_json::Value::from("ghost");
        *m.surfaces_mut() = serde_json::from_value(value).unwrap();

        let err = m.interpolator_input().unwrap_err();
        assert!(matches!(
            err,
            GeoError::Integrity(IntegrityError::ReferentialIntegrity { ref reason }) if reason.contains("f1")
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = ModelConfig::default();
        config.interpolator.output.clear();
        assert!(GeoModel::new(config).is_err());
    }
}
