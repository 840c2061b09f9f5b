//! Cross-table consistency properties: fault matrix sizing, referential
//! integrity, rename cascades, basement uniqueness and sort order.

use stratigraph::{
    FaultRelation, Faults, GeoError, IndexError, IntegrityError, ModelWarning, Orientations, Series,
    SeriesColumn, SeriesMapping, SurfaceColumn, SurfacePoints, Surfaces,
};

fn series_of(names: &[&str]) -> Series {
    let mut series = Series::new(Faults::new());
    series.set_series_index(names.iter().copied(), &Surfaces::new()).unwrap();
    series
}

/// Small deterministic generator so the op sequence is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 33) % bound as u64) as usize
    }
}

#[test]
fn fault_matrix_tracks_series_count_through_op_sequences() {
    let mut series = series_of(&["s0", "s1"]);
    let mut surfaces = Surfaces::new();
    let mut rng = Lcg(7);
    let mut created = 2;

    for _ in 0..300 {
        match rng.next(4) {
            0 => {
                series.add_series(format!("s{created}")).unwrap();
                created += 1;
            }
            1 if series.len() > 1 => {
                let victim = series.names()[rng.next(series.len())].clone();
                series.delete_series(&victim, &surfaces).unwrap();
            }
            2 if !series.is_empty() => {
                let old = series.names()[rng.next(series.len())].clone();
                let new = format!("r{created}");
                created += 1;
                series.rename_series(&[(old.as_str(), new.as_str())], &mut surfaces).unwrap();
            }
            _ => {
                let mut order: Vec<String> = series.names().to_vec();
                let k = rng.next(order.len().max(1)).min(order.len());
                order.rotate_left(k);
                series.reorder_series(&order).unwrap();
            }
        }
        let faults = series.faults();
        assert_eq!(faults.fault_relation().dim(), series.len());
        assert_eq!(faults.len(), series.len());
        for (row, name) in faults.rows().iter().zip(series.names()) {
            assert_eq!(&row.series, name);
        }
    }
}

#[test]
fn deleting_referenced_series_is_blocked() {
    let mut series = series_of(&["a", "b"]);
    let mut surfaces = Surfaces::new();
    surfaces.set_surfaces_names(&series, ["s1", "s2"]).unwrap();
    surfaces.map_series(&series, &SeriesMapping::new().map("b", ["s2"]));

    let err = series.delete_series("b", &surfaces).unwrap_err();
    assert!(matches!(err, GeoError::Integrity(IntegrityError::ReferentialIntegrity { .. })));
    assert!(series.contains("b"));
    assert!(surfaces.rows().iter().all(|r| r.series.as_deref().is_some_and(|s| series.contains(s))));

    let err = series.set_series_index(["a"], &surfaces).unwrap_err();
    assert!(err.is_integrity());

    surfaces.map_series(&series, &SeriesMapping::new().map("a", ["s2"]));
    series.delete_series("b", &surfaces).unwrap();
    assert_eq!(series.faults().fault_relation().dim(), 1);

    let err = series.delete_series("missing", &surfaces).unwrap_err();
    assert!(matches!(err, GeoError::Index(IndexError::UnknownLabel { .. })));
}

#[test]
fn rename_series_reaches_every_surface() {
    let mut series = series_of(&["a", "b"]);
    let mut surfaces = Surfaces::new();
    surfaces.set_surfaces_names(&series, ["s1", "s2", "s3"]).unwrap();
    surfaces.map_series(&series, &SeriesMapping::new().map("b", ["s3"]));

    series.rename_series(&[("a", "b"), ("b", "a")], &mut surfaces).unwrap();
    assert_eq!(series.names(), ["b", "a"]);
    assert_eq!(surfaces.get("s1").unwrap().series.as_deref(), Some("b"));
    assert_eq!(surfaces.get("s3").unwrap().series.as_deref(), Some("a"));

    let err = series.rename_series(&[("a", "b")], &mut surfaces).unwrap_err();
    assert!(matches!(err, GeoError::Index(IndexError::DuplicateLabel { .. })));
    assert_eq!(surfaces.get("s3").unwrap().series.as_deref(), Some("a"));
}

#[test]
fn exactly_one_basement() {
    let series = series_of(&["a"]);
    let mut surfaces = Surfaces::new();
    surfaces.set_surfaces_names(&series, ["top", "mid", "base"]).unwrap();
    let count = |s: &Surfaces| s.rows().iter().filter(|r| r.basement).count();
    assert_eq!(surfaces.basement(), Some("base"));

    surfaces.set_basement().unwrap();
    assert_eq!(count(&surfaces), 1);

    surfaces.set_basement_to("mid").unwrap();
    assert_eq!(count(&surfaces), 1);
    assert_eq!(surfaces.basement(), Some("mid"));

    surfaces.delete_surface(&["mid"]).unwrap();
    assert_eq!(surfaces.basement(), Some("base"));
    assert_eq!(count(&surfaces), 1);

    let mut tampered: serde_json::Value = serde_json::to_value(&surfaces).unwrap();
    tampered["rows"][0]["basement"] = serde_json::Value::Bool(true);
    let mut ambiguous: Surfaces = serde_json::from_value(tampered).unwrap();
    let err = ambiguous.set_basement().unwrap_err();
    assert!(matches!(err, GeoError::Integrity(IntegrityError::AmbiguousBasement { count: 2 })));
}

#[test]
fn sorted_tables_are_ordered_and_stable() {
    let series = series_of(&["young", "mid", "old"]);
    let mut surfaces = Surfaces::new();
    surfaces.set_surfaces_names(&series, ["a", "b", "c", "d"]).unwrap();
    surfaces.map_series(
        &series,
        &SeriesMapping::new().map("old", ["a"]).map("mid", ["b", "c"]).map("young", ["d"]),
    );

    let names = ["a", "c", "d", "b", "a", "d", "c", "b"];
    let coords: Vec<[f64; 3]> = (0..names.len()).map(|i| [i as f64, 0.0, 0.0]).collect();
    let mut points = SurfacePoints::new();
    points.set_surface_points(&surfaces, &coords, &names).unwrap();
    points.map_data_from_surfaces(&surfaces, SurfaceColumn::Series);
    points.map_data_from_surfaces(&surfaces, SurfaceColumn::Id);
    points.map_data_from_series(&series, SeriesColumn::OrderSeries);
    points.sort_table();

    let keys: Vec<(usize, usize)> = points
        .rows()
        .iter()
        .map(|r| (r.keys.order_series.unwrap(), r.keys.id.unwrap()))
        .collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    let d_rows: Vec<f64> = points.rows().iter().filter(|r| r.keys.surface == "d").map(|r| r.coords[0]).collect();
    assert_eq!(d_rows, vec![2.0, 5.0]);

    let before = points.clone();
    points.sort_table();
    assert_eq!(points, before);
}

#[test]
fn reorder_round_trip_restores_matrix() {
    let mut series = series_of(&["a", "b", "c", "d"]);
    series.faults_mut().set_is_fault(Some(["a", "c"])).unwrap();
    let relation = FaultRelation::from_rows(&[
        vec![false, true, true, false],
        vec![false; 4],
        vec![false, false, false, true],
        vec![false; 4],
    ])
    .unwrap();
    series.faults_mut().set_fault_relation(Some(relation)).unwrap();
    let before = series.clone();

    series.reorder_series(&["c", "a", "d", "b"]).unwrap();
    let moved = series.faults().fault_relation();
    assert!(moved.get(1, 3));
    assert!(moved.get(0, 2));
    assert!(series.faults().offsets("a", "c"));
    assert!(!series.faults().offsets("c", "d"));
    assert_eq!(series.faults().is_fault("c"), Some(true));

    series.reorder_series(&["a", "b", "c", "d"]).unwrap();
    assert_eq!(series, before);

    let err = series.reorder_series(&["a", "b"]).unwrap_err();
    assert!(matches!(err, GeoError::Index(IndexError::InvalidPermutation { .. })));
}

#[test]
fn adding_series_grows_matrix_with_false_cells() {
    let mut series = series_of(&["a", "b", "c", "d"]);
    let rows: Vec<Vec<bool>> = (0..4).map(|r| (0..4).map(|c| (r + c) % 2 == 0).collect()).collect();
    series
        .faults_mut()
        .set_fault_relation(Some(FaultRelation::from_rows(&rows).unwrap()))
        .unwrap();

    series.add_series("e").unwrap();
    assert_eq!(series.names(), ["a", "b", "c", "d", "e"]);
    let grown = series.faults().fault_relation().to_rows();
    assert_eq!(grown.len(), 5);
    for (r, row) in grown.iter().enumerate() {
        assert_eq!(row.len(), 5);
        for (c, &cell) in row.iter().enumerate() {
            if r < 4 && c < 4 {
                assert_eq!(cell, rows[r][c]);
            } else {
                assert!(!cell);
            }
        }
    }
    assert_eq!(series.faults().is_fault("e"), Some(false));
}

#[test]
fn mapping_to_unknown_series_unsets_and_warns() {
    let series = series_of(&["a", "b"]);
    let mut surfaces = Surfaces::new();
    surfaces.set_surfaces_names(&series, ["s1", "s2"]).unwrap();
    surfaces.map_series(&series, &SeriesMapping::new().map("a", ["s1"]).map("b", ["s2"]));

    let warnings = surfaces.map_series(&series, &SeriesMapping::new().map("a", ["s1"]).map("z", ["s2"]));
    assert_eq!(surfaces.get("s1").unwrap().series.as_deref(), Some("a"));
    assert_eq!(surfaces.get("s2").unwrap().series, None);
    assert_eq!(
        warnings,
        vec![ModelWarning::UnknownSeries {
            series: "z".to_string(),
            surfaces: vec!["s2".to_string()],
        }]
    );
}

#[test]
fn rename_surfaces_pushes_into_observations() {
    let series = series_of(&["a"]);
    let mut surfaces = Surfaces::new();
    surfaces.set_surfaces_names(&series, ["s1", "s2"]).unwrap();
    let mut points = SurfacePoints::new();
    points.set_surface_points(&surfaces, &[[0.0; 3], [1.0; 3]], &["s1", "s2"]).unwrap();
    let mut orientations = Orientations::new();

    surfaces
        .rename_surfaces(&[("s1", "s2"), ("s2", "s1")], &mut points, &mut orientations)
        .unwrap();
    assert_eq!(surfaces.names(), vec!["s2", "s1"]);
    assert_eq!(points.rows()[0].keys.surface, "s2");
    assert_eq!(points.rows()[1].keys.surface, "s1");

    let err = surfaces
        .rename_surfaces(&[("s1", "s2")], &mut points, &mut orientations)
        .unwrap_err();
    assert!(err.is_index());
    assert_eq!(points.rows()[0].keys.surface, "s2");
}
