//! End-to-end tests over a small document tree
//!
//! Covers the documented example scenarios plus the manager, query set and error
//! behavior a caller relies on.

use kml_query_lib::{
    Element, ErrorKind, Folder, Handle, KmlDocument, KmlError, MultiGeometry, Path, Placemark,
    Point, Polygon, QuerySet, Value,
};
use serde_json::json;

// ============================================================================
// Fixtures
// ============================================================================

/// Route library logs to the test output; set `RUST_LOG=kml_query_lib=trace` to see them
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn placemark(name: &str, lon: f64, lat: f64) -> Placemark {
    Placemark::named(name).with_coordinates((lon, lat)).unwrap()
}

/// Document
/// ├── Capital A (0, 0)
/// ├── Folder "Region"
/// │   ├── Capital B (1, 0)
/// │   ├── Other (20, 45)
/// │   └── Folder "Detail"
/// │       ├── Harbor (-76.5, 39.3)
/// │       └── Unplaced (no coordinates)
/// └── Path "Trail"
fn create_test_document() -> KmlDocument {
    init_tracing();
    let document = KmlDocument::new(
        Some("Test document".to_string()),
        Some("Fixture tree".to_string()),
    );
    document
        .placemarks()
        .add(placemark("Capital A", 0.0, 0.0))
        .unwrap();

    let region = document.folders().add(Folder::named("Region")).unwrap();
    region
        .placemarks()
        .add(placemark("Capital B", 1.0, 0.0))
        .unwrap();
    region
        .placemarks()
        .add(placemark("Other", 20.0, 45.0))
        .unwrap();

    let detail = region.folders().add(Folder::named("Detail")).unwrap();
    detail
        .placemarks()
        .add(placemark("Harbor", -76.5, 39.3))
        .unwrap();
    detail
        .placemarks()
        .add(Placemark::named("Unplaced"))
        .unwrap();

    document
        .paths()
        .add(
            Path::named("Trail")
                .with_coordinates(["0,0", "0.5, 0.5", "1,1,10"])
                .unwrap(),
        )
        .unwrap();
    document
}

fn names<T: Element>(qs: &QuerySet<T>) -> Vec<String> {
    qs.iter()
        .map(|h| h.borrow().name().unwrap_or_default().to_string())
        .collect()
}

// ============================================================================
// Example scenarios
// ============================================================================

#[test]
fn test_placemark_exposes_coordinates() {
    let placemark = Placemark::default()
        .with_coordinates((-76.5, 39.3, 0.0))
        .unwrap();
    assert_eq!(placemark.longitude(), Some(-76.5));
    assert_eq!(placemark.latitude(), Some(39.3));
    assert_eq!(placemark.altitude(), Some(0.0));
    assert!(placemark.has_coordinates());
}

#[test]
fn test_distance_and_bearing_one_degree_east() {
    let a = placemark("A", 0.0, 0.0);
    let b = placemark("B", 1.0, 0.0);
    let distance = a.distance_to(&b).unwrap();
    assert!((distance - 111.32).abs() / 111.32 < 0.01, "got {distance}");
    let bearing = a.bearing_to(&b).unwrap();
    assert!((bearing - 90.0).abs() < 1.0, "got {bearing}");
}

#[test]
fn test_capital_filter_and_get() {
    let qs: QuerySet<Placemark> = ["Capital A", "Capital B", "Other"]
        .into_iter()
        .map(|name| Handle::new(Placemark::named(name)))
        .collect();

    let capitals = qs.filter([("name__icontains", "capital")]).unwrap();
    assert_eq!(names(&capitals), ["Capital A", "Capital B"]);

    let err = qs.get([("name__icontains", "capital")]).unwrap_err();
    match err {
        KmlError::MultipleElementsReturned {
            element_type,
            count,
            query_kwargs,
        } => {
            assert_eq!(element_type, "Placemark");
            assert_eq!(count, 2);
            assert_eq!(
                query_kwargs,
                vec![("name__icontains".to_string(), json!("capital"))]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_children_versus_flatten() {
    let folder = Handle::new(Folder::named("Root"));
    folder.placemarks().add(Placemark::named("Direct")).unwrap();
    let sub = folder.folders().add(Folder::named("Sub")).unwrap();
    for i in 1..=4 {
        sub.placemarks()
            .add(Placemark::named(format!("Nested {i}")))
            .unwrap();
    }

    assert_eq!(folder.placemarks().children().count(), 1);
    assert_eq!(folder.placemarks().all(false).count(), 1);
    let flat = folder.placemarks().all(true);
    assert_eq!(
        names(&flat),
        ["Direct", "Nested 1", "Nested 2", "Nested 3", "Nested 4"]
    );
}

#[test]
fn test_polygon_counts() {
    let polygon = Polygon::named("Yard")
        .with_outer_boundary([(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)])
        .unwrap()
        .with_inner_boundary(["1,1", "2,1", "2,2"])
        .unwrap();
    assert_eq!(polygon.boundary_point_count(), 3);
    assert_eq!(polygon.hole_count(), 1);
}

#[test]
fn test_single_component_path_is_invalid() {
    let err = Path::default().with_coordinates(["10.0"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCoordinates);
}

// ============================================================================
// Managers and traversal
// ============================================================================

#[test]
fn test_document_flatten_in_document_order() {
    let document = create_test_document();
    assert_eq!(names(&document.placemarks().children()), ["Capital A"]);
    assert_eq!(
        names(&document.placemarks().all(true)),
        ["Capital A", "Capital B", "Other", "Harbor", "Unplaced"]
    );
    assert_eq!(names(&document.folders().all(true)), ["Region", "Detail"]);
    assert_eq!(document.paths().all(true).count(), 1);
}

#[test]
fn test_folder_flatten_is_pre_order() {
    let document = create_test_document();
    document.folders().add(Folder::named("Annex")).unwrap();
    assert_eq!(
        names(&document.folders().all(true)),
        ["Region", "Detail", "Annex"]
    );
}

#[test]
fn test_root_element_moves_into_folder() {
    let document = create_test_document();
    let capital = document.placemarks().first().unwrap();
    let detail = document
        .folders()
        .all(true)
        .get([("name", "Detail")])
        .unwrap();

    detail.placemarks().add(capital.clone()).unwrap();
    assert!(!document.placemarks().exists());
    assert!(capital.borrow().parent().unwrap().ptr_eq(&detail));
    assert_eq!(document.placemarks().all(true).count(), 5);
}

#[test]
fn test_parent_links() {
    let document = create_test_document();
    let harbor = document
        .placemarks()
        .all(true)
        .get([("name", "Harbor")])
        .unwrap();
    let parent = harbor.borrow().parent().unwrap();
    assert_eq!(parent.borrow().name(), Some("Detail"));
    let grandparent = parent.borrow().parent().unwrap();
    assert_eq!(grandparent.borrow().name(), Some("Region"));
    assert!(grandparent.borrow().parent().is_none());

    // Copies are detached
    assert!(harbor.borrow().copy().parent().is_none());
}

#[test]
fn test_folder_cycle_is_rejected() {
    let document = create_test_document();
    let region = document.folders().first().unwrap();
    let detail = region.folders().first().unwrap();
    let err = detail.folders().add(region.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = region.folders().add(region.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_move_between_folders() {
    let document = create_test_document();
    let region = document.folders().first().unwrap();
    let detail = region.folders().first().unwrap();
    let other = region.placemarks().get([("name", "Other")]).unwrap();

    detail.placemarks().add(other.clone()).unwrap();
    assert_eq!(names(&region.placemarks().children()), ["Capital B"]);
    assert_eq!(detail.placemarks().count(), 3);
    assert!(other.borrow().parent().unwrap().ptr_eq(&detail));
    // Still reachable exactly once
    assert_eq!(document.placemarks().all(true).count(), 5);
}

#[test]
fn test_manager_create_and_remove() {
    let folder = Handle::new(Folder::named("Scratch"));
    let created = folder
        .placemarks()
        .create([
            ("name", json!("New")),
            ("coordinates", json!("12.5, 41.9")),
            ("address", json!("Rome")),
        ])
        .unwrap();
    assert_eq!(created.borrow().latitude(), Some(41.9));
    assert!(created.borrow().parent().unwrap().ptr_eq(&folder));

    let err = folder
        .placemarks()
        .create([("colour", json!("red"))])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownAttribute);

    assert!(folder.placemarks().remove(&created));
    assert!(!folder.placemarks().remove(&created));
    assert!(created.borrow().parent().is_none());
    assert!(!folder.placemarks().exists());
}

#[test]
fn test_element_counts_are_not_recursive() {
    let document = create_test_document();
    let counts = document.element_counts();
    assert_eq!(counts["placemarks"], 1);
    assert_eq!(counts["folders"], 1);
    assert_eq!(counts["paths"], 1);

    let region = document.folders().first().unwrap();
    assert_eq!(region.borrow().total_element_count(), 3);
    assert_eq!(
        region.borrow().field("placemark_count"),
        Some(json!(2))
    );
}

// ============================================================================
// Query sets
// ============================================================================

#[test]
fn test_filter_chaining_matches_combined_filter() {
    let placemarks = create_test_document().placemarks().all(true);
    let combined = placemarks
        .filter([
            ("latitude__gte", json!(0)),
            ("longitude__lt", json!(10)),
        ])
        .unwrap();
    let chained = placemarks
        .filter([("latitude__gte", 0)])
        .unwrap()
        .filter([("longitude__lt", 10)])
        .unwrap();
    assert_eq!(names(&combined), ["Capital A", "Capital B", "Harbor"]);
    assert_eq!(names(&combined), names(&chained));
}

#[test]
fn test_lookup_operators_through_manager() {
    let document = create_test_document();
    let all = document.placemarks().all(true);

    assert_eq!(
        names(&all.filter([("name__in", json!(["Harbor", "Other"]))]).unwrap()),
        ["Other", "Harbor"]
    );
    assert_eq!(
        names(&all.filter([("latitude__range", json!([30, 50]))]).unwrap()),
        ["Other", "Harbor"]
    );
    assert_eq!(
        names(&all.filter([("coordinates__isnull", true)]).unwrap()),
        ["Unplaced"]
    );
    assert_eq!(
        names(&all.filter([("name__regex", r"^Capital [AB]$")]).unwrap()),
        ["Capital A", "Capital B"]
    );
    assert_eq!(
        names(&all.exclude([("name__startswith", "Capital")]).unwrap()),
        ["Other", "Harbor", "Unplaced"]
    );
}

#[test]
fn test_unsupported_lookup_is_query_error() {
    let document = create_test_document();
    let err = document
        .placemarks()
        .filter([("name__bogus", "x")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
}

#[test]
fn test_get_not_found_echoes_kwargs() {
    let document = create_test_document();
    let err = document
        .placemarks()
        .all(true)
        .get([("name", "Atlantis")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ElementNotFound);
    assert_eq!(
        err.query_kwargs(),
        Some(&vec![("name".to_string(), json!("Atlantis"))])
    );
    assert_eq!(
        err.to_string(),
        "Placemark matching query(name=Atlantis) does not exist."
    );
}

#[test]
fn test_order_by_reverse_duality() {
    let placemarks = create_test_document()
        .placemarks()
        .all(true)
        .has_coordinates();
    let ascending = placemarks.order_by("longitude").unwrap();
    assert_eq!(
        names(&ascending),
        ["Harbor", "Capital A", "Capital B", "Other"]
    );
    assert_eq!(
        names(&ascending.reverse()),
        names(&placemarks.order_by("-longitude").unwrap())
    );
}

#[test]
fn test_order_by_missing_field() {
    let placemarks = create_test_document().placemarks().all(true);
    let err = placemarks.order_by("population").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
}

#[test]
fn test_values_projection() {
    let placemarks = create_test_document().placemarks().children();
    let rows = placemarks.values(&["name", "latitude"]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Capital A"));
    assert_eq!(rows[0]["latitude"], json!(0.0));

    let flat = placemarks.values_list(&["name"], true).unwrap();
    assert_eq!(flat, vec![json!("Capital A")]);
    let err = placemarks.values_list(&[], true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn test_updates_visible_across_query_sets() {
    let document = create_test_document();
    let first = document.placemarks().all(true);
    let second = document.placemarks().all(true);
    first
        .get([("name", "Harbor")])
        .unwrap()
        .borrow_mut()
        .update([("address", "Pier 1")])
        .unwrap();
    let harbor = second.get([("address", "Pier 1")]).unwrap();
    assert_eq!(harbor.borrow().name(), Some("Harbor"));
}

// ============================================================================
// Geospatial predicates
// ============================================================================

#[test]
fn test_near_and_within_bounds() {
    let placemarks = create_test_document().placemarks().all(true);
    assert_eq!(
        names(&placemarks.near(0.0, 0.0, 150.0).unwrap()),
        ["Capital A", "Capital B"]
    );
    assert_eq!(
        names(&placemarks.within_bounds(50.0, 30.0, 30.0, -80.0).unwrap()),
        ["Other", "Harbor"]
    );
    assert_eq!(placemarks.has_coordinates().count(), 4);
}

#[test]
fn test_paths_have_no_point_location() {
    let document = create_test_document();
    assert_eq!(document.paths().has_coordinates().count(), 0);
    let trail = document.paths().first().unwrap();
    assert_eq!(trail.borrow().point_count(), 3);
    assert!(trail.borrow().length_km() > 150.0);
}

#[test]
fn test_multigeometry_placemark() {
    let mut placemark = Placemark::named("Campus");
    placemark.set_multigeometry(Some(
        MultiGeometry::default()
            .with_geometry(Point::at((1.0, 1.0)).unwrap())
            .with_geometry(Path::default().with_coordinates([(0.0, 0.0), (1.0, 1.0)]).unwrap()),
    ));
    assert!(!placemark.has_coordinates());
    assert_eq!(
        placemark.field("multigeometry.geometry_counts.points"),
        Some(json!(1))
    );
    assert_eq!(placemark.field("multigeometry.geometry_counts.total"), Some(json!(2)));
    assert_eq!(placemark.field("address"), Some(Value::Null));
}
