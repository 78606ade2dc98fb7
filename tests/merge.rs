use std::path::{Path, PathBuf};

use ndarray::{array, Array2};
use zarrs_merge::{
    array::{Array, ArrayData, DataType},
    attributes::{AttributeSet, AttributeValue},
    collection::Collection,
    merge::{
        merge, merge_collections, MergeError, MergeIssue, MergeOptionsBuilder, Orientation,
    },
    node::NodePath,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn path(path: &str) -> NodePath {
    NodePath::new(path).unwrap()
}

fn collection(attributes: &[(&str, AttributeValue)], arrays: Vec<(&str, ArrayData)>) -> Collection {
    let attributes = AttributeSet::from_iter(attributes.iter().cloned());
    let mut collection = Collection::with_attributes(&attributes);
    for (array_path, data) in arrays {
        collection
            .insert_array(&path(array_path), Array::new(data))
            .unwrap();
    }
    collection
}

fn data<'a>(collection: &'a Collection, array_path: &str) -> &'a ArrayData {
    collection
        .array(&path(array_path))
        .unwrap_or_else(|| panic!("{array_path} is missing"))
        .data()
}

fn assert_close(actual: &ArrayData, expected: &Array2<f64>) {
    let ArrayData::Float64(actual) = actual else {
        panic!("expected float64, got {}", actual.data_type());
    };
    assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual} != {expected}");
    }
}

fn write(dir: &Path, name: &str, collection: &Collection) -> PathBuf {
    let location = dir.join(name);
    collection.write_path(&location).unwrap();
    location
}

#[test]
fn merge_vertical_without_alignment() {
    init_logger();
    let a = collection(
        &[],
        vec![(
            "/Y",
            ArrayData::from(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]),
        )],
    );
    let b = collection(
        &[],
        vec![(
            "/Y",
            ArrayData::from(array![[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]]),
        )],
    );
    let (merged, report) = merge_collections(&[a, b], &MergeOptionsBuilder::new().build()).unwrap();
    assert_eq!(
        data(&merged, "/Y"),
        &ArrayData::from(array![
            [1.0, 2.0],
            [3.0, 4.0],
            [5.0, 6.0],
            [7.0, 8.0],
            [9.0, 10.0],
            [11.0, 12.0]
        ])
    );
    assert!(report.merge_paths().contains(&path("/Y")));
    assert!(report.issues().is_empty());
}

#[test]
fn merge_sizes_sum_along_merge_axis() {
    init_logger();
    let shapes = [(2, 3), (2, 1), (2, 4)];
    let collections = shapes
        .iter()
        .map(|&(rows, cols)| {
            collection(
                &[],
                vec![
                    ("/Y", ArrayData::from(Array2::<f64>::zeros((rows, cols)))),
                    ("/ids", ArrayData::from(Array2::<i64>::ones((rows, cols)))),
                ],
            )
        })
        .collect::<Vec<_>>();
    let options = MergeOptionsBuilder::new()
        .orientation(Orientation::Horizontal)
        .build();
    let (merged, _) = merge_collections(&collections, &options).unwrap();
    assert_eq!(data(&merged, "/Y").shape(), &[2, 8]);
    assert_eq!(data(&merged, "/ids").shape(), &[2, 8]);
    assert_eq!(data(&merged, "/ids").data_type(), DataType::Int64);

    let (merged, report) =
        merge_collections(&collections, &MergeOptionsBuilder::new().build()).unwrap();
    assert!(merged.array(&path("/Y")).is_none());
    assert!(report.excluded_paths().contains(&path("/Y")));
}

#[test]
fn merge_vectors() {
    init_logger();
    let a = collection(
        &[],
        vec![("/v", ArrayData::from(array![1i64, 2, 3].into_dyn()))],
    );
    let b = collection(&[], vec![("/v", ArrayData::from(array![4i64, 5].into_dyn()))]);
    let (merged, _) =
        merge_collections(&[a.clone(), b.clone()], &MergeOptionsBuilder::new().build()).unwrap();
    assert_eq!(
        data(&merged, "/v"),
        &ArrayData::from(array![[1i64], [2], [3], [4], [5]])
    );

    let options = MergeOptionsBuilder::new()
        .orientation(Orientation::Horizontal)
        .build();
    let (merged, report) = merge_collections(&[a.clone(), a], &options).unwrap();
    assert_eq!(
        data(&merged, "/v"),
        &ArrayData::from(array![[1i64, 2, 3, 1, 2, 3]])
    );
    assert!(report.merge_paths().contains(&path("/v")));
    let (_, report) = merge_collections(&[b.clone(), b.clone(), collection(&[], vec![])], &options).unwrap();
    assert!(report.excluded_paths().contains(&path("/v")));
}

#[test]
fn merge_with_alignment() {
    init_logger();
    let a = collection(
        &[],
        vec![
            ("/x", ArrayData::from(array![[0.0, 2.5, 5.0, 7.5, 10.0]])),
            ("/Y", ArrayData::from(array![[0.0, 5.0, 10.0, 15.0, 20.0]])),
        ],
    );
    let b = collection(
        &[],
        vec![
            ("/x", ArrayData::from(array![[2.0, 4.0, 6.0, 8.0]])),
            ("/Y", ArrayData::from(array![[3i64, 5, 7, 9]])),
        ],
    );
    let options = MergeOptionsBuilder::new().align_at("x").build();
    let (merged, report) = merge_collections(&[a, b], &options).unwrap();
    assert_close(data(&merged, "/x"), &array![[2.0, 4.0, 6.0, 8.0]]);
    assert_close(
        data(&merged, "/Y"),
        &array![[4.0, 8.0, 12.0, 16.0], [3.0, 5.0, 7.0, 9.0]],
    );
    assert_eq!(report.alignment_paths().len(), 1);
    assert!(report.merge_paths().is_empty());
}

#[test]
fn merge_with_reserved_axis() {
    init_logger();
    let a = collection(
        &[],
        vec![
            ("/x", ArrayData::from(array![[0.0, 2.5, 5.0, 7.5, 10.0]])),
            ("/Y", ArrayData::from(array![[0.0, 5.0, 10.0, 15.0, 20.0]])),
        ],
    );
    let b = collection(
        &[],
        vec![
            ("/x", ArrayData::from(array![[2.0, 4.0, 6.0, 8.0]])),
            ("/Y", ArrayData::from(array![[3.0, 5.0, 7.0, 9.0]])),
        ],
    );
    let options = MergeOptionsBuilder::new()
        .align_at("x")
        .reserved_paths(vec!["/x".to_string()])
        .build();
    let (merged, report) = merge_collections(&[a, b], &options).unwrap();
    assert!(report.reserved_paths().is_empty());
    assert_close(data(&merged, "/x"), &array![[2.0, 4.0, 6.0, 8.0]]);
    assert_eq!(data(&merged, "/Y").shape(), &[2, 4]);
}

#[test]
fn merge_with_alignment_horizontal() {
    init_logger();
    let a = collection(
        &[],
        vec![
            ("/x", ArrayData::from(array![0.0, 1.0, 2.0].into_dyn())),
            ("/Y", ArrayData::from(array![[0.0], [10.0], [20.0]])),
        ],
    );
    let b = collection(
        &[],
        vec![
            ("/x", ArrayData::from(array![2.0, 0.0, 1.0].into_dyn())),
            ("/Y", ArrayData::from(array![[2.0, 20.0], [0.0, 0.0], [1.0, 10.0]])),
        ],
    );
    let options = MergeOptionsBuilder::new()
        .orientation(Orientation::Horizontal)
        .align_at("/x")
        .build();
    let (merged, _) = merge_collections(&[a, b], &options).unwrap();
    assert_close(data(&merged, "/x"), &array![[0.0], [1.0], [2.0]]);
    assert_close(
        data(&merged, "/Y"),
        &array![[0.0, 0.0, 0.0], [10.0, 1.0, 10.0], [20.0, 2.0, 20.0]],
    );
}

#[test]
fn merge_alignment_failures() {
    init_logger();
    let a = collection(
        &[],
        vec![
            ("/x", ArrayData::from(array![[0.0, 1.0]])),
            ("/Y", ArrayData::from(array![[0.0, 1.0]])),
            (
                "/labels",
                ArrayData::from(array![["a".to_string(), "b".to_string()]]),
            ),
        ],
    );
    let b = collection(
        &[],
        vec![
            ("/x", ArrayData::from(array![[2.0, 3.0]])),
            ("/Y", ArrayData::from(array![[0.0, 1.0]])),
            (
                "/labels",
                ArrayData::from(array![["c".to_string(), "d".to_string()]]),
            ),
        ],
    );
    let options = MergeOptionsBuilder::new().align_at("/x").build();
    assert!(matches!(
        merge_collections(&[a.clone(), b], &options),
        Err(MergeError::Interpolation(_))
    ));

    let (merged, report) = merge_collections(&[a.clone(), a], &options).unwrap();
    assert!(merged.array(&path("/labels")).is_none());
    assert!(report.excluded_paths().contains(&path("/labels")));
    assert!(report.issues().iter().any(|issue| matches!(
        issue,
        MergeIssue::NotInterpolable { data_type: DataType::String, .. }
    )));
    assert!(merged.array(&path("/Y")).is_some());
}

#[test]
fn merge_reserved_paths_verbatim() {
    init_logger();
    let units = |unit: &str| ArrayData::from(array![[unit.to_string()]]);
    let a = collection(
        &[],
        vec![
            ("/units", units("nm")),
            ("/Y", ArrayData::from(array![[1.0]])),
        ],
    );
    let b = collection(
        &[],
        vec![
            ("/units", units("cm")),
            ("/Y", ArrayData::from(array![[2.0]])),
        ],
    );
    let c = collection(&[], vec![("/Y", ArrayData::from(array![[3.0]]))]);
    let options = MergeOptionsBuilder::new()
        .reserved_paths(vec!["units".to_string()])
        .build();
    let (merged, report) = merge_collections(&[a.clone(), b, c], &options).unwrap();
    assert_eq!(merged.array(&path("/units")), a.array(&path("/units")));
    assert_eq!(data(&merged, "/Y"), &ArrayData::from(array![[1.0], [2.0], [3.0]]));
    assert!(report.reserved_paths().contains(&path("/units")));
}

#[test]
fn merge_data_type_mismatch() {
    init_logger();
    let a = collection(
        &[],
        vec![
            ("/ints", ArrayData::from(array![[1i64, 2]])),
            ("/floats", ArrayData::from(array![[1.5, 2.5]])),
            ("/mixed", ArrayData::from(array![[1.5, 2.5]])),
        ],
    );
    let b = collection(
        &[],
        vec![
            ("/ints", ArrayData::from(array![[3.0, 4.0]])),
            ("/floats", ArrayData::from(array![[3i64, 4]])),
            (
                "/mixed",
                ArrayData::from(array![["a".to_string(), "b".to_string()]]),
            ),
        ],
    );
    let (merged, report) = merge_collections(&[a, b], &MergeOptionsBuilder::new().build()).unwrap();
    assert_eq!(data(&merged, "/ints"), &ArrayData::from(array![[1i64, 2], [3, 4]]));
    assert_eq!(
        data(&merged, "/floats"),
        &ArrayData::from(array![[1.5, 2.5], [3.0, 4.0]])
    );
    assert!(merged.array(&path("/mixed")).is_none());
    assert!(report.excluded_paths().contains(&path("/mixed")));
    assert_eq!(
        report.issues(),
        &[MergeIssue::DataTypeMismatch {
            path: path("/mixed"),
            index: 1,
            reference: DataType::Float64,
            found: DataType::String,
        }]
    );
}

#[test]
fn merge_copies_reference_attributes() {
    init_logger();
    let a = collection(&[("name", "a".into()), ("owner", "x".into())], vec![]);
    let b = collection(&[("name", "b".into())], vec![]);
    let options = MergeOptionsBuilder::new().reference_index(1).build();
    let (merged, _) = merge_collections(&[a, b], &options).unwrap();
    assert_eq!(
        merged.attributes(),
        AttributeSet::from_iter([("name", "b")])
    );
    assert!(merged.array_paths().is_empty());
}

#[test]
fn merge_attributes_and_sort() {
    init_logger();
    let dir = tempfile::TempDir::new().unwrap();
    let inputs = [(30, 3.0, "c"), (10, 1.0, "a"), (20, 2.0, "b")]
        .iter()
        .map(|&(id, temperature, operator)| {
            let collection = collection(
                &[
                    ("name", format!("sample {id}").into()),
                    ("description", "common".into()),
                    ("temperature", temperature.into()),
                    ("operator", operator.into()),
                    ("count", AttributeValue::Integer(id)),
                ],
                vec![(
                    "/Y",
                    ArrayData::from(array![[id as f64, id as f64 + 0.5]]),
                )],
            );
            write(dir.path(), &format!("{id}.zarr"), &collection)
        })
        .collect::<Vec<_>>();
    let output = dir.path().join("merged.zarr");
    let options = MergeOptionsBuilder::new().merge_attributes(true).build();
    let report = merge(&inputs, &output, &options).unwrap();
    assert_eq!(report.sort_permutation(), Some(&[1, 2, 0][..]));
    assert!(report.issues().is_empty());

    let merged = Collection::open_path(&output).unwrap();
    assert_eq!(
        data(&merged, "/base_sample_id"),
        &ArrayData::from(array![[10i64], [20], [30]])
    );
    assert_eq!(
        data(&merged, "/base_sample_name"),
        &ArrayData::from(array![
            ["sample 10".to_string()],
            ["sample 20".to_string()],
            ["sample 30".to_string()]
        ])
    );
    assert_eq!(
        data(&merged, "/temperature"),
        &ArrayData::from(array![[1.0], [2.0], [3.0]])
    );
    assert_eq!(
        data(&merged, "/operator"),
        &ArrayData::from(array![["a".to_string()], ["b".to_string()], ["c".to_string()]])
    );
    assert_eq!(
        data(&merged, "/count"),
        &ArrayData::from(array![[10i64], [20], [30]])
    );
    assert_eq!(
        data(&merged, "/Y"),
        &ArrayData::from(array![[10.0, 10.5], [20.0, 20.5], [30.0, 30.5]])
    );
    for excluded in ["/name", "/description"] {
        assert!(merged.array(&path(excluded)).is_none());
    }
    assert!(!report.merged_attributes().contains("description"));
    assert!(merged.attributes().is_empty());
}

#[test]
fn merge_attributes_horizontal() {
    init_logger();
    let dir = tempfile::TempDir::new().unwrap();
    let inputs = [(2, 2i64), (1, 1)]
        .iter()
        .map(|&(id, count)| {
            let collection = collection(
                &[("count", AttributeValue::Integer(count))],
                vec![("/Y", ArrayData::from(array![[id as f64], [0.0]]))],
            );
            write(dir.path(), &format!("{id}.zarr"), &collection)
        })
        .collect::<Vec<_>>();
    let mut collections = inputs
        .iter()
        .map(|input| Collection::open_path(input).unwrap())
        .collect::<Vec<_>>();
    collections[1].update_attributes(
        &[("count".to_string(), serde_json::json!(1.0))]
            .into_iter()
            .collect(),
    );
    let options = MergeOptionsBuilder::new()
        .orientation(Orientation::Horizontal)
        .merge_attributes(true)
        .build();
    let (merged, report) = merge_collections(&collections, &options).unwrap();
    assert_eq!(data(&merged, "/count"), &ArrayData::from(array![[1i64, 2]]));
    assert_eq!(
        data(&merged, "/Y"),
        &ArrayData::from(array![[1.0, 2.0], [0.0, 0.0]])
    );
    assert_eq!(
        data(&merged, "/base_sample_name"),
        &ArrayData::from(array![[String::new(), String::new()]])
    );
    assert_eq!(
        report
            .issues()
            .iter()
            .filter(|issue| matches!(issue, MergeIssue::MissingLabel { .. }))
            .count(),
        2
    );
}

#[test]
fn merge_attribute_issues() {
    init_logger();
    let a = collection(
        &[
            ("name", "a".into()),
            ("ratio", AttributeValue::Integer(1)),
            ("mode", "fast".into()),
            ("bad/key", "x".into()),
        ],
        vec![],
    );
    let b = collection(
        &[
            ("name", "b".into()),
            ("ratio", AttributeValue::Float(1.5)),
            ("mode", AttributeValue::Integer(2)),
            ("bad/key", "y".into()),
        ],
        vec![],
    );
    let options = MergeOptionsBuilder::new()
        .merge_attributes(true)
        .sort_by(None)
        .build();
    let (merged, report) = merge_collections(&[a.clone(), b.clone()], &options).unwrap();
    assert!(merged.array(&path("/ratio")).is_none());
    assert!(merged.array(&path("/mode")).is_none());
    assert!(merged.array(&path("/base_sample_id")).is_none());
    assert_eq!(
        data(&merged, "/base_sample_name"),
        &ArrayData::from(array![["a".to_string()], ["b".to_string()]])
    );
    let issues = report.issues();
    assert!(issues.iter().any(|issue| matches!(issue, MergeIssue::FileId { index: 0, location: None })));
    assert!(issues.iter().any(|issue| matches!(issue, MergeIssue::AttributeKey { key, .. } if key == "bad/key")));
    assert!(issues.iter().any(|issue| matches!(issue, MergeIssue::AttributeCoercion { key, index: 1, .. } if key == "ratio")));
    assert!(issues.iter().any(|issue| matches!(issue, MergeIssue::AttributeCoercion { key, index: 1, .. } if key == "mode")));

    let options = MergeOptionsBuilder::new().merge_attributes(true).build();
    assert!(matches!(
        merge_collections(&[a, b], &options),
        Err(MergeError::SortKeyMissing(_))
    ));
}

#[test]
fn merge_sort_is_a_permutation() {
    init_logger();
    let values = [5.0, -1.0, 3.0, 3.0, 0.5];
    let collections = values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            collection(
                &[
                    ("value", value.into()),
                    ("index", AttributeValue::Integer(i as i64)),
                ],
                vec![],
            )
        })
        .collect::<Vec<_>>();
    let options = MergeOptionsBuilder::new()
        .merge_attributes(true)
        .sort_by(Some("value".to_string()))
        .build();
    let (merged, report) = merge_collections(&collections, &options).unwrap();
    assert_eq!(report.sort_permutation(), Some(&[1, 4, 2, 3, 0][..]));
    let ArrayData::Float64(sorted) = data(&merged, "/value") else {
        panic!("expected float64");
    };
    let mut expected = values.to_vec();
    expected.sort_by(f64::total_cmp);
    assert_eq!(sorted.iter().copied().collect::<Vec<_>>(), expected);
    assert_eq!(
        data(&merged, "/index"),
        &ArrayData::from(array![[1i64], [4], [2], [3], [0]])
    );
}

#[test]
fn merge_failure_leaves_no_output() {
    init_logger();
    let dir = tempfile::TempDir::new().unwrap();
    let a = collection(&[], vec![("/Y", ArrayData::from(array![[1.0]]))]);
    let inputs = [write(dir.path(), "1.zarr", &a), write(dir.path(), "2.zarr", &a)];
    let output = dir.path().join("merged.zarr");
    let options = MergeOptionsBuilder::new().align_at("/missing").build();
    assert!(merge(&inputs, &output, &options).is_err());
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

    let missing = dir.path().join("3.zarr");
    assert!(matches!(
        merge(&[missing], &output, &MergeOptionsBuilder::new().build()),
        Err(MergeError::CollectionError(_))
    ));
    assert!(!output.exists());
}

#[test]
fn merge_replaces_existing_output() {
    init_logger();
    let dir = tempfile::TempDir::new().unwrap();
    let a = collection(&[], vec![("/Y", ArrayData::from(array![[1.0]]))]);
    let b = collection(&[], vec![("/Z", ArrayData::from(array![[2i64]]))]);
    let output = dir.path().join("merged.zarr");
    let inputs = [write(dir.path(), "1.zarr", &a)];
    merge(&inputs, &output, &MergeOptionsBuilder::new().build()).unwrap();
    assert!(Collection::open_path(&output).unwrap().array(&path("/Y")).is_some());

    let inputs = [write(dir.path(), "2.zarr", &b)];
    merge(&inputs, &output, &MergeOptionsBuilder::new().build()).unwrap();
    let merged = Collection::open_path(&output).unwrap();
    assert!(merged.array(&path("/Y")).is_none());
    assert_eq!(data(&merged, "/Z"), &ArrayData::from(array![[2i64]]));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
}
