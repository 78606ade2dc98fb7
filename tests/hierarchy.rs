use ndarray::array;
use zarrs_merge::{
    array::{Array, ArrayData},
    attributes::AttributeSet,
    collection::Collection,
    node::{Node, NodePath},
    storage::store::{FilesystemStore, MemoryStore},
};

fn collection() -> Collection {
    let attributes = AttributeSet::from_iter([("name", "sample 7")]).with("temperature", 21.5);
    let mut collection = Collection::with_attributes(&attributes);
    let mut y = serde_json::Map::new();
    y.insert("units".to_string(), "counts".into());
    collection
        .insert_array(
            &NodePath::new("/Y").unwrap(),
            Array::new(ArrayData::from(array![[1.0, f64::NAN, f64::NEG_INFINITY]]))
                .with_attributes(y),
        )
        .unwrap();
    collection
        .insert_array(
            &NodePath::new("/meta/ids").unwrap(),
            Array::new(ArrayData::from(array![[1i64], [-2], [i64::MAX]])),
        )
        .unwrap();
    collection
        .insert_array(
            &NodePath::new("/meta/labels").unwrap(),
            Array::new(ArrayData::from(
                array!["a".to_string(), String::new(), "ünïcode".to_string()].into_dyn(),
            )),
        )
        .unwrap();
    collection
}

fn assert_same(read: &Collection, written: &Collection) {
    assert_eq!(read.attributes(), written.attributes());
    assert_eq!(read.array_paths(), written.array_paths());
    for path in written.array_paths() {
        let (read, written) = (read.array(&path).unwrap(), written.array(&path).unwrap());
        assert_eq!(read.attributes(), written.attributes());
        match (read.data(), written.data()) {
            (ArrayData::Float64(read), ArrayData::Float64(written)) => {
                assert_eq!(read.shape(), written.shape());
                for (r, w) in read.iter().zip(written) {
                    assert!(r == w || (r.is_nan() && w.is_nan()), "{r} != {w}");
                }
            }
            (read, written) => assert_eq!(read, written),
        }
    }
}

#[test]
fn hierarchy_tree() {
    let dir = tempfile::TempDir::new().unwrap();
    collection().write_path(dir.path()).unwrap();
    let store = FilesystemStore::new(dir.path()).unwrap().sorted();
    let node = Node::open(&store, &NodePath::root()).unwrap();
    let tree = node.hierarchy_tree();
    println!("{:?}", tree);
    assert_eq!(
        tree,
        "/
  Y [1, 3] float64
  meta
    ids [3, 1] int64
    labels [3] string
"
    );
}

#[test]
fn filesystem_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let location = dir.path().join("7.zarr");
    let written = collection();
    written.write_path(&location).unwrap();
    assert!(location.join("zarr.json").is_file());
    assert!(location.join("Y").join("zarr.json").is_file());
    assert!(location.join("Y").join("c").join("0").join("0").is_file());
    assert!(location.join("meta").join("labels").join("c").join("0").is_file());

    let read = Collection::open_path(&location).unwrap();
    assert_eq!(read.location(), Some(location.as_path()));
    assert_eq!(read.file_stem(), Some("7"));
    assert_same(&read, &written);

    let metadata: serde_json::Value =
        serde_json::from_slice(&std::fs::read(location.join("Y").join("zarr.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["node_type"], "array");
    assert_eq!(metadata["data_type"], "float64");
    assert_eq!(metadata["shape"], serde_json::json!([1, 3]));
}

#[test]
fn memory_round_trip() {
    let store = MemoryStore::new();
    let written = collection();
    written.store(&store).unwrap();
    let read = Collection::open(&store).unwrap();
    assert_same(&read, &written);

    Collection::default().store(&store).unwrap();
    let read = Collection::open(&store).unwrap();
    assert!(read.array_paths().is_empty());
    assert!(read.attributes().is_empty());
}

#[test]
fn open_missing_collection() {
    let dir = tempfile::TempDir::new().unwrap();
    assert!(Collection::open_path(dir.path().join("absent.zarr")).is_err());
    assert!(Collection::open_path(dir.path()).is_err());
}
