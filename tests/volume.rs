extern crate ndarray;
extern crate volmap;
#[macro_use]
extern crate pretty_assertions;

mod util;

use ndarray::{s, ArrayD, Axis, Ix2, Ix3, IxDyn};
use util::{arange, diagonal_affine, volume};
use volmap::{
    Casting, DataType, IdxElem, InMemSource, MappedArray, MetaValue, ReadOptions, VolMapError,
};

#[test]
fn slicing_is_lazy_and_restricts_shape() {
    let v = volume(&[10, 20, 30]);
    let s = v
        .slice(&[IdxElem::stepped(Some(2), Some(8), 2), IdxElem::full(), 5.into()])
        .unwrap();
    assert_eq!(s.shape(), [3, 20].as_ref());
    assert_eq!(s.dim(), 2);
    // the original layout is still visible through the view
    assert_eq!(s.original_shape(), [10, 20, 30].as_ref());
}

#[test]
fn slicing_restricts_the_affine() {
    let affine = diagonal_affine(&[1.5, 2.0, 3.0], &[10.0, 20.0, 30.0]);
    let source = InMemSource::with_affine(arange(&[10, 20, 30]), affine).unwrap();
    let v = MappedArray::new(source);
    assert_eq!(v.spatial_mask(), [true, true, true].as_ref());

    let s = v
        .slice(&[IdxElem::stepped(Some(2), Some(8), 2), IdxElem::full(), 5.into()])
        .unwrap();
    assert_eq!(s.spatial_mask(), [true, true].as_ref());
    let affine = s.affine().expect("the view must keep an affine");
    // world side untouched, one voxel column dropped
    assert_eq!(affine.nrows(), 4);
    assert_eq!(affine.ncols(), 3);
    // step 2 scales the first direction, the dropped axis moved the origin
    assert!((affine[(0, 0)] - 3.0).abs() < 1e-12);
    assert!((affine[(1, 1)] - 2.0).abs() < 1e-12);
    assert!((affine[(0, 2)] - 13.0).abs() < 1e-12);
    assert!((affine[(1, 2)] - 20.0).abs() < 1e-12);
    assert!((affine[(2, 2)] - 45.0).abs() < 1e-12);

    let vs = s.voxel_size().unwrap();
    assert!((vs[0] - 3.0).abs() < 1e-12);
    assert!((vs[1] - 2.0).abs() < 1e-12);
}

#[test]
fn read_matches_eager_slicing() {
    let v = volume(&[4, 5, 6]);
    let s = v
        .slice(&[
            IdxElem::stepped(Some(1), None, 2),
            IdxElem::reversed(),
            2.into(),
        ])
        .unwrap();
    let expected = arange(&[4, 5, 6])
        .into_dimensionality::<Ix3>()
        .unwrap()
        .slice(s![1..;2, ..;-1, 2])
        .to_owned()
        .into_dyn();
    assert_eq!(s.shape(), expected.shape());
    let got: ArrayD<f64> = s.read(&ReadOptions::new()).unwrap();
    assert_eq!(got, expected);
}

#[test]
fn chained_slices_compose() {
    let v = volume(&[3, 5, 4]);
    let s = v
        .slice(&[IdxElem::full(), IdxElem::range(1, 4), IdxElem::full()])
        .unwrap()
        .slice(&[
            (-1).into(),
            IdxElem::reversed(),
            IdxElem::stepped(None, None, 2),
        ])
        .unwrap();
    let expected = arange(&[3, 5, 4])
        .into_dimensionality::<Ix3>()
        .unwrap()
        .slice(s![-1, 1..4;-1, ..;2])
        .to_owned()
        .into_dyn();
    assert_eq!(s.shape(), expected.shape());
    let got: ArrayD<f64> = s.read(&ReadOptions::new()).unwrap();
    assert_eq!(got, expected);
}

#[test]
fn reversing_twice_is_the_identity() {
    let v = volume(&[5, 3]);
    let index = [IdxElem::reversed(), IdxElem::full()];
    let twice = v.slice(&index).unwrap().slice(&index).unwrap();
    assert_eq!(twice.shape(), v.shape());
    let a: ArrayD<f64> = v.read(&ReadOptions::new()).unwrap();
    let b: ArrayD<f64> = twice.read(&ReadOptions::new()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn ellipsis_expands_to_full_slices() {
    let v = volume(&[2, 3, 4, 5]);
    let a = v.slice(&[1.into(), IdxElem::Ellipsis, 2.into()]).unwrap();
    let b = v
        .slice(&[1.into(), IdxElem::full(), IdxElem::full(), 2.into()])
        .unwrap();
    assert_eq!(a.shape(), b.shape());
    let left: ArrayD<f64> = a.read(&ReadOptions::new()).unwrap();
    let right: ArrayD<f64> = b.read(&ReadOptions::new()).unwrap();
    assert_eq!(left, right);
}

#[test]
fn new_axes_are_inserted_and_readable() {
    let v = volume(&[2, 3]);
    let s = v
        .slice(&[IdxElem::NewAxis, IdxElem::full(), IdxElem::full()])
        .unwrap();
    assert_eq!(s.shape(), [1, 2, 3].as_ref());
    let expected = arange(&[2, 3]).insert_axis(Axis(0));
    let got: ArrayD<f64> = s.read(&ReadOptions::new()).unwrap();
    assert_eq!(got, expected);
    // integer-indexing the inserted axis drops it again
    let back = s
        .slice(&[0.into(), IdxElem::full(), IdxElem::full()])
        .unwrap();
    assert_eq!(back.shape(), [2, 3].as_ref());
}

#[test]
fn permutation_reorders_axes_and_data() {
    let v = volume(&[2, 3, 4]);
    let p = v.permute(&[2, 0, 1]).unwrap();
    assert_eq!(p.shape(), [4, 2, 3].as_ref());
    let expected = arange(&[2, 3, 4]).permuted_axes(vec![2, 0, 1]);
    let got: ArrayD<f64> = p.read(&ReadOptions::new()).unwrap();
    assert_eq!(got, expected);

    let t = v.transpose(0, 2).unwrap();
    assert_eq!(t.shape(), [4, 3, 2].as_ref());

    assert!(matches!(
        v.permute(&[0, 0, 1]),
        Err(VolMapError::InvalidPermutation(..))
    ));
    assert!(matches!(
        v.permute(&[0, 1]),
        Err(VolMapError::InvalidPermutation(..))
    ));
}

#[test]
fn permute_after_dropping_an_axis() {
    let v = volume(&[3, 4, 5]);
    let s = v
        .slice(&[1.into(), IdxElem::full(), IdxElem::full()])
        .unwrap()
        .permute(&[1, 0])
        .unwrap();
    assert_eq!(s.shape(), [5, 4].as_ref());
    let expected = arange(&[3, 4, 5])
        .index_axis(Axis(0), 1)
        .to_owned()
        .permuted_axes(vec![1, 0])
        .into_dyn();
    let got: ArrayD<f64> = s.read(&ReadOptions::new()).unwrap();
    assert_eq!(got, expected);
}

#[test]
fn permute_then_slice_addresses_original_axes() {
    let v = volume(&[2, 3, 4]);
    let s = v
        .permute(&[2, 0, 1])
        .unwrap()
        .slice(&[IdxElem::range(1, 3), 0.into(), IdxElem::full()])
        .unwrap();
    let expected = arange(&[2, 3, 4])
        .permuted_axes(vec![2, 0, 1])
        .into_dimensionality::<Ix3>()
        .unwrap()
        .slice(s![1..3, 0, ..])
        .to_owned()
        .into_dyn();
    assert_eq!(s.shape(), expected.shape());
    let got: ArrayD<f64> = s.read(&ReadOptions::new()).unwrap();
    assert_eq!(got, expected);
}

#[test]
fn squeeze_and_unsqueeze() {
    let v = volume(&[1, 5, 1, 3]);
    let all = v.squeeze(None).unwrap();
    assert_eq!(all.shape(), [5, 3].as_ref());
    let one = v.squeeze(Some(&[0])).unwrap();
    assert_eq!(one.shape(), [5, 1, 3].as_ref());
    assert!(matches!(
        v.squeeze(Some(&[1])),
        Err(VolMapError::CannotSqueeze(1, 5))
    ));

    let up = all.unsqueeze(1).unwrap();
    assert_eq!(up.shape(), [5, 1, 3].as_ref());
    let tail = all.unsqueeze(2).unwrap();
    assert_eq!(tail.shape(), [5, 3, 1].as_ref());
    assert!(matches!(
        all.unsqueeze(3),
        Err(VolMapError::AxisOutOfBounds(3, ..))
    ));
}

#[test]
fn unbind_chunk_and_split() {
    let v = volume(&[6, 4]);

    let rows = v.unbind(0, false).unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[2].shape(), [4].as_ref());
    let got: ArrayD<f64> = rows[2].read(&ReadOptions::new()).unwrap();
    let expected = arange(&[6, 4]).index_axis(Axis(0), 2).to_owned().into_dyn();
    assert_eq!(got, expected);

    let kept = v.unbind(0, true).unwrap();
    assert_eq!(kept[0].shape(), [1, 4].as_ref());

    let chunks = v.chunk(4, 0).unwrap();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.shape() == [2, 4].as_ref()));
    assert!(matches!(v.chunk(0, 0), Err(VolMapError::BadSplitSizes(..))));

    let parts = v.split(&[1, 2, 3], 0).unwrap();
    assert_eq!(parts[0].shape(), [1, 4].as_ref());
    assert_eq!(parts[1].shape(), [2, 4].as_ref());
    assert_eq!(parts[2].shape(), [3, 4].as_ref());
    assert!(matches!(
        v.split(&[1, 2], 0),
        Err(VolMapError::BadSplitSizes(..))
    ));
}

#[test]
fn scaled_reads_apply_slope_and_intercept() {
    let source = InMemSource::new(arange(&[2, 3])).with_scaling(DataType::Int16, 2.0, 1.0);
    let v = MappedArray::new(source);
    assert_eq!(v.data_type(), DataType::Int16);

    let raw: ArrayD<i16> = v.read(&ReadOptions::new()).unwrap();
    assert_eq!(raw.into_dimensionality::<Ix2>().unwrap().into_raw_vec(), vec![0, 1, 2, 3, 4, 5]);

    let scaled: ArrayD<f64> = v.read_scaled(&ReadOptions::new()).unwrap();
    let expected = arange(&[2, 3]).mapv(|x| x * 2.0 + 1.0);
    assert_eq!(scaled, expected);

    assert!(matches!(
        v.read_scaled::<i32>(&ReadOptions::new()),
        Err(VolMapError::NotFloatingPoint(DataType::Int32))
    ));
}

#[test]
fn scaled_writes_invert_the_scaling() {
    let source = InMemSource::new(arange(&[2, 2])).with_scaling(DataType::Int16, 2.0, 1.0);
    let v = MappedArray::new(source);

    let physical = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.0, 3.0, 5.0, 7.0]).unwrap();
    v.write_scaled(physical.view()).unwrap();
    let stored = v.source().raw_data();
    let expected = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
    assert_eq!(stored, expected);
}

#[test]
fn writes_route_through_the_view() {
    let v = volume(&[4, 5]);
    let s = v
        .slice(&[IdxElem::stepped(Some(1), None, 2), IdxElem::range(1, 4)])
        .unwrap();
    assert_eq!(s.shape(), [2, 3].as_ref());

    let zeros = ArrayD::<f64>::zeros(IxDyn(&[2, 3]));
    s.write(zeros.view(), Casting::Unsafe).unwrap();

    let mut expected = arange(&[4, 5]).into_dimensionality::<Ix2>().unwrap();
    expected.slice_mut(s![1..;2, 1..4]).fill(0.0);
    assert_eq!(v.source().raw_data(), expected.into_dyn());

    // a buffer of the wrong shape is rejected before touching the store
    let bad = ArrayD::<f64>::zeros(IxDyn(&[3, 2]));
    assert!(matches!(
        s.write(bad.view(), Casting::Unsafe),
        Err(VolMapError::ShapeMismatch(..))
    ));
}

#[test]
fn writes_through_a_permuted_view() {
    let v = volume(&[2, 3]);
    let p = v.permute(&[1, 0]).unwrap();
    let data =
        ArrayD::from_shape_vec(IxDyn(&[3, 2]), vec![10.0, 13.0, 11.0, 14.0, 12.0, 15.0]).unwrap();
    p.write(data.view(), Casting::Unsafe).unwrap();
    let expected =
        ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]).unwrap();
    assert_eq!(v.source().raw_data(), expected);
}

#[test]
fn casting_policies_are_enforced() {
    let v = volume(&[2, 2]);
    assert!(matches!(
        v.read::<u8>(&ReadOptions::new().casting(Casting::Safe)),
        Err(VolMapError::BadCast(DataType::Float64, DataType::Uint8, Casting::Safe))
    ));
    let data = ArrayD::<f32>::zeros(IxDyn(&[2, 2]));
    assert!(matches!(
        v.write(data.view(), Casting::No),
        Err(VolMapError::BadCast(..))
    ));
    // an unsafe cast truncates without complaint
    let got: ArrayD<u8> = v
        .read(&ReadOptions::new().casting(Casting::Unsafe))
        .unwrap();
    assert_eq!(got[[1, 1]], 3);
}

#[test]
fn dithering_only_applies_to_integer_sources() {
    let source = InMemSource::new(arange(&[2, 2])).with_scaling(DataType::Uint8, 1.0, 0.0);
    let v = MappedArray::new(source);
    let noisy: ArrayD<f64> = v
        .read(&ReadOptions::new().add_noise(true))
        .unwrap();
    for (got, base) in noisy.iter().zip(arange(&[2, 2]).iter()) {
        assert!(*got >= *base && *got < *base + 1.0);
    }
    // float storage is returned untouched
    let v = volume(&[2, 2]);
    let clean: ArrayD<f64> = v.read(&ReadOptions::new().add_noise(true)).unwrap();
    assert_eq!(clean, arange(&[2, 2]));
}

#[test]
fn cutoff_clamps_the_dynamic_range() {
    let v = volume(&[11]);
    let got: ArrayD<f64> = v
        .read(&ReadOptions::new().cutoff(0.1, 0.9))
        .unwrap();
    assert_eq!(got[[0]], 1.0);
    assert_eq!(got[[10]], 9.0);
    assert_eq!(got[[5]], 5.0);
}

#[test]
fn bad_indices_are_rejected() {
    let v = volume(&[4, 5]);
    assert!(matches!(
        v.slice(&[0.into(), 0.into(), 0.into()]),
        Err(VolMapError::TooManyIndices(3, 2))
    ));
    assert!(matches!(
        v.slice(&[10.into()]),
        Err(VolMapError::IndexOutOfBounds(10, 0, 4))
    ));
    assert!(matches!(
        v.slice(&[IdxElem::stepped(None, None, 0)]),
        Err(VolMapError::ZeroStep)
    ));
    assert!(matches!(
        v.slice(&[IdxElem::Ellipsis, IdxElem::Ellipsis]),
        Err(VolMapError::MultipleEllipses)
    ));
}

#[test]
fn empty_slices_read_and_write() {
    let v = volume(&[4, 5]);
    let s = v.slice(&[IdxElem::range(2, 2), IdxElem::full()]).unwrap();
    assert_eq!(s.shape(), [0, 5].as_ref());
    let got: ArrayD<f64> = s.read(&ReadOptions::new()).unwrap();
    assert_eq!(got.len(), 0);
    let nothing = ArrayD::<f64>::zeros(IxDyn(&[0, 5]));
    s.write(nothing.view(), Casting::Unsafe).unwrap();
    assert_eq!(v.source().raw_data(), arange(&[4, 5]));
}

#[test]
fn metadata_roundtrip() {
    let v = volume(&[2, 2]);
    let mut meta = volmap::Metadata::new();
    let _ = meta.insert("subject".into(), MetaValue::Str("s01".into()));
    let _ = meta.insert("echo_time".into(), MetaValue::Float(0.03));
    v.set_metadata(&meta).unwrap();

    let all = v.metadata(None).unwrap();
    assert_eq!(all.len(), 2);
    let some = v.metadata(Some(&["subject"])).unwrap();
    assert_eq!(some.len(), 1);
    assert_eq!(some.get("subject"), Some(&MetaValue::Str("s01".into())));
}
