use dtk_core::image::ImageGeometry;
use dtk_core::spatial::{Matrix3, Point3, Spacing3, Vector3};
use dtk_core::tensor::{SpdCodec, SpdTensor};
use nalgebra::Rotation3;
use proptest::prelude::*;

fn make_tensor(angles: (f64, f64, f64), eigenvalues: (f64, f64, f64)) -> SpdTensor {
    let rotation = Rotation3::from_euler_angles(angles.0, angles.1, angles.2).into_inner();
    let diagonal = Matrix3::from_diagonal(&Vector3::new(eigenvalues.0, eigenvalues.1, eigenvalues.2));
    SpdTensor::from_matrix(&(rotation * diagonal * rotation.transpose()))
}

proptest! {
    #[test]
    fn test_log_exp_roundtrip(
        ax in -3.14f64..3.14, ay in -1.5f64..1.5, az in -3.14f64..3.14,
        l1 in 0.01f64..10.0, l2 in 0.01f64..10.0, l3 in 0.01f64..10.0
    ) {
        let tensor = make_tensor((ax, ay, az), (l1, l2, l3));
        let codec = SpdCodec::default();

        let outcome = codec.log(&tensor).unwrap();
        prop_assert!(!outcome.clamped);
        let restored = codec.exp(&outcome.tensor);

        let error = (restored.to_matrix() - tensor.to_matrix()).norm() / tensor.to_matrix().norm();
        prop_assert!(error < 1e-9, "relative error {}", error);
    }

    #[test]
    fn test_exp_is_always_spd(
        c in proptest::array::uniform6(-3.0f64..3.0)
    ) {
        let codec = SpdCodec::default();
        let tensor = codec.exp(&dtk_core::tensor::LogTensor(c));
        prop_assert!(tensor.eigenvalues()[2] > 0.0);
    }

    #[test]
    fn test_geometry_roundtrip(
        ox in -100.0f64..100.0, oy in -100.0f64..100.0, oz in -100.0f64..100.0,
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
        ax in -3.14f64..3.14, ay in -1.5f64..1.5, az in -3.14f64..3.14,
        px in -50.0f64..50.0, py in -50.0f64..50.0, pz in -50.0f64..50.0
    ) {
        let direction = Rotation3::from_euler_angles(ax, ay, az).into_inner();
        let geometry = ImageGeometry::new(
            [8, 8, 8],
            Point3::new(ox, oy, oz),
            Spacing3::new(sx, sy, sz),
            direction,
        ).unwrap();

        let point = Point3::new(px, py, pz);
        let back = geometry.index_to_physical(&geometry.physical_to_index(&point));
        prop_assert!((back - point).norm() < 1e-9);
    }
}
