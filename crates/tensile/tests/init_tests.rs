// Integration tests for parameter initialisation
//
// Fillers, InitConfig resolution and the named parameter store, used the way
// a layer would use them: fill a weight and a bias, store them, read them back.

use tensile::nn::{
    ConstantFiller, Distribution, GaussianFiller, ScaleMode, UniformFiller, VarScaleFiller,
};
use tensile::prelude::*;
use tensile::Error;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mean_and_var(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var)
}

#[test]
fn test_seeded_config_is_reproducible() -> tensile::Result<()> {
    init_logger();
    let fill = |seed: u64| -> tensile::Result<Vec<f64>> {
        let cfg = InitConfig::default().with_random_source(RandomSource::Seeded(seed));
        let mut init: ParamInitializer<f64> = ParamInitializer::new(cfg);
        let mut w: Matrix<f64> = Matrix::new(8, 8)?;
        init.fill_weight(&mut w, 8, 8)?;
        Ok(w.to_vec())
    };
    assert_eq!(fill(42)?, fill(42)?);
    assert_ne!(fill(42)?, fill(43)?);
    Ok(())
}

#[test]
fn test_layer_round_trip() -> tensile::Result<()> {
    init_logger();
    let cfg = InitConfig::default()
        .with_weight(UniformFiller::new(-0.1, 0.1)?)
        .with_bias(ConstantFiller::new(0.01))
        .with_random_source(RandomSource::Seeded(1));
    let mut init: ParamInitializer<f32> = ParamInitializer::new(cfg);

    let mut w: Matrix<f32> = Matrix::new(3, 4)?;
    let mut b: Matrix<f32> = Matrix::new(1, 4)?;
    init.fill_weight(&mut w, 3, 4)?;
    init.fill_bias(&mut b, 3, 4)?;
    assert!(w.to_vec().iter().all(|v| v.abs() <= 0.1));
    assert_eq!(b.to_vec(), vec![0.01; 4]);

    init.set_matrix("dense/weight", &w)?;
    init.set_matrix("dense/bias", &b)?;
    assert_eq!(init.len(), 2);
    assert!(init.contains("dense/bias"));

    let mut restored: Matrix<f32> = Matrix::new(3, 4)?;
    init.get_matrix("dense/weight", &mut restored)?;
    assert_eq!(restored, w);
    assert_ne!(restored.buffer(), w.buffer());
    Ok(())
}

#[test]
fn test_restored_parameter_feeds_a_graph() -> tensile::Result<()> {
    let mut init: ParamInitializer<f64> = ParamInitializer::default();
    let w: Matrix<f64> = Matrix::from_vec(2, 1, vec![2.0, 3.0])?;
    init.set_matrix("w", &w)?;

    let mut weight: Matrix<f64> = Matrix::new(2, 1)?;
    init.get_matrix("w", &mut weight)?;
    let x: Matrix<f64> = Matrix::from_vec(1, 2, vec![1.0, 1.0])?;
    let y = ops::dot(x, weight)?.eval()?;
    assert_eq!(y.to_vec(), vec![5.0]);
    Ok(())
}

#[test]
fn test_store_errors() -> tensile::Result<()> {
    let mut init: ParamInitializer<f64> = ParamInitializer::default();
    let m: Matrix<f64> = Matrix::new(2, 2)?;
    init.set_matrix("m", &m)?;
    assert!(matches!(init.set_matrix("m", &m), Err(Error::DuplicateParam(_))));
    let mut out: Matrix<f64> = Matrix::new(2, 2)?;
    assert!(matches!(
        init.get_matrix("missing", &mut out),
        Err(Error::ParamNotFound(_))
    ));
    Ok(())
}

#[test]
fn test_fill_sub_matrix_only() -> tensile::Result<()> {
    let mut m: Matrix<f64> = Matrix::new(3, 3)?;
    {
        let mut corner = m.sub_matrix(1..3, 1..3)?;
        // the parent still holds the buffer
        assert!(matches!(
            ConstantFiller::new(1.0).fill(&mut corner, 2, 2),
            Err(Error::SharedWrite { .. })
        ));
    }
    ConstantFiller::new(1.0).fill(&mut m, 3, 3)?;
    assert_eq!(m.to_vec(), vec![1.0; 9]);
    Ok(())
}

#[test]
fn test_gaussian_statistics() -> tensile::Result<()> {
    let mut filler = GaussianFiller::new(2.0, 0.5)?.with_source(RandomSource::Seeded(9));
    let mut m: Matrix<f64> = Matrix::new(100, 100)?;
    filler.fill(&mut m, 100, 100)?;
    let (mean, var) = mean_and_var(&m.to_vec());
    assert!((mean - 2.0).abs() < 0.05, "mean {}", mean);
    assert!((var - 0.25).abs() < 0.02, "var {}", var);
    Ok(())
}

#[test]
fn test_var_scale_normal_variance() -> tensile::Result<()> {
    let mut filler = VarScaleFiller::new(2.0)?
        .with_mode(ScaleMode::FanIn)
        .with_distribution(Distribution::Normal)
        .with_source(RandomSource::Seeded(17));
    let mut m: Matrix<f64> = Matrix::new(100, 100)?;
    filler.fill(&mut m, 50, 200)?;
    let (mean, var) = mean_and_var(&m.to_vec());
    assert!(mean.abs() < 0.01, "mean {}", mean);
    assert!((var - 2.0 / 50.0).abs() < 0.004, "var {}", var);
    Ok(())
}

#[test]
fn test_invalid_filler_arguments() {
    assert!(matches!(
        UniformFiller::new(1.0, 1.0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        GaussianFiller::new(0.0, -1.0),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        VarScaleFiller::new(0.0),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_half_precision_fill() -> tensile::Result<()> {
    use half::bf16;
    let mut m: Matrix<bf16> = Matrix::new(2, 2)?;
    ConstantFiller::new(0.5).fill(&mut m, 2, 2)?;
    assert!(m.to_vec().iter().all(|v| v.to_f32() == 0.5));
    Ok(())
}
