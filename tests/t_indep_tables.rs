use ndarray::{s, Array, Array4, Array5, Axis};
use ndarray_npy::{read_npy, write_npy};
use proptest::prelude::*;
use rstest::rstest;

use retro::Error;
use retro::tables::{generate_time_indep_tables, sum_over_time, TableKind,
                    CKV_TABLE, CLSIM_TABLE, T_INDEP_CKV_TABLE, T_INDEP_CLSIM_TABLE};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn table(shape: (usize, usize, usize, usize, usize), offset: f32) -> Array5<f32> {
    let n = shape.0 * shape.1 * shape.2 * shape.3 * shape.4;
    Array::from_shape_vec(shape, (0..n).map(|i| offset + (i % 11) as f32).collect()).unwrap()
}

#[test]
fn both_kinds_from_directory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let clsim = table((4, 4, 5, 3, 3), 0.0);
    let ckv   = table((2, 3, 4, 2, 2), 0.5);
    write_npy(dir.path().join(CLSIM_TABLE), &clsim)?;
    write_npy(dir.path().join(CKV_TABLE  ), &ckv  )?;

    let written = generate_time_indep_tables(dir.path(), &[TableKind::Ckv, TableKind::Clsim], None, false)?;
    // CLSim is always processed first
    assert_eq!(written, vec![dir.path().join(T_INDEP_CLSIM_TABLE), dir.path().join(T_INDEP_CKV_TABLE)]);

    let t_indep: Array4<f32> = read_npy(&written[0])?;
    assert_eq!(t_indep.dim(), (2, 2, 1, 1));
    assert_eq!(t_indep, clsim.slice(s![1..-1, 1..-1, 1..-1, 1..-1, 1..-1]).sum_axis(Axis(2)));

    let t_indep_ckv: Array4<f32> = read_npy(&written[1])?;
    assert_eq!(t_indep_ckv, ckv.sum_axis(Axis(2)));
    Ok(())
}

#[rstest(/**/ overwrite, expect_rewrite,
         case(false    , false         ),
         case(true     , true          ),
)]
fn existing_outputs(overwrite: bool, expect_rewrite: bool) -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join(CKV_TABLE);
    write_npy(&input, &table((2, 2, 3, 2, 2), 1.0))?;
    let outdir = dir.path().join("out");
    std::fs::create_dir_all(&outdir)?;
    let placeholder = Array4::<f32>::zeros((1, 1, 1, 1));
    write_npy(outdir.join(T_INDEP_CKV_TABLE), &placeholder)?;

    let written = generate_time_indep_tables(&input, &[TableKind::Ckv], Some(&outdir), overwrite)?;
    assert_eq!(!written.is_empty(), expect_rewrite);
    let on_disk: Array4<f32> = read_npy(outdir.join(T_INDEP_CKV_TABLE))?;
    assert_eq!(on_disk != placeholder, expect_rewrite);
    Ok(())
}

#[test]
fn requested_kind_without_table() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_npy(dir.path().join(CKV_TABLE), &table((2, 2, 2, 2, 2), 0.0))?;
    let result = generate_time_indep_tables(dir.path(), &[TableKind::Clsim], None, false);
    assert!(matches!(result, Err(Error::MissingTable { kind: TableKind::Clsim, .. })));
    Ok(())
}

proptest! {
    #[test]
    fn summing_preserves_total(
        nr in 1..4_usize, nct in 1..4_usize, nt in 1..6_usize, ncd in 1..3_usize, ndp in 1..3_usize,
    ) {
        let t = table((nr, nct, nt, ncd, ndp), 0.25);
        let summed = sum_over_time(t.view(), false).unwrap();
        prop_assert_eq!(summed.dim(), (nr, nct, ncd, ndp));
        // Small integers (plus quarters) are summed exactly in f32
        prop_assert_eq!(summed.sum(), t.sum());
    }
}
