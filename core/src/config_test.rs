#[cfg(test)]
mod tests {
    use crate::config::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(vars: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_data_dir() -> Result<()> {
        let env = BenchEnv::resolve(lookup(&[]))?;
        assert_eq!(env.data_dir, PathBuf::from("data"));
        assert_eq!(env.dataset_dir, PathBuf::from("data").join("dataset"));
        assert!(env.scratch_dir.ends_with("fitsbench"));
        assert_eq!(
            env.aia_path(),
            PathBuf::from("data").join("aia_lev1_193a_2013_03_15t12_01_06_84z_image_lev1.fits")
        );
        Ok(())
    }

    #[test]
    fn config_file_then_env_overrides() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = dir.path().join("bench.toml");
        std::fs::write(
            &config,
            "data_dir = \"/srv/fits\"\nscratch_dir = \"/scratch/from-file\"\naia_file = \"small.fits\"\n",
        )?;
        let env = BenchEnv::resolve(lookup(&[
            (CONFIG_ENV, config.display().to_string()),
            (SCRATCH_DIR_ENV, "/scratch/from-env".to_string()),
            (DATASET_DIR_ENV, "  ".to_string()),
        ]))?;
        assert_eq!(env.data_dir, PathBuf::from("/srv/fits"));
        assert_eq!(env.scratch_dir, PathBuf::from("/scratch/from-env"));
        // Blank values are ignored.
        assert_eq!(env.dataset_dir, PathBuf::from("data").join("dataset"));
        assert_eq!(env.aia_path(), PathBuf::from("/srv/fits/small.fits"));
        Ok(())
    }

    #[test]
    fn unknown_config_keys_are_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = dir.path().join("bench.toml");
        std::fs::write(&config, "data_directory = \"typo\"\n")?;
        let err = BenchEnv::resolve(lookup(&[(CONFIG_ENV, config.display().to_string())])).unwrap_err();
        assert!(format!("{:#}", err).contains("parse config"));
        Ok(())
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = BenchEnv::resolve(lookup(&[(CONFIG_ENV, "/no/such/fitsbench.toml".to_string())])).unwrap_err();
        assert!(err.to_string().contains("/no/such/fitsbench.toml"));
    }

    #[test]
    fn scratch_dir_is_created() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let env = BenchEnv {
            scratch_dir: dir.path().join("a").join("b"),
            ..BenchEnv::default()
        };
        assert!(env.ensure_scratch_dir()?.is_dir());
        Ok(())
    }
}
