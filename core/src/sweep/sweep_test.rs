#[cfg(test)]
mod tests {
    use crate::sweep::*;
    use anyhow::Result;
    use fitsbench_fits::{Compression, Dtype, FitsFile};
    use std::path::Path;

    fn small_config(scratch: &Path, edges: Vec<usize>) -> SweepConfig {
        SweepConfig {
            shape: [1024, 1024],
            dtype: Dtype::I16,
            tiles: TileSpacing::Custom(edges),
            source: DataSource::Random,
            compression: Compression::Rice1,
            repeat: 1,
            seed: 3,
            scratch_dir: scratch.to_path_buf(),
        }
    }

    #[test]
    fn arithmetic_spacing_follows_range() -> Result<()> {
        let down = TileSpacing::Arithmetic {
            start: 4096,
            stop: 1,
            step: -100,
        };
        let edges = down.edges()?;
        assert_eq!(edges.len(), 41);
        assert_eq!(edges[0], 4096);
        assert_eq!(edges[1], 3996);
        assert_eq!(*edges.last().unwrap(), 96);

        let up = TileSpacing::Arithmetic {
            start: 64,
            stop: 257,
            step: 64,
        };
        assert_eq!(up.edges()?, vec![64, 128, 192, 256]);

        let zero = TileSpacing::Arithmetic { start: 1, stop: 9, step: 0 };
        assert!(zero.edges().is_err());
        let empty = TileSpacing::Arithmetic { start: 1, stop: 9, step: -1 };
        assert!(empty.edges().is_err());
        let negative = TileSpacing::Arithmetic { start: 2, stop: -3, step: -1 };
        assert!(negative.edges().is_err());
        assert!(TileSpacing::Custom(vec![8, 0]).edges().is_err());

        let near_max = TileSpacing::Arithmetic {
            start: i64::MAX - 1,
            stop: i64::MAX,
            step: i64::MAX,
        };
        assert_eq!(near_max.edges()?, vec![(i64::MAX - 1) as usize]);
        let huge = TileSpacing::Arithmetic {
            start: 1,
            stop: i64::MAX,
            step: 1,
        };
        let err = huge.edges().unwrap_err();
        assert!(err.to_string().contains("more than"), "{}", err);
        assert!(TileSpacing::Custom(vec![1; MAX_TILE_SIZES + 1]).edges().is_err());
        Ok(())
    }

    #[test]
    fn tiles_are_square_and_clipped() -> Result<()> {
        let config = SweepConfig {
            shape: [300, 200],
            ..small_config(Path::new("/tmp"), vec![512, 250, 100])
        };
        assert_eq!(config.tile_sizes()?, vec![[300, 200], [250, 200], [100, 100]]);
        Ok(())
    }

    #[test]
    fn rice_needs_integer_data() {
        let config = SweepConfig {
            dtype: Dtype::F32,
            ..small_config(Path::new("/scratch"), vec![64])
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("RICE_1 needs integer data"), "{}", err);
        let gzip = SweepConfig {
            compression: Compression::Gzip1,
            ..config
        };
        assert!(gzip.validate().is_ok());
    }

    #[test]
    fn names_encode_the_parameters() {
        let config = small_config(Path::new("/scratch"), vec![64, 128, 256]);
        assert_eq!(
            config.file_name([64, 64]),
            "tile_test_1024x1024_int16_rice_1_random-s3_64x64.fits"
        );
        let cache = config.cache_path();
        let name = cache.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with("tile_sweep_1024x1024_int16_rice_1_custom"), "{}", name);
        assert!(name.ends_with("_random-s3_r1.parquet"), "{}", name);
        assert_eq!(config.report_path().extension().and_then(|e| e.to_str()), Some("html"));

        let preset = SweepConfig::preset("tile-size-graph", "/scratch".into()).expect("preset");
        assert_eq!(
            preset.cache_path(),
            Path::new("/scratch").join("tile_sweep_4096x4096_float64_gzip_1_range4096_1_-100_random-s0_r10.parquet")
        );
        assert!(SweepConfig::preset("nope", "/scratch".into()).is_err());
    }

    #[test]
    fn distinct_configurations_never_share_a_cache() {
        let scratch = Path::new("/scratch");
        let base = small_config(scratch, vec![64, 128, 256]);
        let configs = [
            base.clone(),
            small_config(scratch, vec![64, 128]),
            small_config(scratch, vec![256, 128, 64]),
            SweepConfig {
                tiles: TileSpacing::Arithmetic {
                    start: 64,
                    stop: 257,
                    step: 64,
                },
                ..base.clone()
            },
            SweepConfig {
                tiles: TileSpacing::Arithmetic {
                    start: 64,
                    stop: 257,
                    step: 128,
                },
                ..base.clone()
            },
            SweepConfig {
                shape: [1024, 512],
                ..base.clone()
            },
            SweepConfig {
                dtype: Dtype::I32,
                ..base.clone()
            },
            SweepConfig {
                compression: Compression::Gzip1,
                ..base.clone()
            },
            SweepConfig {
                seed: 4,
                ..base.clone()
            },
            SweepConfig { repeat: 2, ..base.clone() },
            SweepConfig {
                source: DataSource::Fits("/a/img.fits".into()),
                ..base.clone()
            },
            SweepConfig {
                source: DataSource::Fits("/b/img.fits".into()),
                ..base.clone()
            },
        ];
        let paths: Vec<_> = configs.iter().map(SweepConfig::cache_path).collect();
        for (i, a) in paths.iter().enumerate() {
            for b in &paths[i + 1..] {
                assert_ne!(a, b);
            }
        }

        // Everything except the spacing and repeat count also names the files.
        let files: Vec<_> = [&configs[0], &configs[5], &configs[6], &configs[7], &configs[8], &configs[10], &configs[11]]
            .iter()
            .map(|c| c.file_name([64, 64]))
            .collect();
        for (i, a) in files.iter().enumerate() {
            for b in &files[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(configs[0].file_name([64, 64]), configs[9].file_name([64, 64]));
    }

    #[test]
    fn seed_does_not_key_image_sources() {
        let image = SweepConfig {
            source: DataSource::Fits("/a/img.fits".into()),
            ..small_config(Path::new("/scratch"), vec![64])
        };
        let reseeded = SweepConfig { seed: 99, ..image.clone() };
        assert_eq!(image.cache_path(), reseeded.cache_path());
        assert!(image.source.label().starts_with("fits-img-"));
    }

    #[test]
    fn changing_only_compression_times_new_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let gzip = SweepConfig {
            shape: [256, 256],
            dtype: Dtype::I32,
            compression: Compression::Gzip1,
            ..small_config(dir.path(), vec![64, 128])
        };
        let rice = SweepConfig {
            compression: Compression::Rice1,
            ..gzip.clone()
        };

        let first = run(&gzip)?;
        let second = run(&rice)?;
        assert_ne!(first.cache_path, second.cache_path);
        assert!(!second.from_cache);
        assert_eq!(second.generated, 2);
        for tile in rice.tile_sizes()? {
            assert_ne!(gzip.file_name(tile), rice.file_name(tile));
            let hdu = FitsFile::open(dir.path().join(rice.file_name(tile)))?.first_image()?;
            assert_eq!(hdu.header().get_str("ZCMPTYPE"), Some("RICE_1"));
        }
        Ok(())
    }

    #[test]
    fn sweep_produces_one_row_per_tile_size_and_reuses_its_work() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = small_config(dir.path(), vec![64, 128, 256]);

        let first = run(&config)?;
        assert!(!first.from_cache);
        assert_eq!(first.generated, 3);
        assert_eq!(first.rows.len(), 3);
        let indices: Vec<u64> = first.rows.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![2, 1, 0]);
        for (row, edge) in first.rows.iter().zip([64u64, 128, 256]) {
            assert_eq!((row.tile_rows, row.tile_cols), (edge, edge));
            assert!(row.file_size > 0);
            assert!(row.whole_array_s > 0.0);
            assert!(row.single_tile_s > 0.0);
        }
        assert!(first.cache_path.is_file());

        let second = run(&config)?;
        assert!(second.from_cache);
        assert_eq!(second.generated, 0);
        assert_eq!(second.rows, first.rows);

        // Without the cache the files are timed again but not rewritten.
        let modified = std::fs::metadata(dir.path().join(config.file_name([64, 64])))?.modified()?;
        std::fs::remove_file(&first.cache_path)?;
        let third = run(&config)?;
        assert!(!third.from_cache);
        assert_eq!(third.generated, 0);
        assert_eq!(
            std::fs::metadata(dir.path().join(config.file_name([64, 64])))?.modified()?,
            modified
        );
        let sizes = |rows: &[SweepRow]| rows.iter().map(|r| (r.index, r.tile_rows, r.file_size)).collect::<Vec<_>>();
        assert_eq!(sizes(&third.rows), sizes(&first.rows));
        Ok(())
    }

    #[test]
    fn cache_round_trips_through_parquet() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("table.parquet");
        let rows = vec![
            SweepRow {
                index: 1,
                tile_rows: 32,
                tile_cols: 32,
                whole_array_s: 0.25,
                single_tile_s: 1.5e-4,
                file_size: 8640,
            },
            SweepRow {
                index: 0,
                tile_rows: 64,
                tile_cols: 48,
                whole_array_s: 0.125,
                single_tile_s: 3.0e-4,
                file_size: 5760,
            },
        ];
        cache::write(&path, &rows)?;
        assert_eq!(cache::read(&path)?, rows);
        Ok(())
    }

    #[test]
    fn report_embeds_the_table() -> Result<()> {
        let config = small_config(Path::new("/scratch"), vec![64]);
        let rows = vec![SweepRow {
            index: 0,
            tile_rows: 64,
            tile_cols: 64,
            whole_array_s: 0.5,
            single_tile_s: 0.001,
            file_size: 2880,
        }];
        let html = report::render(&config, &rows)?;
        assert!(!html.contains("__DATA_PLACEHOLDER__"));
        assert!(html.contains("\"whole_array_s\":0.5"));
        assert!(html.contains("Tile size sweep: 1024x1024 int16 (RICE_1)"));
        Ok(())
    }
}
