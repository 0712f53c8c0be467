//! The built-in benchmarks.

use crate::config::BenchEnv;
use crate::dataset::Dataset;
use crate::fixture::{Fixture, Output};
use crate::registry::{BenchmarkEntry, Registry};
use crate::synth;
use anyhow::{Result, anyhow};
use fitsbench_fits::{Array, FitsFile, ImageHdu, tile_shape};
use std::ops::Range;
use std::time::Duration;
use tracing::info;

const FAST_INTERVAL: Duration = Duration::from_micros(10);
const READ_INTERVAL: Duration = Duration::from_micros(100);

/// The AIA image lives in extension 1 behind an empty primary HDU.
const AIA_HDU: usize = 1;

pub fn builtin_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(
            BenchmarkEntry::new("open_file_aia", "Open the AIA file and its image HDU", open_file_aia)
                .with_interval(FAST_INTERVAL),
        )
        .register(
            BenchmarkEntry::new("open_close_file_aia", "Open and close the AIA file", open_close_file_aia)
                .with_interval(FAST_INTERVAL),
        )
        .register(
            BenchmarkEntry::new("access_single_tile_aia", "Read the first AIA row", access_single_tile)
                .with_setup(open_aia_fixture)
                .with_interval(READ_INTERVAL),
        )
        .register(
            BenchmarkEntry::new("access_data_aia", "Read the whole AIA image", access_data)
                .with_setup(open_aia_fixture)
                .with_interval(READ_INTERVAL),
        )
        .register(
            BenchmarkEntry::new("access_section_aia", "Read a 10x10 AIA section", access_section_aia)
                .with_setup(open_aia_fixture)
                .with_interval(READ_INTERVAL),
        )
        .register(BenchmarkEntry::new(
            "read_tile_shape_aia",
            "Tile shape from the raw compressed header",
            read_tile_shape_aia,
        ))
        .register(
            BenchmarkEntry::new("dkist_access_single_frame", "Read one row of the first frame", dkist_single_frame)
                .with_setup(load_dataset),
        )
        .register(
            BenchmarkEntry::new("dkist_access_single_chunk", "Read the first dataset chunk", dkist_single_chunk)
                .with_setup(load_dataset),
        )
        .register(
            BenchmarkEntry::new("generated_access_data", "Read a generated RICE_1 image", access_data)
                .with_setup(generate_file)
                .with_teardown(remove_generated)
                .with_interval(READ_INTERVAL),
        )
        .register(
            BenchmarkEntry::new(
                "generated_access_single_tile",
                "Read one tile of a generated RICE_1 image",
                access_first_tile,
            )
            .with_setup(generate_file)
            .with_teardown(remove_generated)
            .with_interval(READ_INTERVAL),
        );
    registry
}

fn open_aia(env: &BenchEnv) -> Result<ImageHdu> {
    FitsFile::open(env.aia_path())?.image(AIA_HDU)
}

fn open_aia_fixture(env: &BenchEnv) -> Result<Fixture> {
    Ok(Fixture::Hdu(open_aia(env)?))
}

fn open_file_aia(env: &BenchEnv, _fixture: &mut Fixture) -> Result<Output> {
    Ok(Output::Hdu(open_aia(env)?))
}

fn open_close_file_aia(env: &BenchEnv, _fixture: &mut Fixture) -> Result<Output> {
    let file = FitsFile::open(env.aia_path())?;
    drop(file);
    Ok(Output::Unit)
}

/// `section[0, ...]`: the first index of the slowest axis, axis dropped.
fn first_row(hdu: &mut ImageHdu) -> Result<Array> {
    let shape = hdu.shape().to_vec();
    let ranges: Vec<Range<usize>> = shape
        .iter()
        .enumerate()
        .map(|(axis, &len)| if axis == 0 { 0..1 } else { 0..len })
        .collect();
    let row = hdu.section(&ranges)?;
    Array::new(shape[1..].to_vec(), row.into_data())
}

fn access_single_tile(_env: &BenchEnv, fixture: &mut Fixture) -> Result<Output> {
    Ok(Output::Array(first_row(fixture.hdu_mut()?)?))
}

fn access_data(_env: &BenchEnv, fixture: &mut Fixture) -> Result<Output> {
    Ok(Output::Array(fixture.hdu_mut()?.data()?))
}

fn access_section_aia(_env: &BenchEnv, fixture: &mut Fixture) -> Result<Output> {
    Ok(Output::Array(fixture.hdu_mut()?.section(&[10..20, 10..20])?))
}

fn read_tile_shape_aia(env: &BenchEnv, _fixture: &mut Fixture) -> Result<Output> {
    let file = FitsFile::open_raw(env.aia_path())?;
    Ok(Output::Shape(tile_shape(&file.hdu(AIA_HDU)?.header)?))
}

fn load_dataset(env: &BenchEnv) -> Result<Fixture> {
    let data = Dataset::from_directory(&env.dataset_dir)?.data();
    info!("{}", data);
    Ok(Fixture::Dataset(data))
}

fn dkist_single_frame(_env: &BenchEnv, fixture: &mut Fixture) -> Result<Output> {
    Ok(Output::Array(fixture.dataset()?.index(&[0, 0])?.compute()?))
}

fn dkist_single_chunk(_env: &BenchEnv, fixture: &mut Fixture) -> Result<Output> {
    let chunk = fixture.dataset()?.index(&[0])?.compute()?;
    info!(shape = ?chunk.shape(), "read dataset chunk");
    Ok(Output::Array(chunk))
}

fn generate_file(env: &BenchEnv) -> Result<Fixture> {
    Ok(Fixture::Generated(synth::generated_fixture(env)?))
}

fn access_first_tile(_env: &BenchEnv, fixture: &mut Fixture) -> Result<Output> {
    let hdu = fixture.hdu_mut()?;
    let ranges: Vec<Range<usize>> = hdu.tile_shape().iter().map(|&t| 0..t).collect();
    Ok(Output::Array(hdu.section(&ranges)?))
}

fn remove_generated(fixture: Fixture) -> Result<()> {
    match fixture {
        Fixture::Generated(generated) => generated.close(),
        other => Err(anyhow!("expected a generated fixture, got {}", other.kind())),
    }
}
