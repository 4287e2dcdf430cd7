//! Raw-sample artifacts: one CSV per tested size, `rep,cycles` header, one
//! line per trial. The filename encodes the exponent and the byte size so a
//! sweep leaves a self-describing set of files behind.

use crate::sweep::SizeConfiguration;
use crate::HarnessError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn artifact_name(configuration: SizeConfiguration) -> String {
    format!(
        "memcpy_2pow{}_{}b.csv",
        configuration.exponent, configuration.size
    )
}

pub fn write_trial_series(
    directory: &Path,
    configuration: SizeConfiguration,
    series: &[u64],
) -> Result<PathBuf, HarnessError> {
    let path = directory.join(artifact_name(configuration));
    let artifact_error = |source: io::Error| HarnessError::Artifact {
        path: path.clone(),
        source,
    };
    let file = File::create(&path).map_err(artifact_error)?;
    let mut writer = BufWriter::new(file);
    write_rows(&mut writer, series).map_err(artifact_error)?;
    Ok(path)
}

fn write_rows(writer: &mut impl Write, series: &[u64]) -> io::Result<()> {
    writeln!(writer, "rep,cycles")?;
    for (rep, cycles) in series.iter().enumerate() {
        writeln!(writer, "{},{}", rep, cycles)?;
    }
    writer.flush()
}
