use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use super::{LabeledExample, N_CLASSES};
use crate::error::KnnError;
use crate::{Pixel, MNIST_DIMENSIONALITY};

// How to read a dataset file
#[derive(Debug, Clone)]
pub struct LoadOptions {
    // Pixels expected after the label on every row
    pub dimensionality: usize,
    // The reference csv files start with a header row
    pub has_headers: bool,
    // Stop after this many examples
    pub n_examples: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            dimensionality: MNIST_DIMENSIONALITY,
            has_headers: true,
            n_examples: usize::MAX,
        }
    }
}

// Load MNIST images from a csv file.
// The expected format is:
// - An optional header row
// - One image per row
// - Each row starts with the class label 0-9
// - The rest of the row consists of exactly `dimensionality` integer pixel values
// Any malformed row fails the whole load; no partial dataset is returned.
pub fn load_mnist(
    path: impl AsRef<Path>,
    options: &LoadOptions,
) -> Result<Vec<LabeledExample>, KnnError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let examples = read_mnist(file, options)?;
    info!(
        path = %path.display(),
        examples = examples.len(),
        "loaded dataset"
    );
    Ok(examples)
}

// As above, but from any reader
pub fn read_mnist<R: Read>(
    reader: R,
    options: &LoadOptions,
) -> Result<Vec<LabeledExample>, KnnError> {
    // Row lengths are checked by hand so the error names the record
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(options.has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut examples = Vec::new();
    for (index, result) in reader.records().take(options.n_examples).enumerate() {
        let record_number = index + 1;
        let record = result.map_err(|e| csv_error(record_number, e))?;
        examples.push(parse_record(&record, record_number, options.dimensionality)?);
    }
    debug!(examples = examples.len(), "parsed csv records");
    Ok(examples)
}

fn parse_record(
    record: &csv::StringRecord,
    record_number: usize,
    dimensionality: usize,
) -> Result<LabeledExample, KnnError> {
    let n_pixels = record.len().saturating_sub(1);
    if n_pixels != dimensionality {
        return Err(KnnError::load(
            record_number,
            format!("expected {} pixels, found {}", dimensionality, n_pixels),
        ));
    }

    let label = record[0]
        .parse::<u8>()
        .ok()
        .filter(|&label| label < N_CLASSES)
        .ok_or_else(|| {
            KnnError::load(record_number, format!("invalid label {:?}", &record[0]))
        })?;

    let pixels = record
        .iter()
        .skip(1) // Skip the label
        .enumerate()
        .map(|(column, token)| {
            token.parse::<Pixel>().map_err(|_| {
                KnnError::load(
                    record_number,
                    format!("invalid pixel {:?} in column {}", token, column + 2),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LabeledExample::new(label, pixels))
}

fn csv_error(record_number: usize, error: csv::Error) -> KnnError {
    match error.into_kind() {
        csv::ErrorKind::Io(e) => KnnError::Io(e),
        kind => KnnError::load(record_number, format!("{:?}", kind)),
    }
}
