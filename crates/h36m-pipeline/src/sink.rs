//! Structured-array output.
//!
//! A sequence is persisted as a set of named n-dimensional arrays. The
//! shipped [`JsonArraySink`] stores them in one JSON document:
//!
//! ```text
//! {"datasets": {"frame": {"dtype": "i64", "shape": [3], "data": [1, 5, 9]}, ...}}
//! ```
//!
//! Names are sorted, so identical inputs produce byte-identical files.

use crate::SinkError;
use h36m_core::Real;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Element storage of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetData {
    F64(Vec<Real>),
    I64(Vec<i64>),
}

impl DatasetData {
    pub fn len(&self) -> usize {
        match self {
            DatasetData::F64(v) => v.len(),
            DatasetData::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dtype(&self) -> DType {
        match self {
            DatasetData::F64(_) => DType::F64,
            DatasetData::I64(_) => DType::I64,
        }
    }
}

/// A named, row-major n-dimensional array.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: DatasetData,
}

impl Dataset {
    pub fn f64(name: impl Into<String>, shape: Vec<usize>, data: Vec<Real>) -> Self {
        Self {
            name: name.into(),
            shape,
            data: DatasetData::F64(data),
        }
    }

    pub fn i64(name: impl Into<String>, shape: Vec<usize>, data: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            shape,
            data: DatasetData::I64(data),
        }
    }

    /// Check that the data fills the shape exactly.
    pub fn validate(&self) -> Result<(), SinkError> {
        let expected: usize = self.shape.iter().product();
        if expected != self.data.len() {
            return Err(SinkError::Shape {
                name: self.name.clone(),
                shape: self.shape.clone(),
                len: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn as_f64(&self) -> Option<&[Real]> {
        match &self.data {
            DatasetData::F64(v) => Some(v),
            DatasetData::I64(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match &self.data {
            DatasetData::I64(v) => Some(v),
            DatasetData::F64(_) => None,
        }
    }
}

/// Persists the datasets of one sequence under `path`.
pub trait ArraySink {
    /// Replace whatever is at `path` with `datasets`. Names must be unique.
    fn write(&self, path: &Path, datasets: &[Dataset]) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DType {
    F64,
    I64,
}

impl DType {
    fn as_str(self) -> &'static str {
        match self {
            DType::F64 => "f64",
            DType::I64 => "i64",
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredDataset {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<Number>,
}

#[derive(Serialize, Deserialize)]
struct Container {
    datasets: BTreeMap<String, StoredDataset>,
}

/// Writes one pretty-printed JSON container per sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArraySink;

impl JsonArraySink {
    /// Read back a container written by [`ArraySink::write`], sorted by name.
    pub fn read(path: &Path) -> Result<Vec<Dataset>, SinkError> {
        let text = fs::read_to_string(path).map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let container: Container =
            serde_json::from_str(&text).map_err(|source| SinkError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        container
            .datasets
            .into_iter()
            .map(|(name, stored)| decode(name, stored))
            .collect()
    }
}

impl ArraySink for JsonArraySink {
    fn write(&self, path: &Path, datasets: &[Dataset]) -> Result<(), SinkError> {
        let mut container = Container {
            datasets: BTreeMap::new(),
        };
        for dataset in datasets {
            dataset.validate()?;
            let stored = encode(dataset)?;
            if container
                .datasets
                .insert(dataset.name.clone(), stored)
                .is_some()
            {
                return Err(SinkError::Duplicate(dataset.name.clone()));
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let io_err = |source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = fs::File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &container).map_err(|source| {
            SinkError::Encode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)
    }
}

fn encode(dataset: &Dataset) -> Result<StoredDataset, SinkError> {
    let data = match &dataset.data {
        DatasetData::F64(values) => values
            .iter()
            .map(|&v| {
                Number::from_f64(v).ok_or_else(|| SinkError::NonFinite(dataset.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?,
        DatasetData::I64(values) => values.iter().map(|&v| Number::from(v)).collect(),
    };
    Ok(StoredDataset {
        dtype: dataset.data.dtype(),
        shape: dataset.shape.clone(),
        data,
    })
}

fn decode(name: String, stored: StoredDataset) -> Result<Dataset, SinkError> {
    let bad_value = |name: &str| SinkError::BadValue {
        name: name.to_string(),
        dtype: stored.dtype.as_str(),
    };
    let data = match stored.dtype {
        DType::F64 => DatasetData::F64(
            stored
                .data
                .iter()
                .map(|n| n.as_f64().ok_or_else(|| bad_value(&name)))
                .collect::<Result<_, _>>()?,
        ),
        DType::I64 => DatasetData::I64(
            stored
                .data
                .iter()
                .map(|n| n.as_i64().ok_or_else(|| bad_value(&name)))
                .collect::<Result<_, _>>()?,
        ),
    };
    let dataset = Dataset {
        name,
        shape: stored.shape,
        data,
    };
    dataset.validate()?;
    Ok(dataset)
}
