//! Configuration sources and output.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pgdelta_core::{CatalogOptions, Configuration};
use tracing::{debug, info};

use crate::error::{PgDeltaError, Result};
use crate::introspect::PostgresIntrospector;

/// Reads a configuration from a JSON file, or from every `.json` file
/// under a directory.
///
/// Files under a directory are read in path order, recursively, and their
/// schemas merged. A table declared by two files is an error.
pub fn load_configuration(path: &Path) -> Result<Configuration> {
    if !path.is_dir() {
        return load_file(path);
    }

    let files = find_json_files(path)?;
    let mut merged = Configuration::new();
    for file in &files {
        merge_configuration(&mut merged, load_file(file)?, file)?;
    }
    info!(
        path = %path.display(),
        files = files.len(),
        schemas = merged.schemas.len(),
        "loaded configuration directory"
    );
    Ok(merged)
}

fn load_file(path: &Path) -> Result<Configuration> {
    let contents = fs::read_to_string(path).map_err(|source| PgDeltaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let configuration: Configuration =
        serde_json::from_str(&contents).map_err(|source| PgDeltaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        path = %path.display(),
        schemas = configuration.schemas.len(),
        "loaded configuration"
    );
    Ok(configuration)
}

/// Lists `.json` files under `dir`, recursively, in path order.
fn find_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_error = |source| PgDeltaError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(io_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io_error)?;
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        if path.is_dir() {
            files.extend(find_json_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(files)
}

fn merge_configuration(
    target: &mut Configuration,
    source: Configuration,
    path: &Path,
) -> Result<()> {
    for (schema_name, schema) in source.schemas {
        let merged = target.schemas.entry(schema_name.clone()).or_default();
        for (relations, incoming) in [
            (&mut merged.tables, schema.tables),
            (&mut merged.views, schema.views),
        ] {
            for (table_name, table) in incoming {
                if relations.contains_key(&table_name) {
                    return Err(PgDeltaError::DuplicateTable {
                        path: path.to_path_buf(),
                        schema: schema_name,
                        table: table_name,
                    });
                }
                relations.insert(table_name, table);
            }
        }
    }
    Ok(())
}

/// Writes `contents` followed by a newline to `path`, or to stdout when
/// no path is given. Empty contents write nothing to stdout and an empty
/// file otherwise.
pub fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    let text = if contents.is_empty() {
        String::new()
    } else {
        format!("{contents}\n")
    };
    match path {
        Some(path) => {
            fs::write(path, text).map_err(|source| PgDeltaError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Where the baseline configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// Nothing exists yet.
    Empty,
    /// A JSON configuration file.
    File(PathBuf),
    /// A live database.
    Database {
        /// Connection URL.
        url: String,
        /// How long to wait for a connection.
        connect_timeout: Duration,
    },
}

impl Baseline {
    /// Picks the baseline from the command line. A file wins over a
    /// database URL.
    #[must_use]
    pub fn from_args(
        file: Option<PathBuf>,
        url: Option<String>,
        connect_timeout: Duration,
    ) -> Self {
        match (file, url) {
            (Some(file), _) => Self::File(file),
            (None, Some(url)) => Self::Database {
                url,
                connect_timeout,
            },
            (None, None) => Self::Empty,
        }
    }

    /// Loads the baseline configuration.
    pub async fn load(&self, options: &CatalogOptions) -> Result<Configuration> {
        match self {
            Self::Empty => {
                info!("no baseline given, starting from an empty database");
                Ok(Configuration::new())
            }
            Self::File(path) => load_configuration(path),
            Self::Database {
                url,
                connect_timeout,
            } => {
                let introspector = PostgresIntrospector::connect(url, *connect_timeout).await?;
                introspector.introspect(options).await
            }
        }
    }
}
