use super::artifact::Artifact;
use crate::error::{GoldenError, Result};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Write a complete artifact set into `dir`.
///
/// Every file is first staged as a temporary file inside `dir`; only when all
/// of them are staged are they renamed into place. Targets that a rename
/// cannot replace are rejected before anything moves, and a rename failing
/// anyway removes the files already renamed by this call.
pub fn commit(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
  fs::create_dir_all(dir)?;

  for artifact in artifacts {
    let path = dir.join(&artifact.name);
    if path.is_dir() {
      return Err(GoldenError::from(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{} is a directory", path.display()),
      )));
    }
  }

  let staged = artifacts
    .par_iter()
    .map(|artifact| -> Result<(NamedTempFile, PathBuf)> {
      let mut tmp = NamedTempFile::new_in(dir)?;
      tmp.write_all(artifact.contents().as_bytes())?;
      tmp.flush()?;
      Ok((tmp, dir.join(&artifact.name)))
    })
    .collect::<Result<Vec<_>>>()?;

  let mut written = Vec::with_capacity(staged.len());
  for (tmp, path) in staged {
    if let Err(e) = tmp.persist(&path) {
      // unpersisted temp files are deleted on drop
      rollback(&written);
      return Err(e.error.into());
    }
    log::debug!("wrote {}", path.display());
    written.push(path);
  }
  Ok(written)
}

fn rollback(written: &[PathBuf]) {
  for path in written {
    if let Err(e) = fs::remove_file(path) {
      log::warn!("could not remove {}: {}", path.display(), e);
    }
  }
}
