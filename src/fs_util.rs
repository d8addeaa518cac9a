use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;

use crate::error::CuratorError;
use crate::store::Store;

const GZ_SUFFIX: &str = ".gz";

/// Decompresses `gz_path` next to itself (dropping a `.gz` suffix in any
/// case) and removes the compressed original. Returns the decompressed path.
pub fn gunzip_in_place(gz_path: &Utf8Path) -> Result<Utf8PathBuf, CuratorError> {
    let name = gz_path.as_str();
    let split = name.len().saturating_sub(GZ_SUFFIX.len());
    let target = match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(suffix)) if suffix.eq_ignore_ascii_case(GZ_SUFFIX) => {
            Utf8PathBuf::from(stem)
        }
        _ => {
            return Err(CuratorError::Filesystem(format!(
                "not a gzip file name: {gz_path}"
            )));
        }
    };

    let input = fs::File::open(gz_path.as_std_path())
        .map_err(|err| CuratorError::Filesystem(format!("open {gz_path}: {err}")))?;
    let mut decoder = GzDecoder::new(io::BufReader::new(input));
    Store::write_atomic_with(&target, |output| {
        io::copy(&mut decoder, output)
            .map_err(|err| CuratorError::Filesystem(format!("decompress {gz_path}: {err}")))
    })?;

    fs::remove_file(gz_path.as_std_path())
        .map_err(|err| CuratorError::Filesystem(format!("remove {gz_path}: {err}")))?;
    Ok(target)
}
