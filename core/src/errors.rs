use std::io;
use std::path::PathBuf;

use restable_arsc::ArscError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    /// Generic I/O error while trying to read asset data
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// The provider could not supply the requested asset
    #[error("asset {0:?} is not available from the provider")]
    MissingAsset(PathBuf),

    /// The asset parsed, but no package could be loaded from it
    #[error("no usable resources in {0:?}")]
    NoResources(PathBuf),

    /// Error occurred while parsing a resource table or idmap
    #[error("got error while parsing resource data")]
    TableError(#[from] ArscError),
}
