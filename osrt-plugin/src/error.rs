use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("failed to open plugin library: {0}")]
    OpenLibraryFailed(String),

    #[error("plugin exposes neither the v2 nor the v1 entry symbol")]
    MissingEntryPoint,

    #[error("plugin entry point returned a null function table")]
    EntryReturnedNull,

    #[error("plugin init() returned a null context")]
    InitFailed,

    #[error("failed to read plugin manifest: {0}")]
    ManifestFailed(String),

    #[error("manifest plugin_id `{manifest_id}` does not match install directory `{dir_id}`")]
    ManifestMismatch { manifest_id: String, dir_id: String },

    #[error("plugin package must contain exactly one dynamic library, found {0}")]
    AmbiguousLibrary(usize),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
