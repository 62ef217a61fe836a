use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors: malformed input documents, unknown annotation vocabulary,
/// broken table headers, unresolvable `run` targets.
///
/// Assertion failures and fixture exceptions are *not* errors; they are
/// recorded on the document itself and surface through
/// [`Summary`](crate::Summary).
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed document")]
    Parse(#[from] quick_xml::Error),

    #[error("malformed attribute")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("unknown command {name:?} in the command namespace")]
    UnknownCommand { name: String },

    #[error("could not match command with table header")]
    HeaderIndex,

    #[error("run command has no href attribute")]
    MissingHref,

    #[error("run target {path:?} does not exist")]
    MissingSpec { path: PathBuf },

    #[error("no fixture registered for {stem:?}")]
    UnknownFixture { stem: String },

    #[error("run commands require a spec loaded from a file")]
    NoBaseDir,

    #[error("document has no root element")]
    NoRoot,
}
