use thiserror::Error;

use crate::models::Collection;

#[derive(Debug, Error)]
pub enum PopulateError {
    #[error("Invalid API base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{collection} request returned {status}: {body}")]
    Status {
        collection: Collection,
        status: u16,
        body: String,
    },

    #[error("{0} response carried no data.id")]
    MissingId(Collection),

    #[error("{collection} with {key} conflicted but could not be found")]
    NotFoundAfterConflict { collection: Collection, key: String },
}
