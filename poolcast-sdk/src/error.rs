use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("API error: {0}")]
    Api(#[from] poolcast_api::ApiError),

    #[error("Session error: {0}")]
    Session(#[from] poolcast_session::SessionError),
}
