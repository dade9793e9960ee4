use crate::auth::error::AuthError;
use crate::batch::error::BatchError;
use crate::config::ConfigError;
use crate::output::error::OutputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwhereError {
    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Output(#[from] OutputError),
}
