use coffee_core::CoffeeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoffeeError),

    /// The command was understood but declined; the message is for the user.
    #[error("{0}")]
    Refused(String),

    #[error("Failed to locate the coffee executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    #[error("Failed to encode status: {0}")]
    Json(#[from] serde_json::Error),
}
