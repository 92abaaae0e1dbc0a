use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("{0} environment variable is required")]
    MissingCredential(&'static str),
}
