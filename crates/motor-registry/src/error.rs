use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("bus id {0} assigned twice")]
    DuplicateId(u8),
    #[error("bus id {0:#04x} is reserved")]
    ReservedId(u8),
    #[error("expected 4 legs, got {0}")]
    LegCount(usize),
}
