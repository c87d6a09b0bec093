use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TowerMapError {
    #[error("level probability must be in (0, 1), got {0}")]
    LevelProbabilityOutOfRange(f64),
}
