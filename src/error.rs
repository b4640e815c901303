//! Central error handling for the relief3d pipeline
//!
//! Provides a unified TerrainError enum with consistent categorization
//! across decode, meshing, lighting and capture paths.

/// Centralized error type for all pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum TerrainError {
    /// Unsupported bit depth or channel layout, bad signature, missing header.
    #[error("Format error: {0}")]
    Format(String),

    /// Truncated or corrupt compressed payload, inconsistent chunk length.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Missing rasterization context, scene or camera.
    #[error("Render init error: {0}")]
    RenderInit(String),

    /// Failure in the middle of a depth pass.
    #[error("Capture error: {0}")]
    Capture(String),

    /// Invalid render settings or renderer configuration.
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TerrainError {
    /// Short category label used in log lines
    pub fn category(&self) -> &'static str {
        match self {
            TerrainError::Format(_) => "Format",
            TerrainError::Decode(_) => "Decode",
            TerrainError::RenderInit(_) => "RenderInit",
            TerrainError::Capture(_) => "Capture",
            TerrainError::Config(_) => "Config",
            TerrainError::Io(_) => "IO",
        }
    }

    /// Convenience constructors for common error types
    pub fn format<T: ToString>(msg: T) -> Self {
        TerrainError::Format(msg.to_string())
    }

    pub fn decode<T: ToString>(msg: T) -> Self {
        TerrainError::Decode(msg.to_string())
    }

    pub fn render_init<T: ToString>(msg: T) -> Self {
        TerrainError::RenderInit(msg.to_string())
    }

    pub fn capture<T: ToString>(msg: T) -> Self {
        TerrainError::Capture(msg.to_string())
    }

    pub fn config<T: ToString>(msg: T) -> Self {
        TerrainError::Config(msg.to_string())
    }
}

// Coalesced loads hand the same outcome to every waiter, so errors must be
// clonable. io::Error is not, so it is rebuilt from its kind and message.
impl Clone for TerrainError {
    fn clone(&self) -> Self {
        match self {
            TerrainError::Format(m) => TerrainError::Format(m.clone()),
            TerrainError::Decode(m) => TerrainError::Decode(m.clone()),
            TerrainError::RenderInit(m) => TerrainError::RenderInit(m.clone()),
            TerrainError::Capture(m) => TerrainError::Capture(m.clone()),
            TerrainError::Config(m) => TerrainError::Config(m.clone()),
            TerrainError::Io(e) => TerrainError::Io(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

/// Result type alias for pipeline operations
pub type TerrainResult<T> = Result<T, TerrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_category_prefix() {
        let err = TerrainError::format("bit depth 8 not supported");
        assert_eq!(err.to_string(), "Format error: bit depth 8 not supported");
        assert_eq!(err.category(), "Format");
    }

    #[test]
    fn io_errors_survive_clone() {
        let err = TerrainError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "terrain.png missing",
        ));
        let copy = err.clone();
        match copy {
            TerrainError::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
                assert!(e.to_string().contains("terrain.png"));
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }
}
