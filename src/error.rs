use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum NotecraftError {
    IoError(std::io::Error),
    /// A chunk-local coordinate outside the packable range
    CoordinateError(String),
    /// Rejected custom block registration. Always raised while the plugin is enabling.
    RegistrationError(String),
    /// Lookup by type for a block type that was never registered
    NotRegistered(String),
    /// Lookup by type found an instance of a different type
    WrongInstance(String),
    /// The chunk was written by a newer schema than this build understands
    UnsupportedSchemaVersion {
        chunk_x: i32,
        chunk_z: i32,
        found: i64,
        supported: i64,
    },
    ConfigError(String),
    ProtocolError(String),
    /// The main thread went away before a marshalled task could run
    MainThreadUnavailable,
}

impl fmt::Display for NotecraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotecraftError::IoError(err) => write!(f, "IO error: {}", err),
            NotecraftError::CoordinateError(msg) => write!(f, "Coordinate error: {}", msg),
            NotecraftError::RegistrationError(msg) => {
                write!(f, "Couldn't register block: {}", msg)
            }
            NotecraftError::NotRegistered(msg) => write!(f, "Not registered: {}", msg),
            NotecraftError::WrongInstance(msg) => write!(f, "Wrong instance: {}", msg),
            NotecraftError::UnsupportedSchemaVersion {
                chunk_x,
                chunk_z,
                found,
                supported,
            } => write!(
                f,
                "Custom block data version for chunk at XZ: {}, {} is invalid: version is '{}', \
                 this build only supports up to version {}. Is the plugin out of date?",
                chunk_x, chunk_z, found, supported
            ),
            NotecraftError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            NotecraftError::ProtocolError(msg) => write!(f, "Protocol error: {}", msg),
            NotecraftError::MainThreadUnavailable => {
                write!(f, "Main thread executor is no longer running")
            }
        }
    }
}

impl Error for NotecraftError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NotecraftError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NotecraftError {
    fn from(err: std::io::Error) -> Self {
        NotecraftError::IoError(err)
    }
}

impl From<serde_json::Error> for NotecraftError {
    fn from(err: serde_json::Error) -> Self {
        NotecraftError::ConfigError(err.to_string())
    }
}
