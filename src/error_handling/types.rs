use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadAddress(String),
    BadDuration(String),
    BadPattern(String),
    Tls(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadAddress(e) => write!(f, "Address error: {}", e),
            ConfigError::BadDuration(e) => write!(f, "Duration error: {}", e),
            ConfigError::BadPattern(e) => write!(f, "Pattern error: {}", e),
            ConfigError::Tls(e) => write!(f, "TLS setup error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

#[derive(Debug)]
pub enum NetworkError {
    BindError(std::io::Error),
    AcceptError(std::io::Error),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::BindError(e) => write!(f, "Network bind error: {}", e),
            NetworkError::AcceptError(e) => write!(f, "Accept failed: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Failure to establish the remote leg of a session.
#[derive(Debug)]
pub enum DialError {
    Connect(std::io::Error),
    TlsHandshake(std::io::Error),
    InvalidServerName(String),
}

impl fmt::Display for DialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialError::Connect(e) => write!(f, "Remote connection failed: {}", e),
            DialError::TlsHandshake(e) => write!(f, "TLS handshake failed: {}", e),
            DialError::InvalidServerName(e) => write!(f, "Invalid TLS server name: {}", e),
        }
    }
}

impl std::error::Error for DialError {}

#[derive(Debug)]
pub enum SessionError {
    DialFailed(DialError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::DialFailed(e) => write!(f, "Session dial failed: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<DialError> for SessionError {
    fn from(err: DialError) -> Self {
        SessionError::DialFailed(err)
    }
}
