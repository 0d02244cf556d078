use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("scale timeout")]
    Timeout,
    #[error("hx711 data-ready timeout")]
    DataReadyTimeout,
    #[error("range sensor timeout")]
    RangeTimeout,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl From<rppal::gpio::Error> for HwError {
    fn from(e: rppal::gpio::Error) -> Self {
        HwError::Gpio(e.to_string())
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl From<rppal::i2c::Error> for HwError {
    fn from(e: rppal::i2c::Error) -> Self {
        HwError::I2c(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
