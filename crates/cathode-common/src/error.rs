use thiserror::Error;

#[derive(Error, Debug)]
pub enum CathodeError {
    #[error("invalid terminal size {rows}x{cols}")]
    InvalidSize { rows: i32, cols: i32 },

    #[error("selection buffer too small ({len} bytes, need at least 4)")]
    SelectionBuffer { len: usize },

    #[error("unknown charset designation {designation:?}")]
    UnknownCharset { designation: char },
}

pub type Result<T> = std::result::Result<T, CathodeError>;
