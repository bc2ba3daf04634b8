use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArscError {
    /// Provided buffer too small to hold a resource table
    #[error("file size too small for a resource table")]
    TooSmall,

    /// A chunk header is out of bounds or self-inconsistent
    #[error("corrupt chunk: {0}")]
    CorruptChunk(&'static str),

    /// A string or style offset falls outside the pool payload
    #[error("corrupt string pool: {0}")]
    CorruptPool(&'static str),

    /// Package/type/entry structural invariants violated
    #[error("malformed resource table: {0}")]
    MalformedTable(&'static str),

    /// Reference or bag-parent chain exceeded the fixed depth bound
    #[error("cyclic reference chain at resource 0x{0:08x}")]
    CyclicReference(u32),
}
