//! Stream helpers for tests.

use crate::error::{StoreError, StoreResult};
use crate::traits::{ObjectReader, ObjectWriter};

/// Write all of `data`, looping over short writes.
pub(crate) fn write_all(writer: &mut dyn ObjectWriter, mut data: &[u8]) -> StoreResult<()> {
    while !data.is_empty() {
        let n = writer.write(data)?;
        if n == 0 {
            return Err(StoreError::Backend("writer accepted zero bytes".into()));
        }
        data = &data[n..];
    }
    Ok(())
}

/// Drain a reader into memory.
pub(crate) fn read_to_end(reader: &mut dyn ObjectReader) -> StoreResult<Vec<u8>> {
    let mut out = Vec::with_capacity(reader.remaining() as usize);
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}
