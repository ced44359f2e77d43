//! Arbitrary data: an opaque blob tagged with a service id, stored on chain
//! and otherwise inert.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use super::codec::{put_bytes, Reader};
use super::common::{check_common, HeaderPrefix, SignedTransaction, TransactionHeader};
use super::undo::{Journal, UndoDetail};
use super::{Amount, LedgerError, ParseError, TransactionType, ValidationResult};
use crate::config::{LENGTH_PREFIX_LENGTH, MAX_ARBITRARY_DATA_LENGTH};
use crate::storage::{DatabaseSet, DbResult};

/// Wire payload: `service u32 | data bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitraryDataTransaction {
    pub header: TransactionHeader,
    pub service: u32,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

impl ArbitraryDataTransaction {
    pub fn new(header: TransactionHeader, service: u32, data: Vec<u8>) -> Self {
        Self {
            header,
            service,
            data,
        }
    }
}

impl SignedTransaction for ArbitraryDataTransaction {
    const TYPE: TransactionType = TransactionType::ArbitraryData;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        4 + LENGTH_PREFIX_LENGTH + self.data.len()
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        buf.put_u32(self.service);
        put_bytes(buf, &self.data);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let service = reader.u32("service")?;
        let data = reader.bytes("data")?.to_vec();
        Ok(Self::new(prefix.finish(reader)?, service, data))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !(1..=MAX_ARBITRARY_DATA_LENGTH).contains(&self.data.len()) {
            return Ok(ValidationResult::InvalidDataLength);
        }
        check_common(&self.header, db, Amount::ZERO)
    }

    fn apply(
        &self,
        _db: &mut DatabaseSet,
        _journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        Ok(UndoDetail::None)
    }

    fn revert(&self, _db: &mut DatabaseSet, _detail: UndoDetail) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// Hex in human-readable formats, raw bytes otherwise.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(data))
        } else {
            serializer.serialize_bytes(data)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            hex::decode(text).map_err(serde::de::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer)
        }
    }
}
