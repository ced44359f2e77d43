//! Poll creation and voting.

use std::collections::HashSet;

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use super::codec::{put_string, string_length, Reader};
use super::common::{check_common, HeaderPrefix, SignedTransaction, TransactionHeader};
use super::names::name_length_ok;
use super::undo::{Journal, UndoDetail};
use super::{Amount, LedgerError, ParseError, TransactionType, ValidationResult};
use crate::config::{
    ADDRESS_LENGTH, LENGTH_PREFIX_LENGTH, MAX_DESCRIPTION_LENGTH, MAX_POLL_OPTIONS,
};
use crate::naming::is_lower_case;
use crate::storage::{DatabaseSet, DbResult};
use crate::voting::{Poll, PollOption};

fn poll_missing(name: &str) -> LedgerError {
    LedgerError::InvariantViolation(format!("poll {name:?} missing"))
}

// ---------------------------------------------------------------------------
// CreatePoll
// ---------------------------------------------------------------------------

/// Wire payload: `creator [25] | name str | description str | count u32 |
/// option str * count`. Only option names travel; votes start empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePollTransaction {
    pub header: TransactionHeader,
    pub poll: Poll,
}

impl CreatePollTransaction {
    pub fn new(header: TransactionHeader, poll: Poll) -> Self {
        Self { header, poll }
    }
}

impl SignedTransaction for CreatePollTransaction {
    const TYPE: TransactionType = TransactionType::CreatePoll;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        ADDRESS_LENGTH
            + string_length(&self.poll.name)
            + string_length(&self.poll.description)
            + LENGTH_PREFIX_LENGTH
            + self
                .poll
                .options
                .iter()
                .map(|o| string_length(&o.name))
                .sum::<usize>()
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        buf.put_slice(self.poll.creator.as_bytes());
        put_string(buf, &self.poll.name);
        put_string(buf, &self.poll.description);
        buf.put_u32(self.poll.options.len() as u32);
        for option in &self.poll.options {
            put_string(buf, &option.name);
        }
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let creator = reader.address("creator")?;
        let name = reader.string("name")?;
        let description = reader.string("description")?;
        let count = reader.u32("option count")?;
        let mut options = Vec::new();
        for _ in 0..count {
            options.push(PollOption::new(reader.string("option")?));
        }
        let poll = Poll::new(creator, name, description, options);
        Ok(Self::new(prefix.finish(reader)?, poll))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        let poll = &self.poll;
        if !name_length_ok(&poll.name) {
            return Ok(ValidationResult::InvalidNameLength);
        }
        if !(1..=MAX_DESCRIPTION_LENGTH).contains(&poll.description.len()) {
            return Ok(ValidationResult::InvalidDescriptionLength);
        }
        if !(1..=MAX_POLL_OPTIONS).contains(&poll.options.len()) {
            return Ok(ValidationResult::InvalidOptionsLength);
        }
        if poll.options.iter().any(|o| !name_length_ok(&o.name)) {
            return Ok(ValidationResult::InvalidOptionLength);
        }
        if !is_lower_case(&poll.name) {
            return Ok(ValidationResult::NameNotLowerCase);
        }
        let mut seen = HashSet::new();
        if !poll.options.iter().all(|o| seen.insert(o.name.as_str())) {
            return Ok(ValidationResult::DuplicateOption);
        }
        if !poll.creator.is_valid() {
            return Ok(ValidationResult::InvalidAddress);
        }
        if db.contains_poll(&poll.name)? {
            return Ok(ValidationResult::PollAlreadyCreated);
        }
        check_common(&self.header, db, Amount::ZERO)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        _journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        db.put_poll(&self.poll.without_votes())?;
        Ok(UndoDetail::None)
    }

    fn revert(&self, db: &mut DatabaseSet, _detail: UndoDetail) -> Result<(), LedgerError> {
        db.delete_poll(&self.poll.name)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// VoteOnPoll
// ---------------------------------------------------------------------------

/// Wire payload: `poll str | option u32`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOnPollTransaction {
    pub header: TransactionHeader,
    pub poll: String,
    pub option: u32,
}

impl VoteOnPollTransaction {
    pub fn new(header: TransactionHeader, poll: impl Into<String>, option: u32) -> Self {
        Self {
            header,
            poll: poll.into(),
            option,
        }
    }
}

impl SignedTransaction for VoteOnPollTransaction {
    const TYPE: TransactionType = TransactionType::VoteOnPoll;

    fn header(&self) -> &TransactionHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut TransactionHeader {
        &mut self.header
    }

    fn payload_length(&self) -> usize {
        string_length(&self.poll) + 4
    }

    fn write_payload(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.poll);
        buf.put_u32(self.option);
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, ParseError> {
        let prefix = HeaderPrefix::read(reader)?;
        let poll = reader.string("poll")?;
        let option = reader.u32("option")?;
        Ok(Self::new(prefix.finish(reader)?, poll, option))
    }

    fn validate(&self, db: &DatabaseSet) -> DbResult<ValidationResult> {
        if !name_length_ok(&self.poll) {
            return Ok(ValidationResult::InvalidNameLength);
        }
        let Some(poll) = db.poll(&self.poll)? else {
            return Ok(ValidationResult::PollDoesNotExist);
        };
        let Some(option) = poll.options.get(self.option as usize) else {
            return Ok(ValidationResult::PollOptionDoesNotExist);
        };
        let result = check_common(&self.header, db, Amount::ZERO)?;
        if !result.is_ok() {
            return Ok(result);
        }
        if option.has_voter(&self.header.creator_address()) {
            return Ok(ValidationResult::AlreadyVotedForThatOption);
        }
        Ok(ValidationResult::Ok)
    }

    fn apply(
        &self,
        db: &mut DatabaseSet,
        _journal: &mut Journal,
    ) -> Result<UndoDetail, LedgerError> {
        let mut poll = db.poll(&self.poll)?.ok_or_else(|| poll_missing(&self.poll))?;
        let previous = poll.vote(self.header.creator_address(), self.option as usize);
        db.put_poll(&poll)?;
        Ok(UndoDetail::PreviousVote(previous.map(|i| i as u32)))
    }

    fn revert(&self, db: &mut DatabaseSet, detail: UndoDetail) -> Result<(), LedgerError> {
        let UndoDetail::PreviousVote(previous) = detail else {
            return Err(LedgerError::InvariantViolation(
                "vote undo record holds no previous vote".into(),
            ));
        };
        let voter = self.header.creator_address();
        let mut poll = db.poll(&self.poll)?.ok_or_else(|| poll_missing(&self.poll))?;
        poll.remove_vote(&voter);
        if let Some(index) = previous {
            poll.vote(voter, index as usize);
        }
        db.put_poll(&poll)?;
        Ok(())
    }
}
