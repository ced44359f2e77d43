//! # Polls
//!
//! A poll is a named list of options. Each option keeps the addresses that
//! voted for it; an address holds at most one vote per poll, so voting again
//! moves the vote. Voter lists stay sorted, so a poll's stored form depends
//! only on who votes for what and not on the order the votes arrived in.

use serde::{Deserialize, Serialize};

use crate::account::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub name: String,
    pub voters: Vec<Address>,
}

impl PollOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            voters: Vec::new(),
        }
    }

    pub fn has_voter(&self, address: &Address) -> bool {
        self.voters.binary_search(address).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub creator: Address,
    pub name: String,
    pub description: String,
    pub options: Vec<PollOption>,
}

impl Poll {
    pub fn new(
        creator: Address,
        name: impl Into<String>,
        description: impl Into<String>,
        options: Vec<PollOption>,
    ) -> Self {
        Self {
            creator,
            name: name.into(),
            description: description.into(),
            options,
        }
    }

    pub fn option_index(&self, option: &str) -> Option<usize> {
        self.options.iter().position(|o| o.name == option)
    }

    /// Index of the option `voter` currently votes for.
    pub fn vote_of(&self, voter: &Address) -> Option<usize> {
        self.options.iter().position(|o| o.has_voter(voter))
    }

    /// Drop any vote by `voter`, returning the option it was on.
    pub fn remove_vote(&mut self, voter: &Address) -> Option<usize> {
        let index = self.vote_of(voter)?;
        self.options[index].voters.retain(|v| v != voter);
        Some(index)
    }

    /// The same poll with every vote dropped.
    pub fn without_votes(&self) -> Poll {
        let options = self
            .options
            .iter()
            .map(|o| PollOption::new(o.name.clone()))
            .collect();
        Poll::new(self.creator, self.name.clone(), self.description.clone(), options)
    }

    /// Cast `voter`'s vote on `index`, replacing any previous vote. Returns
    /// the option previously voted for.
    pub fn vote(&mut self, voter: Address, index: usize) -> Option<usize> {
        let previous = self.remove_vote(&voter);
        if let Some(option) = self.options.get_mut(index) {
            if let Err(at) = option.voters.binary_search(&voter) {
                option.voters.insert(at, voter);
            }
        }
        previous
    }

    pub fn total_votes(&self) -> usize {
        self.options.iter().map(|o| o.voters.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn addr(seed: &str) -> Address {
        Address::from_public_key(&Keypair::from_passphrase(seed).public_key())
    }

    fn poll() -> Poll {
        Poll::new(
            addr("creator"),
            "colour",
            "favourite colour",
            vec![PollOption::new("red"), PollOption::new("blue")],
        )
    }

    #[test]
    fn vote_moves_between_options() {
        let mut poll = poll();
        let voter = addr("voter");

        assert_eq!(poll.vote(voter, 0), None);
        assert_eq!(poll.vote_of(&voter), Some(0));

        assert_eq!(poll.vote(voter, 1), Some(0));
        assert_eq!(poll.vote_of(&voter), Some(1));
        assert_eq!(poll.total_votes(), 1);
    }

    #[test]
    fn remove_vote_restores_empty_poll() {
        let mut poll = poll();
        let voter = addr("voter");
        poll.vote(voter, 1);
        assert_eq!(poll.remove_vote(&voter), Some(1));
        assert_eq!(poll, self::poll());
    }

    #[test]
    fn voters_stay_sorted_regardless_of_arrival() {
        let (a, b, c) = (addr("a"), addr("b"), addr("c"));
        let mut first = poll();
        first.vote(a, 0);
        first.vote(b, 0);
        first.vote(c, 0);
        let mut second = poll();
        second.vote(c, 0);
        second.vote(a, 0);
        second.vote(b, 0);
        assert_eq!(first, second);

        // Moving a vote away and back leaves no trace.
        let before = first.clone();
        first.vote(b, 1);
        first.vote(b, 0);
        assert_eq!(first, before);
    }

    #[test]
    fn without_votes_clears_every_option() {
        let mut poll = poll();
        poll.vote(addr("voter"), 0);
        assert_eq!(poll.without_votes(), self::poll());
    }

    #[test]
    fn option_lookup() {
        let poll = poll();
        assert_eq!(poll.option_index("blue"), Some(1));
        assert_eq!(poll.option_index("green"), None);
    }
}
