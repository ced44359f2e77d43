//! Decoding raw bytes into the right [`Transaction`] variant.

use super::codec::Reader;
use super::common::SignedTransaction;
use super::{
    ArbitraryDataTransaction, BuyNameTransaction, CancelOrderTransaction,
    CancelSellNameTransaction, CreateOrderTransaction, CreatePollTransaction, GenesisTransaction,
    IssueAssetTransaction, ParseError, PaymentTransaction, RegisterNameTransaction,
    SellNameTransaction, Transaction, TransactionType, TransferAssetTransaction,
    UpdateNameTransaction, VoteOnPollTransaction,
};

/// Read the leading big-endian type discriminant and decode the rest with
/// that variant's layout. The whole buffer must be consumed.
pub fn parse(bytes: &[u8]) -> Result<Transaction, ParseError> {
    let mut reader = Reader::new(bytes);
    let raw = reader.u32("type")?;
    let kind = TransactionType::from_u32(raw).ok_or(ParseError::UnknownType(raw))?;
    let r = &mut reader;

    let tx: Transaction = match kind {
        TransactionType::Genesis => GenesisTransaction::read(r)?.into(),
        TransactionType::Payment => PaymentTransaction::read(r)?.into(),
        TransactionType::RegisterName => RegisterNameTransaction::read(r)?.into(),
        TransactionType::UpdateName => UpdateNameTransaction::read(r)?.into(),
        TransactionType::SellName => SellNameTransaction::read(r)?.into(),
        TransactionType::CancelSellName => CancelSellNameTransaction::read(r)?.into(),
        TransactionType::BuyName => BuyNameTransaction::read(r)?.into(),
        TransactionType::CreatePoll => CreatePollTransaction::read(r)?.into(),
        TransactionType::VoteOnPoll => VoteOnPollTransaction::read(r)?.into(),
        TransactionType::ArbitraryData => ArbitraryDataTransaction::read(r)?.into(),
        TransactionType::IssueAsset => IssueAssetTransaction::read(r)?.into(),
        TransactionType::TransferAsset => TransferAssetTransaction::read(r)?.into(),
        TransactionType::CreateOrder => CreateOrderTransaction::read(r)?.into(),
        TransactionType::CancelOrder => CancelOrderTransaction::read(r)?.into(),
    };

    reader.finish()?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Address;
    use crate::crypto::Keypair;
    use crate::transaction::{Amount, TransactionBuilder};

    fn payment_bytes() -> Vec<u8> {
        let keypair = Keypair::from_passphrase("test");
        let recipient = Address::from_public_key(&Keypair::from_passphrase("r").public_key());
        TransactionBuilder::new(&keypair)
            .timestamp(0)
            .fee(Amount::from_coins(1))
            .payment(recipient, Amount::from_coins(10))
            .to_bytes()
    }

    #[test]
    fn empty_buffer_is_truncated() {
        assert!(matches!(
            parse(&[]),
            Err(ParseError::Truncated { field: "type", .. })
        ));
    }

    #[test]
    fn all_zero_buffer_rejected() {
        assert_eq!(parse(&[0u8; 200]), Err(ParseError::UnknownType(0)));
    }

    #[test]
    fn every_prefix_of_a_payment_fails() {
        let bytes = payment_bytes();
        for len in 0..bytes.len() {
            assert!(parse(&bytes[..len]).is_err(), "prefix of {len} bytes parsed");
        }
        assert!(parse(&bytes).is_ok());
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = payment_bytes();
        bytes.push(0);
        assert_eq!(parse(&bytes), Err(ParseError::TrailingBytes(1)));
    }

    #[test]
    fn genesis_parses_from_fixed_layout() {
        let recipient = Address::from_public_key(&Keypair::from_passphrase("g").public_key());
        let genesis = GenesisTransaction::new(recipient, Amount::from_coins(1000), 42);
        let bytes = genesis.to_bytes();
        assert_eq!(bytes.len(), crate::transaction::GENESIS_LENGTH);
        assert_eq!(parse(&bytes), Ok(Transaction::Genesis(genesis)));
    }
}
